/// Single-line text cleanup applied to prompts and stored keys.
///
/// - Markup tags are stripped; a `<` that does not open a tag becomes `&lt;`
/// - Percent-encoded octets (`%2F`) are removed
/// - Whitespace runs, line breaks included, collapse to one space
/// - Leading and trailing whitespace is trimmed
pub fn sanitize_text(input: &str) -> String {
    let stripped = strip_tags(input);
    let decoded = strip_octets(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let opens_tag = after
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!' || c == '?');

        match (opens_tag, after.find('>')) {
            (true, Some(end)) => rest = &after[end + 1..],
            // Unterminated tag: drop the remainder.
            (true, None) => return out,
            (false, _) => {
                out.push_str("&lt;");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn strip_octets(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    // Only ASCII bytes were removed, so the rest is still valid UTF-8.
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::sanitize_text;

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(sanitize_text("  Write\n a\ttagline  "), "Write a tagline");
    }

    #[test]
    fn strips_tags() {
        assert_eq!(sanitize_text("<b>bold</b> claim<br/>"), "bold claim");
        assert_eq!(sanitize_text("<script"), "");
    }

    #[test]
    fn keeps_comparisons_readable() {
        assert_eq!(sanitize_text("a < b"), "a &lt; b");
    }

    #[test]
    fn removes_percent_octets() {
        assert_eq!(sanitize_text("100%25 sure"), "100 sure");
        assert_eq!(sanitize_text("50% off"), "50% off");
    }

    #[test]
    fn key_shaped_input_is_untouched() {
        assert_eq!(sanitize_text(" sk-test-123 \n"), "sk-test-123");
    }
}
