use super::{Field, Notifier, PromptSource};
use std::io::{BufRead, Write};

/// Reads one line per prompt. EOF counts as cancel.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl LinePrompt<std::io::StdinLock<'static>, std::io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> PromptSource for LinePrompt<R, W> {
    fn ask(&mut self, field: &Field, message: &str) -> Option<String> {
        let preview: String = field.value.chars().take(60).collect();
        writeln!(self.output, "[{}] current: {:?}", field.id, preview).ok();
        write!(self.output, "{message} ").ok();
        self.output.flush().ok();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// Alerts go to stderr.
#[derive(Debug, Default)]
pub struct StderrAlert;

impl Notifier for StderrAlert {
    fn alert(&mut self, message: &str) {
        eprintln!("{message}");
    }
}
