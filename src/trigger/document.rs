use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One editable element of an editor page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,

    /// Element name, e.g. "textarea" or "input".
    pub tag: String,

    /// `type` attribute of an input; absent means "text".
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class: Vec<String>,

    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    TextArea,
    TextInput,
    TitleInput,
}

impl Field {
    /// Eligibility for a control. Anything that is not text-like is None.
    pub fn kind(&self, title_class: &str) -> Option<FieldKind> {
        if self.tag.eq_ignore_ascii_case("textarea") {
            return Some(FieldKind::TextArea);
        }
        if !self.tag.eq_ignore_ascii_case("input") {
            return None;
        }
        if self.class.iter().any(|c| c == title_class) {
            return Some(FieldKind::TitleInput);
        }
        match self.input_type.as_deref() {
            None => Some(FieldKind::TextInput),
            Some(t) if t.eq_ignore_ascii_case("text") => Some(FieldKind::TextInput),
            Some(_) => None,
        }
    }
}

/// Editor document: an ordered list of fields, persisted as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Document {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("failed to read document: {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("failed to parse JSON: {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let tmp = {
            let mut p = PathBuf::from(path);
            let name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "document.json".to_string());
            p.set_file_name(format!("{name}.tmp"));
            p
        };

        let bytes = serde_json::to_vec_pretty(self).context("failed to encode JSON")?;
        std::fs::write(&tmp, bytes).with_context(|| format!("failed to write: {}", tmp.display()))?;
        std::fs::rename(&tmp, path).with_context(|| format!("failed to replace: {}", path.display()))?;
        Ok(())
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn field_mut(&mut self, id: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.id == id)
    }
}
