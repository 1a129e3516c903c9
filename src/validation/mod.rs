//! Content validation
//!
//! Syntax checks run before content is pushed to a repository:
//! - YAML (`.yaml`, `.yml`) parsed with serde_yaml
//! - JSON (`.json`) and JSON with comments (`.jsonc`) parsed with serde_json
//!
//! Only syntax is checked, never the shape of the document.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Error during content validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("content cannot be empty")]
    Empty,
    #[error("failed to parse YAML content: {0}")]
    Yaml(String),
    #[error("failed to parse JSON content: {0}")]
    Json(String),
    #[error("file {path:?} must have one of the extensions {expected:?}")]
    Extension {
        path: String,
        expected: &'static [&'static str],
    },
}

/// Result type for validation operations
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Check that `content` is a non-empty, well-formed YAML document
pub fn validate_yaml(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    serde_yaml::from_str::<serde_yaml::Value>(content)
        .map(|_| ())
        .map_err(|e| ValidationError::Yaml(e.to_string()))
}

/// Check that `content` is a non-empty, well-formed JSON document
pub fn validate_json(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    serde_json::from_str::<serde_json::Value>(content)
        .map(|_| ())
        .map_err(|e| ValidationError::Json(e.to_string()))
}

/// Check a JSONC document: comments are removed, then the rest must be JSON
pub fn validate_jsonc(content: &str) -> Result<()> {
    validate_json(&strip_json_comments(content))
}

/// Remove `//` line comments and `/* */` block comments outside strings.
///
/// Newlines inside comments are kept so parser positions still line up.
pub fn strip_json_comments(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = '\0';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        out.push('\n');
                    }
                    previous = next;
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Format of a managed file, chosen by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            FileFormat::Yaml => &["yaml", "yml"],
            FileFormat::Json => &["json", "jsonc"],
        }
    }

    /// Format implied by a path's extension, if it is one we manage
    pub fn from_path(path: &str) -> Option<FileFormat> {
        let extension = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
        [FileFormat::Yaml, FileFormat::Json]
            .into_iter()
            .find(|format| format.extensions().contains(&extension.as_str()))
    }

    /// Reject paths that do not carry one of this format's extensions
    pub fn check_extension(&self, path: &str) -> Result<()> {
        if FileFormat::from_path(path) == Some(*self) {
            Ok(())
        } else {
            Err(ValidationError::Extension {
                path: path.to_string(),
                expected: self.extensions(),
            })
        }
    }

    /// Validate `content` destined for `path`
    pub fn validate(&self, path: &str, content: &str) -> Result<()> {
        self.check_extension(path)?;
        match self {
            FileFormat::Yaml => validate_yaml(content),
            FileFormat::Json if is_jsonc(path) => validate_jsonc(content),
            FileFormat::Json => validate_json(content),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Yaml => f.write_str("yaml"),
            FileFormat::Json => f.write_str("json"),
        }
    }
}

fn is_jsonc(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jsonc"))
}
