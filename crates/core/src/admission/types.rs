//! Types for the admission module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::media::{classify, extract_extension, MediaType};

/// A file offered by the user, before it is admitted.
#[derive(Clone)]
pub struct CandidateFile {
    /// File name as supplied by the file source.
    pub name: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Declared MIME type (may be empty when the source does not know it).
    pub mime_type: String,
    bytes: Arc<[u8]>,
}

impl CandidateFile {
    /// Creates a candidate whose size is the length of `bytes`.
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size_bytes: bytes.len() as u64,
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Creates a candidate, falling back to a MIME type derived from the file
    /// extension when the declared one is empty or generic.
    pub fn with_detected_mime(
        name: impl Into<String>,
        declared_mime: Option<&str>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let name = name.into();
        let mime_type = match declared_mime {
            Some(mime) if !mime.is_empty() && mime != "application/octet-stream" => {
                mime.to_string()
            }
            _ => mime_from_extension(&name),
        };
        Self::new(name, mime_type, bytes)
    }

    /// Extension of the file name, case preserved.
    pub fn extension(&self) -> &str {
        extract_extension(&self.name)
    }

    /// Shared handle to the file contents.
    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }
}

impl fmt::Debug for CandidateFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateFile")
            .field("name", &self.name)
            .field("size_bytes", &self.size_bytes)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// Best-effort MIME type for a file name, based on the built-in format lists.
pub fn mime_from_extension(file_name: &str) -> String {
    let extension = extract_extension(file_name).to_lowercase();
    match classify(file_name) {
        MediaType::Audio => format!("audio/{}", extension),
        MediaType::Video => format!("video/{}", extension),
        MediaType::Unsupported => "application/octet-stream".to_string(),
    }
}

/// A pattern describing which files are acceptable.
///
/// Parsed from the strings used by file pickers: `*` accepts anything,
/// `video/*` style entries match on the MIME top-level type, and anything
/// else (typically `.mp4`) is matched as a file name suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TypePattern {
    /// Accepts any file.
    Any,
    /// Matches the top-level segment of the declared MIME type.
    MimePrefix(String),
    /// Matches the end of the file name.
    ExtensionSuffix(String),
}

impl TypePattern {
    /// Parses a pattern string. Never fails.
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim();
        if pattern == "*" || pattern == "*/" || pattern == "*/*" {
            return Self::Any;
        }
        match pattern.split_once('/') {
            Some((top, _)) => Self::MimePrefix(top.to_ascii_lowercase()),
            None => Self::ExtensionSuffix(pattern.to_string()),
        }
    }

    /// Whether `file` satisfies this pattern.
    pub fn matches(&self, file: &CandidateFile) -> bool {
        match self {
            Self::Any => true,
            Self::MimePrefix(top) => {
                let declared_top = file.mime_type.split('/').next().unwrap_or("");
                !declared_top.is_empty() && declared_top.eq_ignore_ascii_case(top)
            }
            Self::ExtensionSuffix(suffix) => {
                !suffix.is_empty()
                    && file
                        .name
                        .to_ascii_lowercase()
                        .ends_with(&suffix.to_ascii_lowercase())
            }
        }
    }
}

impl From<String> for TypePattern {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for TypePattern {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<TypePattern> for String {
    fn from(value: TypePattern) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TypePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::MimePrefix(top) => write!(f, "{}/*", top),
            Self::ExtensionSuffix(suffix) => f.write_str(suffix),
        }
    }
}

/// Constraints a candidate file must satisfy to be admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionConstraints {
    /// Accepted type patterns.
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<TypePattern>,
    /// Minimum size in bytes (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size_bytes: Option<u64>,
    /// Maximum size in bytes (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size_bytes: Option<u64>,
}

fn default_allowed_types() -> Vec<TypePattern> {
    vec![TypePattern::parse("video/*"), TypePattern::parse("audio/*")]
}

impl Default for AdmissionConstraints {
    fn default() -> Self {
        Self {
            allowed_types: default_allowed_types(),
            min_size_bytes: None,
            max_size_bytes: None,
        }
    }
}

impl AdmissionConstraints {
    /// Constraints accepting any file of any size.
    pub fn any() -> Self {
        Self {
            allowed_types: vec![TypePattern::Any],
            min_size_bytes: None,
            max_size_bytes: None,
        }
    }

    /// Sets the accepted type patterns.
    pub fn with_types<I, P>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<TypePattern>,
    {
        self.allowed_types = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the minimum size.
    pub fn with_min_size(mut self, bytes: u64) -> Self {
        self.min_size_bytes = Some(bytes);
        self
    }

    /// Sets the maximum size.
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size_bytes = Some(bytes);
        self
    }
}
