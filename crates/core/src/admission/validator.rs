//! File admission checks.

use tracing::debug;

use super::error::AdmissionError;
use super::types::{AdmissionConstraints, CandidateFile, TypePattern};

/// Checks a candidate file against `constraints`.
///
/// The type check runs first; size bounds are only looked at once the type
/// is acceptable. The file is returned unchanged on success.
pub fn validate(
    file: Option<CandidateFile>,
    constraints: &AdmissionConstraints,
) -> Result<CandidateFile, AdmissionError> {
    let file = file.ok_or(AdmissionError::NoFileSelected)?;

    if !type_allowed(&file, &constraints.allowed_types) {
        return Err(AdmissionError::UnsupportedFileType {
            extension: file.extension().to_string(),
        });
    }

    if let Some(min) = constraints.min_size_bytes {
        if file.size_bytes < min {
            return Err(AdmissionError::FileTooSmall {
                min: constraints.min_size_bytes,
                max: constraints.max_size_bytes,
            });
        }
    }

    if let Some(max) = constraints.max_size_bytes {
        if file.size_bytes > max {
            return Err(AdmissionError::FileTooLarge {
                min: constraints.min_size_bytes,
                max: constraints.max_size_bytes,
            });
        }
    }

    debug!(
        "Admitted {} ({} bytes, {})",
        file.name, file.size_bytes, file.mime_type
    );
    Ok(file)
}

fn type_allowed(file: &CandidateFile, patterns: &[TypePattern]) -> bool {
    if patterns.contains(&TypePattern::Any) {
        return true;
    }
    patterns.iter().any(|p| p.matches(file))
}
