//! File admission: deciding whether a dropped or picked file may enter a
//! conversion session.
//!
//! Admission is synchronous and side-effect free. Callers own any user
//! feedback (messages, highlighting) for a refused file.
//!
//! # Example
//!
//! ```
//! use ffmfy_core::admission::{validate, AdmissionConstraints, AdmissionError, CandidateFile};
//!
//! let constraints = AdmissionConstraints::default().with_max_size(4);
//! let file = CandidateFile::new("song.wav", "audio/wav", vec![0u8; 8]);
//!
//! let err = validate(Some(file), &constraints).unwrap_err();
//! assert!(matches!(err, AdmissionError::FileTooLarge { .. }));
//! ```

mod error;
mod picker;
mod types;
mod validator;

pub use error::AdmissionError;
pub use picker::receive_file;
pub use types::{mime_from_extension, AdmissionConstraints, CandidateFile, TypePattern};
pub use validator::validate;
