//! Waiting on a file source.
//!
//! A file source (native picker window, multipart upload, ...) delivers at
//! most one file. The wait is bounded: when the source neither delivers nor
//! closes within the check delay, the selection is treated as empty.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;

use super::error::AdmissionError;
use super::types::CandidateFile;

/// Waits up to `check_delay` for `selection` to yield a file.
pub async fn receive_file<F>(
    selection: F,
    check_delay: Duration,
) -> Result<CandidateFile, AdmissionError>
where
    F: Future<Output = Option<CandidateFile>>,
{
    match timeout(check_delay, selection).await {
        Ok(Some(file)) => Ok(file),
        Ok(None) => Err(AdmissionError::NoFileSelected),
        Err(_) => {
            debug!(
                "No file received within {} ms, treating selection as closed",
                check_delay.as_millis()
            );
            Err(AdmissionError::NoFileSelected)
        }
    }
}
