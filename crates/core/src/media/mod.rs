//! Media file naming and classification.
//!
//! Everything here is pure and total: file names go in, extensions, media
//! kinds and derived output names come out. No I/O is performed.

mod classifier;
mod extension;
mod naming;

pub use classifier::{
    classify, output_formats_for, MediaClassifier, MediaType, SUPPORTED_AUDIO_FORMATS,
    SUPPORTED_VIDEO_FORMATS,
};
pub use extension::extract_extension;
pub use naming::derive_output_name;
