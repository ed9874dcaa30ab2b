//! Extension based media classification.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::extension::extract_extension;

/// Audio formats accepted out of the box, in display order.
pub const SUPPORTED_AUDIO_FORMATS: &[&str] = &[
    "MP3", "WAV", "OGG", "FLAC", "AAC", "M4A", "OPUS", "WMA", "AIFF",
];

/// Video formats accepted out of the box, in display order.
pub const SUPPORTED_VIDEO_FORMATS: &[&str] = &[
    "MP4", "WEBM", "MKV", "MOV", "AVI", "FLV", "WMV", "MPEG", "3GP",
];

static DEFAULT_CLASSIFIER: Lazy<MediaClassifier> = Lazy::new(MediaClassifier::default);

/// Kind of media a file name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Audio,
    Video,
    Unsupported,
}

impl MediaType {
    /// Whether this is a media kind the converter can work with.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies file names against two ordered allow-lists of uppercase
/// extension tokens.
///
/// The lists are expected to be disjoint; if a token were present in both,
/// the audio list wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaClassifier {
    audio: Vec<String>,
    video: Vec<String>,
}

impl Default for MediaClassifier {
    fn default() -> Self {
        Self {
            audio: SUPPORTED_AUDIO_FORMATS.iter().map(|s| s.to_string()).collect(),
            video: SUPPORTED_VIDEO_FORMATS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl MediaClassifier {
    /// Creates a classifier from custom format lists.
    ///
    /// Tokens are uppercased; callers wanting disjointness guarantees should
    /// validate the lists first (see `config::validate_config`).
    pub fn new(audio: Vec<String>, video: Vec<String>) -> Self {
        Self {
            audio: audio.into_iter().map(|f| f.to_uppercase()).collect(),
            video: video.into_iter().map(|f| f.to_uppercase()).collect(),
        }
    }

    pub fn audio_formats(&self) -> &[String] {
        &self.audio
    }

    pub fn video_formats(&self) -> &[String] {
        &self.video
    }

    /// Classifies a file name by its extension, ignoring case.
    pub fn classify(&self, file_name: &str) -> MediaType {
        let extension = extract_extension(file_name).to_uppercase();

        if self.audio.iter().any(|f| *f == extension) {
            MediaType::Audio
        } else if self.video.iter().any(|f| *f == extension) {
            MediaType::Video
        } else {
            MediaType::Unsupported
        }
    }

    /// Output formats offered for an input of the given kind.
    ///
    /// A video may be converted to any video or audio format; audio only to
    /// audio formats.
    pub fn output_formats_for(&self, kind: MediaType) -> Vec<String> {
        match kind {
            MediaType::Audio => self.audio.clone(),
            MediaType::Video => {
                let mut formats: Vec<String> =
                    Vec::with_capacity(self.video.len() + self.audio.len());
                for format in self.video.iter().chain(self.audio.iter()) {
                    if !formats.contains(format) {
                        formats.push(format.clone());
                    }
                }
                formats
            }
            MediaType::Unsupported => Vec::new(),
        }
    }
}

/// Classifies a file name using the built-in format lists.
pub fn classify(file_name: &str) -> MediaType {
    DEFAULT_CLASSIFIER.classify(file_name)
}

/// Output formats offered for `kind` using the built-in format lists.
pub fn output_formats_for(kind: MediaType) -> Vec<String> {
    DEFAULT_CLASSIFIER.output_formats_for(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lists_are_disjoint() {
        for audio in SUPPORTED_AUDIO_FORMATS {
            assert!(
                !SUPPORTED_VIDEO_FORMATS.contains(audio),
                "{} present in both lists",
                audio
            );
        }
    }

    #[test]
    fn test_every_builtin_format_classifies_in_any_case() {
        for format in SUPPORTED_AUDIO_FORMATS {
            assert_eq!(classify(&format!("a.{}", format)), MediaType::Audio);
            assert_eq!(
                classify(&format!("a.{}", format.to_lowercase())),
                MediaType::Audio
            );
        }
        for format in SUPPORTED_VIDEO_FORMATS {
            assert_eq!(classify(&format!("a.{}", format)), MediaType::Video);
            assert_eq!(
                classify(&format!("a.{}", format.to_lowercase())),
                MediaType::Video
            );
        }
    }

    #[test]
    fn test_mixed_case() {
        assert_eq!(classify("song.mp3"), MediaType::Audio);
        assert_eq!(classify("song.MP3"), MediaType::Audio);
        assert_eq!(classify("clip.MoV"), MediaType::Video);
    }

    #[test]
    fn test_unsupported() {
        assert_eq!(classify("notes.txt"), MediaType::Unsupported);
        assert_eq!(classify("noext"), MediaType::Unsupported);
        assert_eq!(classify(".mp3"), MediaType::Unsupported);
    }

    #[test]
    fn test_audio_wins_on_overlap() {
        let classifier = MediaClassifier::new(vec!["mka".into()], vec!["MKA".into()]);
        assert_eq!(classifier.classify("x.mka"), MediaType::Audio);
    }

    #[test]
    fn test_output_formats_for_audio_is_audio_only() {
        let formats = output_formats_for(MediaType::Audio);
        assert_eq!(formats.len(), SUPPORTED_AUDIO_FORMATS.len());
        assert!(formats.iter().all(|f| classify(&format!("x.{}", f)) == MediaType::Audio));
    }

    #[test]
    fn test_output_formats_for_video_keeps_order_without_duplicates() {
        let classifier = MediaClassifier::new(
            vec!["MP3".into(), "WAV".into()],
            vec!["MP4".into(), "MP3".into()],
        );
        assert_eq!(
            classifier.output_formats_for(MediaType::Video),
            vec!["MP4", "MP3", "WAV"]
        );
    }

    #[test]
    fn test_output_formats_for_unsupported_is_empty() {
        assert!(output_formats_for(MediaType::Unsupported).is_empty());
    }

    #[test]
    fn test_media_type_serialization() {
        assert_eq!(serde_json::to_string(&MediaType::Audio).unwrap(), "\"audio\"");
        assert_eq!(MediaType::Video.to_string(), "video");
    }
}
