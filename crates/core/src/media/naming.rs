//! Output file naming.

use super::extension::extract_extension;

/// Derives the output file name for a conversion.
///
/// The trailing `.<input_format>` extension (compared ignoring ASCII case) is
/// replaced with `.<output_format>`. Occurrences of the format string elsewhere
/// in the name are left alone. If the name does not end with the input
/// format, the output extension is appended instead.
pub fn derive_output_name(input_name: &str, input_format: &str, output_format: &str) -> String {
    let extension = extract_extension(input_name);

    if !extension.is_empty() && extension.eq_ignore_ascii_case(input_format) {
        let stem = &input_name[..input_name.len() - extension.len()];
        format!("{}{}", stem, output_format)
    } else {
        format!("{}.{}", input_name, output_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_trailing_extension() {
        assert_eq!(derive_output_name("clip.mov", "mov", "mp4"), "clip.mp4");
        assert_eq!(derive_output_name("song.wav", "wav", "mp3"), "song.mp3");
    }

    #[test]
    fn test_format_repeated_inside_name() {
        assert_eq!(
            derive_output_name("mp4-clip.mp4", "mp4", "mp3"),
            "mp4-clip.mp3"
        );
        assert_eq!(
            derive_output_name("my.mov.backup.mov", "mov", "webm"),
            "my.mov.backup.webm"
        );
    }

    #[test]
    fn test_input_format_case_insensitive() {
        assert_eq!(derive_output_name("CLIP.MOV", "mov", "mp4"), "CLIP.mp4");
    }

    #[test]
    fn test_mismatched_extension_appends() {
        assert_eq!(derive_output_name("clip.avi", "mov", "mp4"), "clip.avi.mp4");
        assert_eq!(derive_output_name("noext", "mov", "mp4"), "noext.mp4");
    }
}
