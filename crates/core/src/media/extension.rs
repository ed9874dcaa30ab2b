//! File extension extraction.

/// Returns the part of `file_name` after its last `.`.
///
/// Names without a dot, and names whose only dot is the leading one
/// (`.bashrc`), have no extension and yield `""`. Case is preserved.
pub fn extract_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        None | Some(0) => "",
        Some(idx) => &file_name[idx + 1..],
    }
}
