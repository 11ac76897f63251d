/// Characters that are not allowed in file names on common filesystems.
const INVALID_FILENAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Replaces characters that are invalid in file names with `_`.
///
/// # Examples
///
/// ```rust
/// assert_eq!(sanitize_filename("AC/DC: Live?"), "AC_DC_ Live_");
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|chr| {
            if INVALID_FILENAME_CHARS.contains(&chr) {
                '_'
            } else {
                chr
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize_filename("normal.txt"), "normal.txt");
        assert_eq!(
            sanitize_filename("file/with\\invalid:chars*?.txt"),
            "file_with_invalid_chars__.txt"
        );
        assert_eq!(sanitize_filename("file\"with<>|chars.txt"), "file_with___chars.txt");
        assert_eq!(sanitize_filename(""), "");
    }

    #[test]
    fn sanitize_keeps_unicode() {
        assert_eq!(sanitize_filename("Кино - Группа крови"), "Кино - Группа крови");
    }
}
