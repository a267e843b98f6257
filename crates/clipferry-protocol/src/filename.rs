//! Flat-filename rule for the LAN endpoints
//!
//! `/files/{name}` and `/upload` serve and store single path components
//! only. Anything containing `..`, `/`, or `\` is rejected before it can
//! touch the filesystem.

use crate::error::ProtocolError;
use crate::Result;

/// Validate a filename for LAN serving/storing
///
/// Returns the name unchanged when it is a plain flat filename.
pub fn sanitize(name: &str) -> Result<&str> {
    if name.is_empty() {
        return Err(ProtocolError::BadFilename("empty".to_string()));
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(ProtocolError::BadFilename(name.to_string()));
    }
    Ok(name)
}

/// Split a filename into stem and extension for collision renaming
///
/// The extension includes its dot; a name without a dot (or a dotfile)
/// has an empty extension.
pub fn split_stem(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => name.split_at(pos),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_pass() {
        for name in ["img.png", "notes.txt", "no_extension", "weird name.tar.gz"] {
            assert_eq!(sanitize(name).unwrap(), name);
        }
    }

    #[test]
    fn test_traversal_rejected() {
        for name in [
            "../config.json",
            "..\\config.json",
            "a/../b",
            "dir/file.txt",
            "dir\\file.txt",
            "..",
            "",
        ] {
            assert!(
                matches!(sanitize(name), Err(ProtocolError::BadFilename(_))),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_split_stem() {
        assert_eq!(split_stem("img.png"), ("img", ".png"));
        assert_eq!(split_stem("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_stem("noext"), ("noext", ""));
        assert_eq!(split_stem(".hidden"), (".hidden", ""));
    }
}
