//! Safety utilities to prevent accidental file deletion.
//!
//! These checks run before any removal batch and refuse the whole batch if a
//! single target looks wrong.

use anyhow::{bail, Result};
use std::path::{Component, Path};

use crate::scanner::is_supported;

/// Validates that every removal target is safe to delete.
///
/// Checks:
/// - The path lies strictly under the root
/// - The part below the root contains no `..` components
/// - The path carries a supported audio extension
///
/// # Arguments
/// * `root` - The scanned library root
/// * `targets` - Paths scheduled for deletion
///
/// # Returns
/// * `Ok(())` if every target passes
/// * `Err` naming the first offending path otherwise
pub fn validate_removal_targets<P: AsRef<Path>>(root: &Path, targets: &[P]) -> Result<()> {
    for target in targets {
        let target = target.as_ref();

        let relative = target.strip_prefix(root).ok().filter(|rest| !rest.as_os_str().is_empty());
        let Some(relative) = relative else {
            bail!(
                "Safety check failed: '{}' is outside the library root '{}'",
                target.display(),
                root.display()
            );
        };

        // The root may itself be relative (`../music`); only the part below it is checked.
        if relative.components().any(|c| c == Component::ParentDir) {
            bail!(
                "Safety check failed: '{}' contains a parent-directory component",
                target.display()
            );
        }

        if !is_supported(target) {
            bail!(
                "Safety check failed: '{}' is not a supported audio file",
                target.display()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_targets() {
        let root = PathBuf::from("/music");
        let targets = vec![PathBuf::from("/music/a/song.mp3"), PathBuf::from("/music/b.FLAC")];
        assert!(validate_removal_targets(&root, &targets).is_ok());
    }

    #[test]
    fn test_empty_batch() {
        let targets: Vec<PathBuf> = Vec::new();
        assert!(validate_removal_targets(Path::new("/music"), &targets).is_ok());
    }

    #[test]
    fn test_outside_root() {
        let result = validate_removal_targets(Path::new("/music"), &[PathBuf::from("/musical/song.mp3")]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("outside the library root"));
    }

    #[test]
    fn test_parent_dir_escape() {
        let result = validate_removal_targets(Path::new("/music"), &[PathBuf::from("/music/../etc/x.mp3")]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("parent-directory"));
    }

    #[test]
    fn test_relative_root_with_parent_dir() {
        let root = PathBuf::from("../music");
        let targets = vec![root.join("a/dup.mp3")];
        assert!(validate_removal_targets(&root, &targets).is_ok());

        let escaping = vec![root.join("a/../../etc/x.mp3")];
        let result = validate_removal_targets(&root, &escaping);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("parent-directory"));
    }

    #[test]
    fn test_unsupported_extension_refuses_batch() {
        let targets = vec![PathBuf::from("/music/ok.mp3"), PathBuf::from("/music/cover.jpg")];
        let result = validate_removal_targets(Path::new("/music"), &targets);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("not a supported audio file"));
    }

    #[test]
    fn test_root_itself_blocked() {
        let result = validate_removal_targets(Path::new("/music"), &[PathBuf::from("/music")]);
        assert!(result.is_err());
    }
}
