//! Stale output removal
//!
//! Every artifact about to be rebuilt has its output directory removed first,
//! so a verification pass can only ever see output from the current build.

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::common::{Error, Result};

/// Check that a name addresses exactly one directory directly below the
/// build-output directory
pub fn validate_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(()),
        _ => Err(Error::InvalidArtifactName(name.to_string())),
    }
}

/// Recursively remove `<build_dir>/<name>` for every name
///
/// All names are validated before anything is removed. Directories that do
/// not exist are skipped. Returns the directories that were actually removed.
pub async fn purge<I, S>(build_dir: &Path, names: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let names: Vec<S> = names.into_iter().collect();
    for name in &names {
        validate_name(name.as_ref())?;
    }

    let mut removed = Vec::new();
    for name in &names {
        let dir = build_dir.join(name.as_ref());
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::debug!("Purged {}", dir.display());
                removed.push(dir);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::trace!("Nothing to purge at {}", dir.display());
            }
            Err(e) => return Err(Error::purge(&dir, e)),
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_artifact(build_dir: &Path, name: &str) {
        let zephyr = build_dir.join(name).join("zephyr");
        fs::create_dir_all(&zephyr).unwrap();
        fs::write(zephyr.join(".config"), "CONFIG_ZMK_STUDIO=y\n").unwrap();
        fs::write(zephyr.join("zmk.uf2"), [0u8; 16]).unwrap();
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("left").is_ok());
        assert!(validate_name("battery_test_with_custom_rpc_support").is_ok());
        assert!(validate_name("tests").is_ok());
        for bad in ["", ".", "..", "../etc", "a/b", "/abs", "left/"] {
            assert!(
                matches!(validate_name(bad), Err(Error::InvalidArtifactName(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_purge_removes_named_directories() {
        let build = tempfile::tempdir().unwrap();
        make_artifact(build.path(), "left");
        make_artifact(build.path(), "right");

        let removed = purge(build.path(), ["left", "right"]).await.unwrap();

        assert_eq!(removed.len(), 2);
        assert!(!build.path().join("left").exists());
        assert!(!build.path().join("right").exists());
    }

    #[tokio::test]
    async fn test_purge_is_idempotent() {
        let build = tempfile::tempdir().unwrap();
        make_artifact(build.path(), "left");

        assert_eq!(purge(build.path(), ["left"]).await.unwrap().len(), 1);
        assert!(purge(build.path(), ["left"]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_leaves_other_artifacts_alone() {
        let build = tempfile::tempdir().unwrap();
        make_artifact(build.path(), "left");
        make_artifact(build.path(), "right");

        purge(build.path(), ["left"]).await.unwrap();

        let right = build.path().join("right").join("zephyr");
        assert_eq!(
            fs::read_to_string(right.join(".config")).unwrap(),
            "CONFIG_ZMK_STUDIO=y\n"
        );
        assert!(right.join("zmk.uf2").exists());
    }

    #[tokio::test]
    async fn test_purge_validates_before_removing_anything() {
        let build = tempfile::tempdir().unwrap();
        make_artifact(build.path(), "left");

        let err = purge(build.path(), ["left", ".."]).await.unwrap_err();

        assert!(matches!(err, Error::InvalidArtifactName(_)));
        assert!(build.path().join("left").exists());
    }

    #[tokio::test]
    async fn test_purge_with_missing_build_dir() {
        let root = tempfile::tempdir().unwrap();
        let removed = purge(&root.path().join("build"), ["tests"]).await.unwrap();
        assert!(removed.is_empty());
    }
}
