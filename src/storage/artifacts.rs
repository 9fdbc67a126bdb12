use crate::crawler::StoryId;
use crate::storage::{StorageError, StorageResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use url::Url;

/// Writes fetched pages below a story-scoped directory
///
/// In dry-run mode every call behaves exactly like a successful write,
/// including name validation and the returned byte count, but nothing
/// touches the disk.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    dry_run: bool,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            root: root.into(),
            dry_run,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Directory holding all artifacts of one story
    pub fn story_dir(&self, story_id: StoryId) -> PathBuf {
        self.root.join(story_id.to_string())
    }

    /// Creates the root directory (no-op in dry-run mode)
    pub async fn prepare(&self) -> StorageResult<()> {
        if self.dry_run {
            return Ok(());
        }
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::Io {
                path: self.root.clone(),
                source,
            })
    }

    /// Persists one artifact and returns the number of bytes written
    ///
    /// The content goes to a temporary sibling first and is then renamed over
    /// the target, so saving the same name twice leaves the last complete
    /// version in place.
    ///
    /// # Arguments
    ///
    /// * `story_id` - The story the artifact belongs to
    /// * `name` - File name inside the story directory (no path separators)
    /// * `bytes` - Content to write
    pub async fn save(&self, story_id: StoryId, name: &str, bytes: &[u8]) -> StorageResult<u64> {
        validate_name(name)?;
        let written = bytes.len() as u64;

        if self.dry_run {
            tracing::trace!("Dry run: skipping write of {} ({} bytes)", name, written);
            return Ok(written);
        }

        let dir = self.story_dir(story_id);
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| StorageError::Io {
                path: dir.clone(),
                source,
            })?;

        let target = dir.join(name);
        let partial = dir.join(format!(".{}.part", name));

        fs::write(&partial, bytes)
            .await
            .map_err(|source| StorageError::Io {
                path: partial.clone(),
                source,
            })?;
        fs::rename(&partial, &target)
            .await
            .map_err(|source| StorageError::Io {
                path: target.clone(),
                source,
            })?;

        tracing::trace!("Wrote {} bytes to {}", written, target.display());
        Ok(written)
    }
}

fn validate_name(name: &str) -> StorageResult<()> {
    if name.is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Derives the artifact file name for a URL
///
/// The stem is the full hex SHA-256 of the URL, which keeps names stable
/// across runs and makes collisions between different URLs practically
/// impossible.
pub fn artifact_name(url: &Url, content_type: Option<&str>) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    format!("{}.{}", hex::encode(digest), extension_for(content_type))
}

/// Maps a Content-Type header to a file extension
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match essence.as_str() {
        "text/html" | "application/xhtml+xml" => "html",
        "text/plain" => "txt",
        "application/pdf" => "pdf",
        "application/json" => "json",
        "application/xml" | "text/xml" | "application/rss+xml" | "application/atom+xml" => "xml",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/svg+xml" => "svg",
        "image/webp" => "webp",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_save_writes_file() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path(), false);

        let written = store.save(StoryId(42), "page.html", b"<html></html>").await.unwrap();

        assert_eq!(written, 13);
        let content = std::fs::read(dir.path().join("42").join("page.html")).unwrap();
        assert_eq!(content, b"<html></html>");
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path(), false);

        store.save(StoryId(1), "a.html", b"first version").await.unwrap();
        store.save(StoryId(1), "a.html", b"second").await.unwrap();

        let story_dir = dir.path().join("1");
        assert_eq!(std::fs::read(story_dir.join("a.html")).unwrap(), b"second");
        // no leftover partial files
        assert_eq!(std::fs::read_dir(&story_dir).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_reports_success_without_writing() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("pages"), true);

        store.prepare().await.unwrap();
        let written = store.save(StoryId(9), "x.html", b"12345").await.unwrap();

        assert_eq!(written, 5);
        assert!(!dir.path().join("pages").exists());
    }

    #[tokio::test]
    async fn test_rejects_path_like_names() {
        let dir = TempDir::new().unwrap();
        for dry_run in [true, false] {
            let store = ArtifactStore::new(dir.path(), dry_run);
            for name in ["", "../escape.html", "a/b.html", ".hidden"] {
                let result = store.save(StoryId(1), name, b"x").await;
                assert!(matches!(result, Err(StorageError::InvalidName(_))), "{}", name);
            }
        }
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        // a regular file where the root directory should be
        let blocker = dir.path().join("pages");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let store = ArtifactStore::new(&blocker, false);
        let result = store.save(StoryId(1), "a.html", b"x").await;

        assert!(matches!(result, Err(StorageError::Io { .. })));
    }

    #[test]
    fn test_artifact_name_is_deterministic() {
        let a = artifact_name(&url("https://example.com/a"), Some("text/html"));
        let b = artifact_name(&url("https://example.com/a"), Some("text/html"));
        let c = artifact_name(&url("https://example.com/b"), Some("text/html"));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.ends_with(".html"));
        assert_eq!(a.len(), 64 + ".html".len());
    }

    #[test]
    fn test_extension_for_content_types() {
        assert_eq!(extension_for(Some("text/html; charset=utf-8")), "html");
        assert_eq!(extension_for(Some("application/PDF")), "pdf");
        assert_eq!(extension_for(Some("image/png")), "png");
        assert_eq!(extension_for(Some("application/octet-stream")), "bin");
        assert_eq!(extension_for(None), "bin");
    }
}
