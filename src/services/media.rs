use std::io;
use std::path::{Path, PathBuf};

use crate::state::UserId;

/// Write-only side channel for uploads and generated reports.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn save_photo(&self, user: UserId, file_id: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let name = format!("{}_{}.jpg", user, sanitize_file_name(file_id));
        self.write(&name, bytes).await
    }

    pub async fn save_document(
        &self,
        user: UserId,
        file_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> io::Result<PathBuf> {
        let name = format!(
            "{}_{}_{}",
            user,
            sanitize_file_name(file_id),
            sanitize_file_name(file_name)
        );
        self.write(&name, bytes).await
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Finds a stored PDF of `user`. A non-empty `hint` matches either a full
    /// stored path or the tail of a stored file name; otherwise the newest
    /// PDF wins.
    pub async fn find_user_pdf(&self, user: UserId, hint: &str) -> io::Result<Option<PathBuf>> {
        let hint = hint.trim();
        let prefix = format!("{}_", user);
        if !hint.is_empty() {
            let as_path = Path::new(hint);
            let owned = as_path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".pdf"));
            if owned
                && as_path.parent() == Some(self.root.as_path())
                && tokio::fs::metadata(as_path).await.is_ok()
            {
                return Ok(Some(as_path.to_path_buf()));
            }
        }

        let wanted = sanitize_file_name(hint).to_lowercase();
        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if !name.starts_with(&prefix) || !name.ends_with(".pdf") {
                continue;
            }
            if !hint.is_empty() && !name.ends_with(&wanted) {
                continue;
            }
            let modified = entry.metadata().await?.modified()?;
            if newest.as_ref().map_or(true, |(t, _)| modified >= *t) {
                newest = Some((modified, entry.path()));
            }
        }

        Ok(newest.map(|(_, path)| path))
    }
}

/// Keeps a single path component: separators and control characters become `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.trim_matches('.') {
        "" => "file".to_string(),
        _ => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_traversal() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name(".."), "file");
        assert_eq!(sanitize_file_name("biên bản.pdf"), "biên bản.pdf");
    }

    #[tokio::test]
    async fn documents_land_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path().join("media"));

        let path = store.save_document(7, "F1", "a/b.pdf", b"%PDF").await.unwrap();

        assert_eq!(path, dir.path().join("media").join("7_F1_a_b.pdf"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn find_user_pdf_by_hint_and_owner() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());
        store.save_document(7, "F1", "hop-dong.pdf", b"x").await.unwrap();
        store.save_document(7, "F2", "bien-ban.pdf", b"y").await.unwrap();
        store.save_document(8, "F3", "bien-ban.pdf", b"z").await.unwrap();

        let found = store.find_user_pdf(7, "bien-ban.pdf").await.unwrap().unwrap();
        assert_eq!(found, dir.path().join("7_F2_bien-ban.pdf"));

        assert!(store.find_user_pdf(9, "").await.unwrap().is_none());
        assert!(store.find_user_pdf(7, "missing.pdf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn full_path_of_own_pdf_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());
        let own = store.save_document(7, "F1", "ho-so.pdf", b"x").await.unwrap();

        let found = store.find_user_pdf(7, &own.display().to_string()).await.unwrap();
        assert_eq!(found, Some(own));
    }

    #[tokio::test]
    async fn full_path_of_another_users_pdf_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());
        let foreign = store.save_document(8, "F9", "private.pdf", b"secret").await.unwrap();
        let photo = store.save_photo(7, "P1", b"jpeg").await.unwrap();

        assert!(store.find_user_pdf(7, &foreign.display().to_string()).await.unwrap().is_none());
        assert!(store.find_user_pdf(7, &photo.display().to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn without_hint_newest_own_pdf_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());
        let older = store.save_document(7, "F1", "cu.pdf", b"old").await.unwrap();
        let newer = store.save_document(7, "F2", "moi.pdf", b"new").await.unwrap();
        let other = store.save_document(8, "F3", "khac.pdf", b"other").await.unwrap();

        let now = std::time::SystemTime::now();
        let set_mtime = |path: &Path, age_secs: u64| {
            std::fs::File::options()
                .write(true)
                .open(path)
                .unwrap()
                .set_modified(now - std::time::Duration::from_secs(age_secs))
                .unwrap();
        };
        set_mtime(&older, 300);
        set_mtime(&newer, 60);
        set_mtime(&other, 0);

        assert_eq!(store.find_user_pdf(7, "").await.unwrap(), Some(newer));
    }

    #[tokio::test]
    async fn missing_root_finds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path().join("never-created"));
        assert!(store.find_user_pdf(1, "").await.unwrap().is_none());
    }
}
