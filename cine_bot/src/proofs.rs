//! Storage for payment proof screenshots.

use std::path::{Path, PathBuf};

use teloxide::types::UserId;

use crate::types::Plan;

pub struct ProofStorage {
    dir: PathBuf,
    /// URL the directory is served under.
    public_base: String,
}

impl ProofStorage {
    pub fn new(dir: impl Into<PathBuf>, public_base: impl Into<String>) -> ProofStorage {
        ProofStorage {
            dir: dir.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save the image and return the public URL it will be reachable at.
    pub async fn store(&self, user: UserId, plan: Plan, image: &[u8]) -> std::io::Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let name = format!("{}_{}_{}.jpg", user.0, plan.as_str(), uuid::Uuid::new_v4());
        tokio::fs::write(self.dir.join(&name), image).await?;

        log::debug!("Stored {} byte proof as {}", image.len(), name);
        Ok(format!("{}/{}", self.public_base, name))
    }

    /// Delete a proof stored under `url`, if it's one of ours. Failures are
    /// only logged.
    pub async fn discard(&self, url: &str) {
        let Some(name) = url
            .strip_prefix(self.public_base.as_str())
            .and_then(|x| x.strip_prefix('/'))
            .filter(|x| !x.is_empty() && !x.contains(['/', '\\']))
        else {
            log::warn!("Not discarding {url}, it's not a stored proof");
            return;
        };

        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => log::debug!("Discarded proof {name}"),
            Err(e) => log::warn!("Failed to discard proof {name}, it's left behind: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn stored_file_is_reachable_by_its_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ProofStorage::new(dir.path().join("proofs"), "https://panel.test/proofs/");

        let url = storage.store(UserId(42), Plan::Premium, b"jpeg").await.unwrap();
        let name = url.strip_prefix("https://panel.test/proofs/").unwrap();
        assert!(name.starts_with("42_premium_"));
        assert!(name.ends_with(".jpg"));

        let stored = tokio::fs::read(storage.dir().join(name)).await.unwrap();
        assert_eq!(stored, b"jpeg");

        let other = storage.store(UserId(42), Plan::Premium, b"jpeg").await.unwrap();
        assert_ne!(url, other);
    }

    #[tokio::test]
    async fn discard_only_touches_stored_proofs() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ProofStorage::new(dir.path().join("proofs"), "https://panel.test/proofs");
        let outside = dir.path().join("keep.txt");
        tokio::fs::write(&outside, b"x").await.unwrap();

        let url = storage.store(UserId(1), Plan::Classic, b"jpeg").await.unwrap();
        storage.discard(&url).await;
        storage.discard("https://panel.test/proofs/../keep.txt").await;
        storage.discard("https://elsewhere.test/keep.txt").await;

        let mut left = tokio::fs::read_dir(storage.dir()).await.unwrap();
        assert!(left.next_entry().await.unwrap().is_none());
        assert!(outside.exists());
    }
}
