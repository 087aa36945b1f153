//! Unit tests for the recent and storage modules

#[cfg(test)]
mod tests {
    use crate::artifact::AudioArtifact;
    use crate::error::Error;
    use crate::recent::{truncated_label, RecentItem, RecentItemsStore, RECENT_ITEMS_KEY};
    use crate::storage::{JsonFileStore, KeyValueStore, MemoryStore};
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Store whose disk is always full.
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn load(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        async fn save(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("No space left on device")
        }
    }

    #[test]
    fn test_label_short_text_unchanged() {
        assert_eq!(truncated_label("短いテキスト"), "短いテキスト");
        assert_eq!(truncated_label(&"a".repeat(50)), "a".repeat(50));
    }

    #[test]
    fn test_label_truncates_by_chars() {
        let text = "あ".repeat(51);
        assert_eq!(truncated_label(&text), format!("{}...", "あ".repeat(50)));
    }

    #[tokio::test]
    async fn test_add_keeps_ten_most_recent_first() {
        let mut recent = RecentItemsStore::in_memory();

        for i in 0..11 {
            recent.add(&format!("item {i}"), None).await;
        }

        let texts: Vec<&str> = recent.list().iter().map(|item| item.full_text.as_str()).collect();
        assert_eq!(texts.len(), 10);
        assert_eq!(texts[0], "item 10");
        assert_eq!(texts[9], "item 1");
        assert!(!texts.contains(&"item 0"));
    }

    #[tokio::test]
    async fn test_eviction_releases_artifact() {
        let mut recent = RecentItemsStore::in_memory();

        let artifact = Arc::new(AudioArtifact::live("first"));
        let first = recent.add("first", Some(artifact.clone())).await;
        assert_eq!(Arc::strong_count(&artifact), 3);

        for i in 0..10 {
            recent.add(&format!("item {i}"), None).await;
        }

        assert!(recent.get(&first.id).is_none());
        // The returned clone of the item is the only other holder left
        drop(first);
        assert_eq!(Arc::strong_count(&artifact), 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let mut recent = RecentItemsStore::in_memory();
        let item = recent.add("remove me", None).await;
        recent.add("keep me", None).await;

        let removed = recent.remove(&item.id).await.unwrap();
        assert_eq!(removed.full_text, "remove me");
        assert_eq!(recent.list().len(), 1);

        assert_eq!(
            recent.remove(&item.id).await,
            Err(Error::ItemNotFound(item.id.clone()))
        );
    }

    #[tokio::test]
    async fn test_only_metadata_survives_reload() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let mut recent = RecentItemsStore::open(store.clone()).await;
        let added = recent
            .add("保存される", Some(Arc::new(AudioArtifact::live("保存される"))))
            .await;
        drop(recent);

        let reloaded = RecentItemsStore::open(store.clone()).await;
        let item = &reloaded.list()[0];

        assert_eq!(item.id, added.id);
        assert_eq!(item.label, "保存される");
        assert_eq!(item.full_text, "保存される");
        assert_eq!(item.created_at, added.created_at);
        assert!(item.artifact.is_none());

        let json = store.load(RECENT_ITEMS_KEY).await.unwrap().unwrap();
        assert!(!json.contains("artifact"));
    }

    #[tokio::test]
    async fn test_failed_save_degrades_to_memory() {
        let mut recent = RecentItemsStore::open(Arc::new(BrokenStore)).await;
        assert!(recent.is_persistent());

        recent.add("still listed", None).await;

        assert!(!recent.is_persistent());
        assert_eq!(recent.list().len(), 1);

        recent.add("still works", None).await;
        assert_eq!(recent.list().len(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_json_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.save(RECENT_ITEMS_KEY, "{not json").await.unwrap();

        let recent = RecentItemsStore::open(store).await;
        assert!(recent.list().is_empty());
        assert!(recent.is_persistent());
    }

    #[tokio::test]
    async fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));

        assert_eq!(store.load("key").await.unwrap(), None);

        store.save("key", "[1,2,3]").await.unwrap();
        assert_eq!(store.load("key").await.unwrap().as_deref(), Some("[1,2,3]"));

        // No temp file left behind
        assert!(!dir.path().join("nested/key.json.tmp").exists());
        assert!(dir.path().join("nested/key.json").exists());
    }

    #[test]
    fn test_item_ids_differ() {
        let now = chrono::Utc::now();
        let a = RecentItem::new("a", None, now);
        let b = RecentItem::new("a", None, now);

        assert_ne!(a.id, b.id);
    }
}
