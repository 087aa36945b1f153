//! Bounded most-recent-first list of past generations.
//!
//! Metadata is written to a key-value store; the audio itself only lives in
//! memory and is gone after a restart, in which case replaying an item
//! generates its audio again.

use crate::{
    artifact::AudioArtifact,
    constants::{MAX_RECENT_ITEMS, RECENT_LABEL_CHARS},
    error::{Error, Result},
    generation::AudioGenerationService,
    script::DialogueScript,
    storage::KeyValueStore,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Storage key the list is kept under.
pub const RECENT_ITEMS_KEY: &str = "recent_items";

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RecentItem {
    pub id: String,
    pub label: String,
    pub full_text: String,
    pub created_at: DateTime<Utc>,

    /// `full_text` was spoken as a senior/junior dialogue
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dialogue: bool,

    /// Audio generated this session, never persisted
    #[serde(skip)]
    pub artifact: Option<Arc<AudioArtifact>>,
}

impl RecentItem {
    pub fn new(text: &str, artifact: Option<Arc<AudioArtifact>>, created_at: DateTime<Utc>) -> Self {
        RecentItem {
            id: format!("{:016x}", rand::random::<u64>()),
            label: truncated_label(text),
            full_text: text.to_string(),
            created_at,
            dialogue: false,
            artifact,
        }
    }

    /// Text handed to the generation service for this item.
    pub fn speech_text(&self) -> String {
        if self.dialogue {
            DialogueScript::from_source_text(&self.full_text).to_speech_text()
        } else {
            self.full_text.clone()
        }
    }
}

/// The first characters of `text`, with an ellipsis when anything was cut.
pub fn truncated_label(text: &str) -> String {
    let mut chars = text.chars();
    let label: String = chars.by_ref().take(RECENT_LABEL_CHARS).collect();

    if chars.next().is_some() {
        format!("{label}...")
    } else {
        label
    }
}

pub struct RecentItemsStore {
    items: Vec<RecentItem>,

    /// `None` once storage failed, the list then only lives this session
    store: Option<Arc<dyn KeyValueStore>>,
}

impl RecentItemsStore {
    /// Loads the list from `store`. If storage is unusable the list starts
    /// empty and stays in memory only.
    pub async fn open(store: Arc<dyn KeyValueStore>) -> Self {
        match store.load(RECENT_ITEMS_KEY).await {
            Ok(Some(json)) => {
                let mut items = match serde_json::from_str::<Vec<RecentItem>>(&json) {
                    Ok(items) => items,
                    Err(e) => {
                        warn!("Discarding unreadable recent items: {e}");
                        vec![]
                    }
                };
                items.truncate(MAX_RECENT_ITEMS);
                debug!("Loaded {} recent items", items.len());

                RecentItemsStore {
                    items,
                    store: Some(store),
                }
            }
            Ok(None) => RecentItemsStore {
                items: vec![],
                store: Some(store),
            },
            Err(e) => {
                let e = Error::PersistenceUnavailable(format!("{e:#}"));
                warn!("{e}, recent items will not survive this session");
                Self::in_memory()
            }
        }
    }

    pub fn in_memory() -> Self {
        RecentItemsStore {
            items: vec![],
            store: None,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    /// Most recent first.
    pub fn list(&self) -> &[RecentItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&RecentItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Prepends a new item, evicting the oldest beyond the cap.
    pub async fn add(&mut self, text: &str, artifact: Option<Arc<AudioArtifact>>) -> RecentItem {
        self.insert(RecentItem::new(text, artifact, Utc::now())).await
    }

    /// Like `add`, for text typed by the user and spoken as a dialogue.
    /// The item keeps the typed text and rebuilds the dialogue on replay.
    pub async fn add_dialogue(
        &mut self,
        text: &str,
        artifact: Option<Arc<AudioArtifact>>,
    ) -> RecentItem {
        let mut item = RecentItem::new(text, artifact, Utc::now());
        item.dialogue = true;
        self.insert(item).await
    }

    async fn insert(&mut self, item: RecentItem) -> RecentItem {
        self.items.insert(0, item.clone());

        for evicted in self.items.drain(MAX_RECENT_ITEMS.min(self.items.len())..) {
            debug!(
                "Evicted recent item {} (audio held: {})",
                evicted.id,
                evicted.artifact.is_some()
            );
        }

        self.persist().await;
        item
    }

    pub async fn remove(&mut self, id: &str) -> Result<RecentItem> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| Error::ItemNotFound(id.to_string()))?;

        let item = self.items.remove(index);
        self.persist().await;

        Ok(item)
    }

    /// Audio for item `id`: the artifact still held from this session, or a
    /// fresh generation of its text which is then kept on the item.
    pub async fn replay(
        &mut self,
        id: &str,
        service: &AudioGenerationService,
    ) -> Result<Arc<AudioArtifact>> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| Error::ItemNotFound(id.to_string()))?;

        if let Some(artifact) = &item.artifact {
            debug!("Replaying recent item {} from memory", item.id);
            return Ok(artifact.clone());
        }

        info!("Regenerating audio for recent item {}", item.id);
        let artifact = Arc::new(service.generate(&item.speech_text()).await?);
        item.artifact = Some(artifact.clone());

        Ok(artifact)
    }

    async fn persist(&mut self) {
        let Some(store) = &self.store else {
            return;
        };

        let result = match serde_json::to_string(&self.items) {
            Ok(json) => store.save(RECENT_ITEMS_KEY, &json).await,
            Err(e) => Err(e.into()),
        };

        if let Err(e) = result {
            let e = Error::PersistenceUnavailable(format!("{e:#}"));
            error!("{e}, keeping recent items in memory only");
            self.store = None;
        }
    }
}
