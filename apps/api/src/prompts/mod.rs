//! Per-category default photo prompts, mirrored from the `categories` table.
//!
//! Rows carry the prompt in their JSON `prompts` column, either as
//! `{ "type": .., "prompt": .. }` or as a plain string keyed by the row `name`.
//! When the table holds no usable row the built-in defaults stay in place.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::models::{ItemType, ItemTypePrompt};
use crate::store::{insert_rows, read_guard, write_guard, IdClock, RowStore, StoreError, Table};

pub mod handlers;

pub fn default_prompts() -> Vec<ItemTypePrompt> {
    vec![
        ItemTypePrompt::new(
            ItemType::Shirt,
            "A high-quality shirt with perfect folds, studio lighting, minimalist background, fashion photography",
        ),
        ItemTypePrompt::new(
            ItemType::Trousers,
            "Stylish trousers on a mannequin, professional lighting, clean background, fashion catalog style",
        ),
        ItemTypePrompt::new(
            ItemType::Shoes,
            "Modern shoes displayed on white surface, soft shadows, professional product photography",
        ),
        ItemTypePrompt::new(
            ItemType::Hat,
            "Elegant hat on a stand, soft studio lighting, neutral background, high-end fashion look",
        ),
        ItemTypePrompt::new(
            ItemType::Scarf,
            "Luxurious scarf with soft draping, gentle lighting, clean background, premium fashion photography",
        ),
    ]
}

#[derive(Debug, Deserialize)]
struct CategoryRow {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    prompts: Option<Value>,
}

impl CategoryRow {
    fn into_prompt(self) -> Option<ItemTypePrompt> {
        match self.prompts? {
            Value::String(text) => {
                let item_type = self.name?.parse().ok()?;
                Some(ItemTypePrompt::new(item_type, text))
            }
            value => serde_json::from_value(value).ok(),
        }
    }
}

#[derive(Debug, Clone)]
struct PromptEntry {
    row_id: Option<i64>,
    prompt: ItemTypePrompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

pub struct PromptStore {
    backend: Arc<dyn RowStore>,
    ids: IdClock,
    entries: RwLock<Vec<PromptEntry>>,
}

impl PromptStore {
    pub fn new(backend: Arc<dyn RowStore>) -> Self {
        let entries = default_prompts()
            .into_iter()
            .map(|prompt| PromptEntry {
                row_id: None,
                prompt,
            })
            .collect();
        Self {
            backend,
            ids: IdClock::new(),
            entries: RwLock::new(entries),
        }
    }

    /// Loads prompts from `categories`; keeps the current set when no row yields a prompt.
    pub async fn fetch_all(&self) -> Result<usize, StoreError> {
        let rows = self
            .backend
            .select_all(Table::Categories)
            .await
            .inspect_err(|e| warn!("Failed to fetch category prompts: {e}"))?;
        let mut loaded: Vec<PromptEntry> = Vec::new();
        for row in rows {
            let Ok(row) = serde_json::from_value::<CategoryRow>(row) else {
                continue;
            };
            let row_id = row.id;
            if let Some(prompt) = row.into_prompt() {
                if !loaded.iter().any(|e| e.prompt.item_type == prompt.item_type) {
                    loaded.push(PromptEntry {
                        row_id: Some(row_id),
                        prompt,
                    });
                }
            }
        }
        if loaded.is_empty() {
            info!("No category prompts stored, keeping defaults");
            return Ok(read_guard(&self.entries).len());
        }
        let count = loaded.len();
        *write_guard(&self.entries) = loaded;
        info!("Loaded {count} category prompts");
        Ok(count)
    }

    /// Adds a prompt for a category that has none yet.
    pub async fn add(&self, prompt: ItemTypePrompt) -> Result<AddOutcome, StoreError> {
        if self.find(prompt.item_type).is_some() {
            return Ok(AddOutcome::AlreadyPresent);
        }
        let row_id = self.insert_row(&prompt).await?;
        let mut entries = write_guard(&self.entries);
        if entries.iter().any(|e| e.prompt.item_type == prompt.item_type) {
            return Ok(AddOutcome::AlreadyPresent);
        }
        entries.push(PromptEntry {
            row_id: Some(row_id),
            prompt,
        });
        Ok(AddOutcome::Added)
    }

    /// Replaces the prompt text of a category, creating the row if it was never stored.
    pub async fn update(&self, item_type: ItemType, text: String) -> Result<ItemTypePrompt, StoreError> {
        let prompt = ItemTypePrompt::new(item_type, text);
        let row_id = match self.find(item_type).and_then(|e| e.row_id) {
            Some(id) => {
                self.backend
                    .update_by_id(Table::Categories, id, json!({ "prompts": prompt }))
                    .await
                    .inspect_err(|e| warn!("Failed to update prompt for {item_type}: {e}"))?;
                id
            }
            None => self.insert_row(&prompt).await?,
        };
        let mut entries = write_guard(&self.entries);
        match entries.iter_mut().find(|e| e.prompt.item_type == item_type) {
            Some(entry) => {
                entry.prompt = prompt.clone();
                entry.row_id = Some(row_id);
            }
            None => entries.push(PromptEntry {
                row_id: Some(row_id),
                prompt: prompt.clone(),
            }),
        }
        Ok(prompt)
    }

    /// The prompt text for a category, or an empty string.
    pub fn get_by_type(&self, item_type: ItemType) -> String {
        self.find(item_type)
            .map(|e| e.prompt.prompt)
            .unwrap_or_default()
    }

    pub fn all(&self) -> Vec<ItemTypePrompt> {
        read_guard(&self.entries)
            .iter()
            .map(|e| e.prompt.clone())
            .collect()
    }

    fn find(&self, item_type: ItemType) -> Option<PromptEntry> {
        read_guard(&self.entries)
            .iter()
            .find(|e| e.prompt.item_type == item_type)
            .cloned()
    }

    async fn insert_row(&self, prompt: &ItemTypePrompt) -> Result<i64, StoreError> {
        let id = self.ids.next_id();
        let row = json!({
            "id": id,
            "name": prompt.item_type.as_str(),
            "prompts": prompt,
        });
        insert_rows(self.backend.as_ref(), Table::Categories, &[row])
            .await
            .inspect_err(|e| warn!("Failed to store prompt for {}: {e}", prompt.item_type))?;
        Ok(id)
    }
}
