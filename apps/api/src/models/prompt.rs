use serde::{Deserialize, Serialize};

use super::item::ItemType;

/// Default photo prompt for one item category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemTypePrompt {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub prompt: String,
}

impl ItemTypePrompt {
    pub fn new(item_type: ItemType, prompt: impl Into<String>) -> Self {
        Self {
            item_type,
            prompt: prompt.into(),
        }
    }
}
