use serde::{Deserialize, Deserializer, Serialize};

use super::item::ItemId;

pub type CombineId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CombineStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One of the five outfit positions an item can fill.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Head,
    Top,
    Bottom,
    Shoe,
    Bag,
}

impl Slot {
    /// Product nesting order: head outermost, bag innermost.
    pub const ALL: [Slot; 5] = [Slot::Head, Slot::Top, Slot::Bottom, Slot::Shoe, Slot::Bag];
}

/// A named batch request: "generate all these outfit combinations".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobCombine {
    pub id: CombineId,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub desc: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub prompt: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub status: CombineStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CombinePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CombineStatus>,
}

impl JobCombine {
    pub fn apply(&mut self, patch: &CombinePatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(desc) = &patch.desc {
            self.desc = desc.clone();
        }
        if let Some(prompt) = &patch.prompt {
            self.prompt = prompt.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

/// One concrete outfit inside a [`JobCombine`]. `None` in a slot means the
/// outfit has no item there; it is stored as NULL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobCombineItem {
    pub id: i64,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub job_id: CombineId,
    #[serde(default, deserialize_with = "slot_ref")]
    pub item_head: Option<ItemId>,
    #[serde(default, deserialize_with = "slot_ref")]
    pub item_top: Option<ItemId>,
    #[serde(default, deserialize_with = "slot_ref")]
    pub item_bottom: Option<ItemId>,
    #[serde(default, deserialize_with = "slot_ref")]
    pub item_shoe: Option<ItemId>,
    #[serde(default, deserialize_with = "slot_ref")]
    pub item_bag: Option<ItemId>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub status: CombineStatus,
    #[serde(default)]
    pub output: Option<String>,
}

impl JobCombineItem {
    pub fn slot(&self, slot: Slot) -> Option<ItemId> {
        match slot {
            Slot::Head => self.item_head,
            Slot::Top => self.item_top,
            Slot::Bottom => self.item_bottom,
            Slot::Shoe => self.item_shoe,
            Slot::Bag => self.item_bag,
        }
    }
}

// Older rows used 0 for an empty slot.
fn slot_ref<'de, D>(deserializer: D) -> Result<Option<ItemId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ItemId>::deserialize(deserializer)?.filter(|id| *id != 0))
}
