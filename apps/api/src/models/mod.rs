pub mod combine;
pub mod item;
pub mod job;
pub mod prompt;

use serde::{Deserialize, Deserializer};

pub use combine::{CombineId, CombinePatch, CombineStatus, JobCombine, JobCombineItem, Slot};
pub use item::{Item, ItemId, ItemPatch, ItemType, NewItem};
pub use job::{Job, JobId, JobPatch, JobType, NewJob};
pub use prompt::ItemTypePrompt;

/// Reads a nullable column into a plain field: both a missing key (with
/// `#[serde(default)]`) and an explicit `null` become `T::default()`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
