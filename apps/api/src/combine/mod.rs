//! Outfit batches: the `jobCombine` / `jobCombineItems` mirror and batch submission.
//!
//! Flow: selection → `generate_combinations` → one pending `JobCombine` plus one
//! pending `JobCombineItem` per combination → the external worker advances the
//! rows → `results` joins them back to catalog items for display.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::catalog::CatalogStore;
use crate::models::{
    CombineId, CombinePatch, CombineStatus, Item, ItemId, JobCombine, JobCombineItem, Slot,
};
use crate::store::{
    fetch_rows, insert_rows, read_guard, update_row, write_guard, IdClock, RowStore, StoreError,
    Table,
};

pub mod generator;
pub mod handlers;

pub use generator::{generate_combinations, Combination, OutfitSelection};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Select at least one item")]
    NoSelection,

    #[error("Failed to create job: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub name: String,
    pub desc: String,
    pub prompt: String,
    #[serde(default)]
    pub selection: OutfitSelection,
}

impl BatchRequest {
    /// Checks the form fields and builds the combinations. No remote call is made.
    pub fn validate(&self) -> Result<Vec<Combination>, SubmitError> {
        for (field, value) in [
            ("name", &self.name),
            ("description", &self.desc),
            ("prompt", &self.prompt),
        ] {
            if value.trim().is_empty() {
                return Err(SubmitError::MissingField(field));
            }
        }
        let combinations = generate_combinations(&self.selection);
        if combinations.is_empty() {
            return Err(SubmitError::NoSelection);
        }
        Ok(combinations)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReceipt {
    pub combine: JobCombine,
    pub items: Vec<JobCombineItem>,
}

/// Display data for one slot of a result row.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemSummary {
    pub id: ItemId,
    pub name: String,
    pub image: Option<String>,
}

impl From<&Item> for ItemSummary {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            image: item.display_image().map(str::to_string),
        }
    }
}

/// A `JobCombineItem` with each slot resolved against the catalog.
/// A slot is `None` when it was empty or the item is no longer in the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct CombineResultRow {
    pub id: i64,
    pub head: Option<ItemSummary>,
    pub top: Option<ItemSummary>,
    pub bottom: Option<ItemSummary>,
    pub shoe: Option<ItemSummary>,
    pub bag: Option<ItemSummary>,
    pub status: CombineStatus,
    pub output: Option<String>,
}

pub struct CombineStore {
    backend: Arc<dyn RowStore>,
    ids: IdClock,
    combines: RwLock<Vec<JobCombine>>,
    items: RwLock<Vec<JobCombineItem>>,
}

impl CombineStore {
    pub fn new(backend: Arc<dyn RowStore>) -> Self {
        Self {
            backend,
            ids: IdClock::new(),
            combines: RwLock::new(Vec::new()),
            items: RwLock::new(Vec::new()),
        }
    }

    pub async fn fetch_combines(&self) -> Result<usize, StoreError> {
        let rows: Vec<JobCombine> = fetch_rows(self.backend.as_ref(), Table::JobCombine)
            .await
            .inspect_err(|e| warn!("Failed to fetch job combines: {e}"))?;
        let count = rows.len();
        *write_guard(&self.combines) = rows;
        Ok(count)
    }

    pub async fn fetch_items(&self) -> Result<usize, StoreError> {
        let rows: Vec<JobCombineItem> = fetch_rows(self.backend.as_ref(), Table::JobCombineItems)
            .await
            .inspect_err(|e| warn!("Failed to fetch job combine items: {e}"))?;
        let count = rows.len();
        *write_guard(&self.items) = rows;
        Ok(count)
    }

    /// Validates and persists a batch: the header row first, then all item rows
    /// in one insert. If the item insert fails the header row is deleted again.
    pub async fn submit(&self, request: &BatchRequest) -> Result<BatchReceipt, SubmitError> {
        let combinations = request.validate()?;

        let combine = JobCombine {
            id: self.ids.next_id(),
            name: request.name.trim().to_string(),
            desc: request.desc.trim().to_string(),
            prompt: request.prompt.trim().to_string(),
            status: CombineStatus::Pending,
        };
        let first_item_id = self.ids.reserve(combinations.len());
        let items: Vec<JobCombineItem> = combinations
            .iter()
            .zip(first_item_id..)
            .map(|(c, id)| JobCombineItem {
                id,
                job_id: combine.id,
                item_head: c.head,
                item_top: c.top,
                item_bottom: c.bottom,
                item_shoe: c.shoe,
                item_bag: c.bag,
                status: CombineStatus::Pending,
                output: None,
            })
            .collect();

        insert_rows(self.backend.as_ref(), Table::JobCombine, std::slice::from_ref(&combine))
            .await
            .inspect_err(|e| error!("Failed to create job combine '{}': {e}", combine.name))?;

        if let Err(e) = insert_rows(self.backend.as_ref(), Table::JobCombineItems, &items).await {
            error!(
                "Failed to create {} items for job combine {}: {e}",
                items.len(),
                combine.id
            );
            if let Err(cleanup) = self.backend.delete_by_id(Table::JobCombine, combine.id).await {
                warn!("Could not remove orphaned job combine {}: {cleanup}", combine.id);
            }
            return Err(e.into());
        }

        write_guard(&self.combines).push(combine.clone());
        write_guard(&self.items).extend(items.iter().cloned());
        info!(
            "Submitted job combine {} '{}' with {} combinations",
            combine.id,
            combine.name,
            items.len()
        );
        Ok(BatchReceipt { combine, items })
    }

    pub async fn update(
        &self,
        id: CombineId,
        patch: CombinePatch,
    ) -> Result<Option<JobCombine>, StoreError> {
        if self.get(id).is_none() {
            return Ok(None);
        }
        update_row(self.backend.as_ref(), Table::JobCombine, id, &patch)
            .await
            .inspect_err(|e| warn!("Failed to update job combine {id}: {e}"))?;
        let mut combines = write_guard(&self.combines);
        Ok(combines.iter_mut().find(|c| c.id == id).map(|combine| {
            combine.apply(&patch);
            combine.clone()
        }))
    }

    /// Deletes the batch together with its combination rows.
    pub async fn delete(&self, id: CombineId) -> Result<bool, StoreError> {
        self.backend
            .delete_where(Table::JobCombineItems, "jobId", id)
            .await
            .inspect_err(|e| warn!("Failed to delete items of job combine {id}: {e}"))?;
        self.backend
            .delete_by_id(Table::JobCombine, id)
            .await
            .inspect_err(|e| warn!("Failed to delete job combine {id}: {e}"))?;
        write_guard(&self.items).retain(|i| i.job_id != id);
        let mut combines = write_guard(&self.combines);
        let before = combines.len();
        combines.retain(|c| c.id != id);
        Ok(combines.len() != before)
    }

    pub fn all(&self) -> Vec<JobCombine> {
        read_guard(&self.combines).clone()
    }

    pub fn get(&self, id: CombineId) -> Option<JobCombine> {
        read_guard(&self.combines).iter().find(|c| c.id == id).cloned()
    }

    pub fn items_for(&self, job_id: CombineId) -> Vec<JobCombineItem> {
        read_guard(&self.items)
            .iter()
            .filter(|i| i.job_id == job_id)
            .cloned()
            .collect()
    }

    /// Result rows for one batch with slot ids resolved through the catalog.
    pub fn results(&self, job_id: CombineId, catalog: &CatalogStore) -> Vec<CombineResultRow> {
        let resolve = |row: &JobCombineItem, slot: Slot| {
            row.slot(slot)
                .and_then(|id| catalog.get_by_id(id))
                .map(|item| ItemSummary::from(&item))
        };
        self.items_for(job_id)
            .iter()
            .map(|row| CombineResultRow {
                id: row.id,
                head: resolve(row, Slot::Head),
                top: resolve(row, Slot::Top),
                bottom: resolve(row, Slot::Bottom),
                shoe: resolve(row, Slot::Shoe),
                bag: resolve(row, Slot::Bag),
                status: row.status,
                output: row.output.clone(),
            })
            .collect()
    }
}
