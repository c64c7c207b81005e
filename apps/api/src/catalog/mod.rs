//! Catalog store: the in-memory mirror of the `items` table.
//!
//! Remote writes run first; the local list only changes once the remote call
//! succeeded. A failed fetch leaves the previous list untouched.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::{info, warn};

use crate::models::{Item, ItemId, ItemPatch, ItemType, NewItem};
use crate::store::{
    fetch_rows, insert_rows, read_guard, update_row, write_guard, IdClock, RowStore, StoreError,
    Table,
};

pub mod handlers;

pub struct CatalogStore {
    backend: Arc<dyn RowStore>,
    ids: IdClock,
    items: RwLock<Vec<Item>>,
    selected: RwLock<Option<ItemId>>,
}

impl CatalogStore {
    pub fn new(backend: Arc<dyn RowStore>) -> Self {
        Self {
            backend,
            ids: IdClock::new(),
            items: RwLock::new(Vec::new()),
            selected: RwLock::new(None),
        }
    }

    /// Replaces the local list with every row of the `items` table.
    pub async fn fetch_all(&self) -> Result<usize, StoreError> {
        let rows: Vec<Item> = fetch_rows(self.backend.as_ref(), Table::Items)
            .await
            .inspect_err(|e| warn!("Failed to fetch items: {e}"))?;
        let count = rows.len();
        *write_guard(&self.items) = rows;
        info!("Loaded {count} catalog items");
        Ok(count)
    }

    pub async fn add(&self, new_item: NewItem) -> Result<Item, StoreError> {
        let item = Item::from_new(self.ids.next_id(), new_item);
        insert_rows(self.backend.as_ref(), Table::Items, std::slice::from_ref(&item))
            .await
            .inspect_err(|e| warn!("Failed to add item {}: {e}", item.id))?;
        write_guard(&self.items).push(item.clone());
        info!("Added item {} ({})", item.id, item.item_type);
        Ok(item)
    }

    /// Merges `patch` into the item. Returns `Ok(None)` without any remote call
    /// when the id is not in the local list.
    pub async fn update(&self, id: ItemId, patch: ItemPatch) -> Result<Option<Item>, StoreError> {
        if self.get_by_id(id).is_none() {
            return Ok(None);
        }
        update_row(self.backend.as_ref(), Table::Items, id, &patch)
            .await
            .inspect_err(|e| warn!("Failed to update item {id}: {e}"))?;
        let mut items = write_guard(&self.items);
        Ok(items.iter_mut().find(|i| i.id == id).map(|item| {
            item.apply(&patch);
            item.clone()
        }))
    }

    /// Removes the item and clears the selection if it pointed at it.
    /// Returns `Ok(false)` without any remote call when the id is not in the
    /// local list.
    pub async fn delete(&self, id: ItemId) -> Result<bool, StoreError> {
        if self.get_by_id(id).is_none() {
            return Ok(false);
        }
        self.backend
            .delete_by_id(Table::Items, id)
            .await
            .inspect_err(|e| warn!("Failed to delete item {id}: {e}"))?;
        let removed = {
            let mut items = write_guard(&self.items);
            let before = items.len();
            items.retain(|i| i.id != id);
            items.len() != before
        };
        let mut selected = write_guard(&self.selected);
        if *selected == Some(id) {
            *selected = None;
        }
        Ok(removed)
    }

    /// Stamps the export time on an item.
    pub async fn mark_exported(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        self.update(
            id,
            ItemPatch {
                exported_at: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await
    }

    pub fn select(&self, id: Option<ItemId>) {
        *write_guard(&self.selected) = id;
    }

    pub fn selected(&self) -> Option<Item> {
        let id = (*read_guard(&self.selected))?;
        self.get_by_id(id)
    }

    pub fn all(&self) -> Vec<Item> {
        read_guard(&self.items).clone()
    }

    pub fn get_by_id(&self, id: ItemId) -> Option<Item> {
        read_guard(&self.items).iter().find(|i| i.id == id).cloned()
    }

    pub fn get_by_type(&self, item_type: ItemType) -> Vec<Item> {
        read_guard(&self.items)
            .iter()
            .filter(|i| i.item_type == item_type)
            .cloned()
            .collect()
    }

    /// Ids from `ids` that are not in the local catalog.
    pub fn unknown_ids(&self, ids: impl IntoIterator<Item = ItemId>) -> Vec<ItemId> {
        let items = read_guard(&self.items);
        ids.into_iter()
            .filter(|id| !items.iter().any(|i| i.id == *id))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::MemoryRowStore;
    use serde_json::json;

    pub(crate) fn new_item(name: &str, item_type: ItemType) -> NewItem {
        NewItem {
            name: name.to_string(),
            item_type,
            barcode: format!("BC-{name}"),
            price: 19.99,
            img: format!("https://cdn.example/{name}.jpg"),
            img2: None,
            link: None,
        }
    }

    fn catalog() -> (Arc<MemoryRowStore>, CatalogStore) {
        let backend = Arc::new(MemoryRowStore::new());
        let catalog = CatalogStore::new(backend.clone());
        (backend, catalog)
    }

    #[tokio::test]
    async fn test_add_then_get_round_trips() {
        let (backend, catalog) = catalog();
        let input = new_item("shirt-1", ItemType::Shirt);
        let added = catalog.add(input.clone()).await.unwrap();

        let fetched = catalog.get_by_id(added.id).unwrap();
        assert_eq!(fetched, Item::from_new(added.id, input));
        assert_eq!(backend.rows(Table::Items).len(), 1);
    }

    #[tokio::test]
    async fn test_generated_ids_are_unique() {
        let (_, catalog) = catalog();
        let a = catalog.add(new_item("a", ItemType::Hat)).await.unwrap();
        let b = catalog.add(new_item("b", ItemType::Hat)).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_items() {
        let (backend, catalog) = catalog();
        backend.seed(
            Table::Items,
            vec![json!({ "id": 1, "name": "Scarf", "type": "scarf", "price": 9.5, "img": "" })],
        );
        assert_eq!(catalog.fetch_all().await.unwrap(), 1);

        backend.set_fail_reads(true);
        assert!(catalog.fetch_all().await.is_err());
        assert_eq!(catalog.all().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_add_leaves_local_list_unchanged() {
        let (backend, catalog) = catalog();
        backend.set_fail_writes(true);
        assert!(catalog.add(new_item("x", ItemType::Shoes)).await.is_err());
        assert!(catalog.all().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_silent_noop() {
        let (backend, catalog) = catalog();
        let result = catalog
            .update(
                404,
                ItemPatch {
                    name: Some("ghost".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test]
    async fn test_update_merges_locally_and_remotely() {
        let (backend, catalog) = catalog();
        let item = catalog.add(new_item("t", ItemType::Trousers)).await.unwrap();
        let updated = catalog
            .update(
                item.id,
                ItemPatch {
                    price: Some(49.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.price, 49.0);
        assert_eq!(updated.name, "t");
        assert_eq!(backend.rows(Table::Items)[0]["price"], 49.0);
    }

    #[tokio::test]
    async fn test_delete_clears_matching_selection() {
        let (_, catalog) = catalog();
        let keep = catalog.add(new_item("keep", ItemType::Hat)).await.unwrap();
        let gone = catalog.add(new_item("gone", ItemType::Hat)).await.unwrap();

        catalog.select(Some(keep.id));
        assert!(catalog.delete(gone.id).await.unwrap());
        assert_eq!(catalog.selected().map(|i| i.id), Some(keep.id));

        assert!(catalog.delete(keep.id).await.unwrap());
        assert!(catalog.selected().is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_id_skips_remote_call() {
        let (backend, catalog) = catalog();
        catalog.add(new_item("stay", ItemType::Hat)).await.unwrap();
        let writes = backend.write_count();

        assert!(!catalog.delete(404).await.unwrap());
        assert_eq!(backend.write_count(), writes);
        assert_eq!(catalog.all().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_keeps_rows_with_null_columns() {
        let (backend, catalog) = catalog();
        backend.seed(
            Table::Items,
            vec![
                json!({ "id": 1, "name": "Tee", "type": "shirt", "barcode": null, "price": null, "img": null }),
                json!({ "id": 2, "name": null, "type": "hat", "barcode": "H2", "price": 5.0, "img": "" }),
            ],
        );
        assert_eq!(catalog.fetch_all().await.unwrap(), 2);
        assert_eq!(catalog.get_by_id(1).unwrap().barcode, "");
        assert_eq!(catalog.get_by_id(2).unwrap().name, "");
    }

    #[tokio::test]
    async fn test_get_by_type_filters() {
        let (_, catalog) = catalog();
        catalog.add(new_item("s1", ItemType::Shirt)).await.unwrap();
        catalog.add(new_item("h1", ItemType::Hat)).await.unwrap();
        catalog.add(new_item("s2", ItemType::Shirt)).await.unwrap();

        let shirts = catalog.get_by_type(ItemType::Shirt);
        assert_eq!(shirts.len(), 2);
        assert!(catalog.get_by_type(ItemType::Scarf).is_empty());
        assert!(catalog.get_by_id(1).is_none());
    }

    #[tokio::test]
    async fn test_mark_exported_stamps_timestamp() {
        let (_, catalog) = catalog();
        let item = catalog.add(new_item("e", ItemType::Shoes)).await.unwrap();
        let stamped = catalog.mark_exported(item.id).await.unwrap().unwrap();
        assert!(stamped.exported_at.is_some());
    }
}
