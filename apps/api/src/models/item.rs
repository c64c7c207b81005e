use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ItemId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Shirt,
    Trousers,
    Shoes,
    Hat,
    Scarf,
}

impl ItemType {
    pub const ALL: [ItemType; 5] = [
        ItemType::Shirt,
        ItemType::Trousers,
        ItemType::Shoes,
        ItemType::Hat,
        ItemType::Scarf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Shirt => "shirt",
            ItemType::Trousers => "trousers",
            ItemType::Shoes => "shoes",
            ItemType::Hat => "hat",
            ItemType::Scarf => "scarf",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown item type '{s}'"))
    }
}

/// A catalog garment as stored in the `items` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub barcode: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub price: f64,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub img: String,
    #[serde(default)]
    pub img2: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    /// Set by the exporter after at least one target accepted the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
}

impl Item {
    pub fn from_new(id: ItemId, new: NewItem) -> Self {
        Self {
            id,
            name: new.name,
            item_type: new.item_type,
            barcode: new.barcode,
            price: new.price,
            img: new.img,
            img2: new.img2,
            link: new.link,
            exported_at: None,
        }
    }

    /// The image shown for the item: `img`, falling back to `img2`.
    pub fn display_image(&self) -> Option<&str> {
        if !self.img.is_empty() {
            Some(&self.img)
        } else {
            self.img2.as_deref().filter(|s| !s.is_empty())
        }
    }

    /// Merges every field present in `patch` into this item. The id never changes.
    pub fn apply(&mut self, patch: &ItemPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(item_type) = patch.item_type {
            self.item_type = item_type;
        }
        if let Some(barcode) = &patch.barcode {
            self.barcode = barcode.clone();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(img) = &patch.img {
            self.img = img.clone();
        }
        if let Some(img2) = &patch.img2 {
            self.img2 = Some(img2.clone());
        }
        if let Some(link) = &patch.link {
            self.link = Some(link.clone());
        }
        if let Some(exported_at) = patch.exported_at {
            self.exported_at = Some(exported_at);
        }
    }
}

/// Item fields supplied on creation; the id is generated by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub barcode: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub img: String,
    #[serde(default)]
    pub img2: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        *self == ItemPatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_reads_table_row_with_nulls() {
        let row = json!({
            "id": 7,
            "name": "Linen Shirt",
            "type": "shirt",
            "barcode": null,
            "price": 39.99,
            "img": "https://cdn.example/7.jpg",
            "img2": null,
            "link": null,
            "aiPhotos": []
        });
        let item: Item = serde_json::from_value(row).unwrap();
        assert_eq!(item.id, 7);
        assert_eq!(item.item_type, ItemType::Shirt);
        assert_eq!(item.barcode, "");
        assert_eq!(item.img2, None);
        assert_eq!(item.exported_at, None);
    }

    #[test]
    fn test_item_reads_row_with_every_optional_column_null() {
        let row = json!({
            "id": 8,
            "name": null,
            "type": "pants",
            "barcode": null,
            "price": null,
            "img": null,
            "img2": null,
            "link": null
        });
        let item: Item = serde_json::from_value(row).unwrap();
        assert_eq!(item.name, "");
        assert_eq!(item.price, 0.0);
        assert_eq!(item.img, "");
        assert_eq!(item.display_image(), None);
    }

    #[test]
    fn test_item_without_type_is_rejected() {
        let row = json!({ "id": 9, "name": "Mystery", "type": null });
        assert!(serde_json::from_value::<Item>(row).is_err());
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let patch = ItemPatch {
            price: Some(10.0),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({ "price": 10.0 }));
    }

    #[test]
    fn test_apply_merges_without_touching_id() {
        let mut item = Item::from_new(
            3,
            NewItem {
                name: "Hat".into(),
                item_type: ItemType::Hat,
                barcode: "HAT1".into(),
                price: 12.5,
                img: String::new(),
                img2: Some("https://cdn.example/hat.jpg".into()),
                link: None,
            },
        );
        item.apply(&ItemPatch {
            name: Some("Wool Hat".into()),
            ..Default::default()
        });
        assert_eq!(item.id, 3);
        assert_eq!(item.name, "Wool Hat");
        assert_eq!(item.barcode, "HAT1");
        assert_eq!(item.display_image(), Some("https://cdn.example/hat.jpg"));
    }

    #[test]
    fn test_item_type_parses_case_insensitively() {
        assert_eq!("Shoes".parse::<ItemType>().unwrap(), ItemType::Shoes);
        assert!("bag".parse::<ItemType>().is_err());
    }
}
