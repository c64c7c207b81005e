//! Outfit combination generator.
//!
//! Each of the five slots contributes its selected items to a cartesian
//! product. A slot with no selection contributes a single empty value, so it
//! never multiplies the result to zero. Iteration is head outermost, bag
//! innermost, which makes the output order deterministic.

use serde::{Deserialize, Serialize};

use crate::models::{ItemId, Slot};

/// Item ids chosen per slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OutfitSelection {
    #[serde(default)]
    pub head: Vec<ItemId>,
    #[serde(default)]
    pub top: Vec<ItemId>,
    #[serde(default)]
    pub bottom: Vec<ItemId>,
    #[serde(default)]
    pub shoe: Vec<ItemId>,
    #[serde(default)]
    pub bag: Vec<ItemId>,
}

impl OutfitSelection {
    pub fn slot(&self, slot: Slot) -> &[ItemId] {
        match slot {
            Slot::Head => &self.head,
            Slot::Top => &self.top,
            Slot::Bottom => &self.bottom,
            Slot::Shoe => &self.shoe,
            Slot::Bag => &self.bag,
        }
    }

    pub fn is_empty(&self) -> bool {
        Slot::ALL.iter().all(|s| self.slot(*s).is_empty())
    }

    pub fn all_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        Slot::ALL.into_iter().flat_map(|s| self.slot(s).iter().copied())
    }

    /// Number of combinations `generate_combinations` will produce.
    pub fn combination_count(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        Slot::ALL
            .iter()
            .map(|s| dedup_ids(self.slot(*s)).len().max(1))
            .product()
    }
}

/// One outfit: at most one item per slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Combination {
    pub head: Option<ItemId>,
    pub top: Option<ItemId>,
    pub bottom: Option<ItemId>,
    pub shoe: Option<ItemId>,
    pub bag: Option<ItemId>,
}

/// Every combination of the selection, or nothing when no slot has a selection.
///
/// Repeated ids within a slot are collapsed first so no combination is emitted twice.
pub fn generate_combinations(selection: &OutfitSelection) -> Vec<Combination> {
    if selection.is_empty() {
        return Vec::new();
    }

    let [heads, tops, bottoms, shoes, bags] = Slot::ALL.map(|slot| slot_options(selection.slot(slot)));

    let mut combinations = Vec::with_capacity(selection.combination_count());
    for &head in &heads {
        for &top in &tops {
            for &bottom in &bottoms {
                for &shoe in &shoes {
                    for &bag in &bags {
                        combinations.push(Combination {
                            head,
                            top,
                            bottom,
                            shoe,
                            bag,
                        });
                    }
                }
            }
        }
    }
    combinations
}

fn slot_options(ids: &[ItemId]) -> Vec<Option<ItemId>> {
    let ids = dedup_ids(ids);
    if ids.is_empty() {
        vec![None]
    } else {
        ids.into_iter().map(Some).collect()
    }
}

/// Removes repeated ids, keeping first-seen order.
fn dedup_ids(ids: &[ItemId]) -> Vec<ItemId> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn selection(head: &[i64], top: &[i64], bottom: &[i64], shoe: &[i64], bag: &[i64]) -> OutfitSelection {
        OutfitSelection {
            head: head.to_vec(),
            top: top.to_vec(),
            bottom: bottom.to_vec(),
            shoe: shoe.to_vec(),
            bag: bag.to_vec(),
        }
    }

    #[test]
    fn test_full_selection_count_is_product() {
        let sel = selection(&[1, 2], &[3, 4, 5], &[6], &[7, 8], &[9, 10]);
        let combos = generate_combinations(&sel);
        assert_eq!(combos.len(), 2 * 3 * 1 * 2 * 2);
        assert_eq!(sel.combination_count(), combos.len());
    }

    #[test]
    fn test_one_empty_slot_contributes_factor_one() {
        let sel = selection(&[1, 2], &[3, 4], &[], &[5, 6, 7], &[8]);
        let combos = generate_combinations(&sel);
        assert_eq!(combos.len(), 2 * 2 * 3 * 1);
        assert!(combos.iter().all(|c| c.bottom.is_none()));
    }

    #[test]
    fn test_all_empty_yields_nothing() {
        assert!(generate_combinations(&OutfitSelection::default()).is_empty());
        assert_eq!(OutfitSelection::default().combination_count(), 0);
    }

    #[test]
    fn test_two_heads_one_top_one_shoe() {
        let sel = selection(&[11, 12], &[21], &[], &[41], &[]);
        let combos = generate_combinations(&sel);
        assert_eq!(
            combos,
            vec![
                Combination { head: Some(11), top: Some(21), bottom: None, shoe: Some(41), bag: None },
                Combination { head: Some(12), top: Some(21), bottom: None, shoe: Some(41), bag: None },
            ]
        );
    }

    #[test]
    fn test_order_is_head_outermost_bag_innermost() {
        let sel = selection(&[1, 2], &[], &[], &[], &[8, 9]);
        let combos = generate_combinations(&sel);
        let pairs: Vec<_> = combos.iter().map(|c| (c.head, c.bag)).collect();
        assert_eq!(
            pairs,
            vec![
                (Some(1), Some(8)),
                (Some(1), Some(9)),
                (Some(2), Some(8)),
                (Some(2), Some(9)),
            ]
        );
    }

    #[test]
    fn test_repeated_ids_do_not_duplicate_combinations() {
        let sel = selection(&[1, 1, 2], &[3, 3], &[], &[], &[]);
        let combos = generate_combinations(&sel);
        let unique: HashSet<_> = combos.iter().collect();
        assert_eq!(combos.len(), 2);
        assert_eq!(unique.len(), combos.len());
    }

    #[test]
    fn test_single_bag_selection() {
        let sel = selection(&[], &[], &[], &[], &[5]);
        let combos = generate_combinations(&sel);
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].bag, Some(5));
        assert_eq!(combos[0].head, None);
    }
}
