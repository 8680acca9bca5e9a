//! Crafted items.
use serde::{Deserialize, Serialize};

use crate::inventory::InstanceId;
use crate::numbers::{floor_f64_to_i64, i64_to_f64};
use crate::quality::{Quality, QualityTableId};

/// Master definition of a craftable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: String,
    pub name: String,
    pub category: String,
    pub base_price: i64,
}

/// A crafted item held in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInstance {
    pub id: InstanceId,
    pub item_id: String,
    pub quality: Quality,
}

impl ItemInstance {
    /// Market value: `floor(base_price * price multiplier)`.
    #[must_use]
    pub fn price(&self, def: &ItemDef) -> i64 {
        floor_f64_to_i64(i64_to_f64(def.base_price) * QualityTableId::Price.multiplier(self.quality))
    }
}

/// "At least `quantity` of `item_id` at `min_quality` or better."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequirement {
    pub item_id: String,
    pub min_quality: Quality,
    pub quantity: u32,
}

impl ItemRequirement {
    #[must_use]
    pub fn accepts(&self, item: &ItemInstance) -> bool {
        item.item_id == self.item_id && item.quality >= self.min_quality
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn potion_def() -> ItemDef {
        ItemDef {
            id: "potion".to_string(),
            name: "Potion".to_string(),
            category: "medicine".to_string(),
            base_price: 45,
        }
    }

    #[test]
    fn price_scales_with_quality_and_floors() {
        let def = potion_def();
        let mut item = ItemInstance {
            id: InstanceId(1),
            item_id: "potion".to_string(),
            quality: Quality::D,
        };
        assert_eq!(item.price(&def), 22);
        item.quality = Quality::S;
        assert_eq!(item.price(&def), 135);
    }

    #[test]
    fn requirement_checks_id_and_minimum_quality() {
        let req = ItemRequirement {
            item_id: "potion".to_string(),
            min_quality: Quality::B,
            quantity: 1,
        };
        let mut item = ItemInstance {
            id: InstanceId(2),
            item_id: "potion".to_string(),
            quality: Quality::C,
        };
        assert!(!req.accepts(&item));
        item.quality = Quality::A;
        assert!(req.accepts(&item));
        item.item_id = "bomb".to_string();
        assert!(!req.accepts(&item));
    }
}
