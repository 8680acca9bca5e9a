//! Gathered materials.
use serde::{Deserialize, Serialize};

use crate::inventory::InstanceId;
use crate::quality::Quality;

/// Master definition of a material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialDef {
    pub id: String,
    pub name: String,
    pub category: String,
    pub base_price: i64,
}

/// A stack of identical materials (same id and quality).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialInstance {
    pub id: InstanceId,
    pub material_id: String,
    pub quality: Quality,
    pub quantity: u32,
}

impl MaterialInstance {
    #[must_use]
    pub fn stacks_with(&self, material_id: &str, quality: Quality) -> bool {
        self.material_id == material_id && self.quality == quality
    }
}
