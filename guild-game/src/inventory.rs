//! Material stacks and crafted items held by the player.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::item::{ItemInstance, ItemRequirement};
use crate::material::MaterialInstance;
use crate::quality::Quality;

/// Run-unique id for material stacks and items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InventoryState {
    #[serde(default)]
    pub materials: Vec<MaterialInstance>,
    #[serde(default)]
    pub items: Vec<ItemInstance>,
    #[serde(default)]
    pub next_instance_id: u64,
}

impl InventoryState {
    fn alloc_id(&mut self) -> InstanceId {
        self.next_instance_id = self.next_instance_id.saturating_add(1);
        InstanceId(self.next_instance_id)
    }

    /// Total material units across all stacks.
    #[must_use]
    pub fn material_units(&self) -> u32 {
        self.materials.iter().map(|m| m.quantity).sum()
    }

    /// Add up to `quantity` units, merging into an existing stack when one
    /// matches. Returns the number of units accepted under `capacity`.
    pub fn add_material(
        &mut self,
        material_id: &str,
        quality: Quality,
        quantity: u32,
        capacity: u32,
    ) -> u32 {
        let room = capacity.saturating_sub(self.material_units());
        let accepted = quantity.min(room);
        if accepted == 0 {
            return 0;
        }
        if let Some(stack) = self
            .materials
            .iter_mut()
            .find(|m| m.stacks_with(material_id, quality))
        {
            stack.quantity += accepted;
        } else {
            let id = self.alloc_id();
            self.materials.push(MaterialInstance {
                id,
                material_id: material_id.to_string(),
                quality,
                quantity: accepted,
            });
        }
        accepted
    }

    #[must_use]
    pub fn material(&self, id: InstanceId) -> Option<&MaterialInstance> {
        self.materials.iter().find(|m| m.id == id)
    }

    /// Remove `quantity` units from a stack, dropping the stack when empty.
    /// Returns false (and changes nothing) if the stack is missing or short.
    pub fn remove_material(&mut self, id: InstanceId, quantity: u32) -> bool {
        let Some(pos) = self.materials.iter().position(|m| m.id == id) else {
            return false;
        };
        let stack = &mut self.materials[pos];
        if stack.quantity < quantity {
            return false;
        }
        stack.quantity -= quantity;
        if stack.quantity == 0 {
            self.materials.remove(pos);
        }
        true
    }

    /// Add a crafted item and return its id.
    pub fn add_item(&mut self, item_id: &str, quality: Quality) -> InstanceId {
        let id = self.alloc_id();
        self.items.push(ItemInstance {
            id,
            item_id: item_id.to_string(),
            quality,
        });
        id
    }

    #[must_use]
    pub fn item(&self, id: InstanceId) -> Option<&ItemInstance> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn take_item(&mut self, id: InstanceId) -> Option<ItemInstance> {
        let pos = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(pos))
    }

    /// Ids of the lowest-quality items that satisfy `req`, or `None` when the
    /// inventory cannot cover the full quantity.
    #[must_use]
    pub fn select_for_requirement(&self, req: &ItemRequirement) -> Option<Vec<InstanceId>> {
        let mut candidates: Vec<&ItemInstance> =
            self.items.iter().filter(|i| req.accepts(i)).collect();
        let needed = usize::try_from(req.quantity).unwrap_or(usize::MAX);
        if candidates.len() < needed {
            return None;
        }
        candidates.sort_by_key(|i| (i.quality, i.id));
        Some(candidates.into_iter().take(needed).map(|i| i.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materials_stack_by_id_and_quality() {
        let mut inv = InventoryState::default();
        assert_eq!(inv.add_material("herb", Quality::C, 2, 10), 2);
        assert_eq!(inv.add_material("herb", Quality::C, 1, 10), 1);
        assert_eq!(inv.add_material("herb", Quality::B, 1, 10), 1);
        assert_eq!(inv.materials.len(), 2);
        assert_eq!(inv.material_units(), 4);
    }

    #[test]
    fn capacity_limits_accepted_units() {
        let mut inv = InventoryState::default();
        assert_eq!(inv.add_material("ore", Quality::D, 8, 10), 8);
        assert_eq!(inv.add_material("ore", Quality::D, 8, 10), 2);
        assert_eq!(inv.add_material("ore", Quality::D, 1, 10), 0);
        assert_eq!(inv.material_units(), 10);
    }

    #[test]
    fn remove_material_is_all_or_nothing() {
        let mut inv = InventoryState::default();
        inv.add_material("herb", Quality::D, 3, 10);
        let id = inv.materials[0].id;
        assert!(!inv.remove_material(id, 4));
        assert_eq!(inv.material_units(), 3);
        assert!(inv.remove_material(id, 3));
        assert!(inv.materials.is_empty());
    }

    #[test]
    fn requirement_selection_prefers_lowest_quality() {
        let mut inv = InventoryState::default();
        let high = inv.add_item("potion", Quality::A);
        let low = inv.add_item("potion", Quality::C);
        inv.add_item("bomb", Quality::S);
        let req = ItemRequirement {
            item_id: "potion".to_string(),
            min_quality: Quality::C,
            quantity: 1,
        };
        assert_eq!(inv.select_for_requirement(&req), Some(vec![low]));
        let two = ItemRequirement { quantity: 2, ..req.clone() };
        assert_eq!(inv.select_for_requirement(&two), Some(vec![low, high]));
        let three = ItemRequirement { quantity: 3, ..req };
        assert_eq!(inv.select_for_requirement(&three), None);
    }

    #[test]
    fn ids_are_unique_across_materials_and_items() {
        let mut inv = InventoryState::default();
        inv.add_material("herb", Quality::D, 1, 10);
        let item = inv.add_item("potion", Quality::D);
        assert_ne!(inv.materials[0].id, item);
        assert_eq!(item.to_string(), "#2");
    }
}
