//! Card definitions.
use serde::{Deserialize, Serialize};

/// A card as described in master data. Decks hold card ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDef {
    pub id: String,
    pub name: String,
    pub kind: CardKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardKind {
    /// Opens a draft at a gathering location.
    Gathering {
        location: String,
        ap_cost: u32,
        rounds: u32,
    },
    /// Enables crafting one recipe during the alchemy phase.
    Recipe { recipe: String },
    /// One-shot effect, playable in any phase at no AP cost.
    Enhancement { effect: EnhancementEffect },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementEffect {
    /// Restore action points, never above the phase maximum.
    RestoreAp(u32),
    /// Raise the quality of the next crafted item by this many grades.
    QualityBoost(u32),
    /// Present extra options in every draft round this phase.
    DraftBonus(u32),
}

impl CardDef {
    #[must_use]
    pub const fn is_gathering(&self) -> bool {
        matches!(self.kind, CardKind::Gathering { .. })
    }

    #[must_use]
    pub const fn is_recipe(&self) -> bool {
        matches!(self.kind, CardKind::Recipe { .. })
    }

    /// Recipe id if this is a recipe card.
    #[must_use]
    pub fn recipe_id(&self) -> Option<&str> {
        match &self.kind {
            CardKind::Recipe { recipe } => Some(recipe),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_kinds_deserialize_from_tagged_json() {
        let card: CardDef = serde_json::from_str(
            r#"{"id":"g","name":"Trip","kind":{"type":"gathering","location":"meadow","ap_cost":1,"rounds":3}}"#,
        )
        .unwrap();
        assert!(card.is_gathering());
        assert!(card.recipe_id().is_none());

        let tonic: CardDef = serde_json::from_str(
            r#"{"id":"t","name":"Tonic","kind":{"type":"enhancement","effect":{"restore_ap":2}}}"#,
        )
        .unwrap();
        assert_eq!(
            tonic.kind,
            CardKind::Enhancement {
                effect: EnhancementEffect::RestoreAp(2)
            }
        );
    }
}
