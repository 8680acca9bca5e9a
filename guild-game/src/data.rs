//! Master data: the static content a run is played against.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;
use thiserror::Error;

use crate::card::{CardDef, CardKind};
use crate::item::{ItemDef, ItemRequirement};
use crate::material::MaterialDef;
use crate::quality::Quality;
use crate::quest::{QuestCondition, QuestKind, QuestTarget};
use crate::rank::GuildRank;

const BUILTIN_MASTER_JSON: &str = include_str!("../data/master.json");

/// Errors raised while loading or validating master data.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("master data is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate {kind} id `{id}`")]
    Duplicate { kind: &'static str, id: String },
    #[error("{owner} references unknown {kind} `{id}`")]
    UnknownReference {
        owner: String,
        kind: &'static str,
        id: String,
    },
    #[error("no promotion rule for rank {0}")]
    MissingRankRule(GuildRank),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{owner}: {reason}")]
    Invalid { owner: String, reason: &'static str },
}

/// Picks which materials may fill a recipe slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialSelector {
    Material(String),
    Category(String),
}

impl MaterialSelector {
    #[must_use]
    pub fn accepts(&self, material: &MaterialDef) -> bool {
        match self {
            Self::Material(id) => &material.id == id,
            Self::Category(category) => &material.category == category,
        }
    }

    #[must_use]
    pub const fn is_specific(&self) -> bool {
        matches!(self, Self::Material(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub selector: MaterialSelector,
    pub quantity: u32,
}

/// Ingredient lists are short; keep them inline.
pub type IngredientList = SmallVec<[Ingredient; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDef {
    pub id: String,
    pub item_id: String,
    pub ap_cost: u32,
    pub ingredients: IngredientList,
}

impl RecipeDef {
    #[must_use]
    pub fn total_units(&self) -> u32 {
        self.ingredients.iter().map(|i| i.quantity).sum()
    }
}

/// One entry of a gathering location's weighted drop table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropEntry {
    pub material_id: String,
    pub weight: u32,
    pub min_quality: Quality,
    pub max_quality: Quality,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDef {
    pub id: String,
    pub name: String,
    pub drops: Vec<DropEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientDef {
    pub id: String,
    pub name: String,
    pub gold_multiplier: f64,
    pub contribution_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestTemplate {
    pub id: String,
    pub client_id: String,
    pub kind: QuestKind,
    pub condition: QuestCondition,
    pub gold: i64,
    pub contribution: i64,
    pub deadline_days: i32,
    pub min_rank: GuildRank,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionTestRule {
    pub days: i32,
    pub gold_reward: i64,
    pub requirements: Vec<ItemRequirement>,
}

/// Gate and countdown for one rank. `S` has no rule; it is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankRule {
    pub rank: GuildRank,
    pub gauge_required: i64,
    pub day_limit: i32,
    pub test: PromotionTestRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactEffect {
    MaxApBonus(u32),
    /// Percentage off shop prices.
    ShopDiscount(u32),
    HandSizeBonus(u32),
    DraftBonus(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDef {
    pub id: String,
    pub name: String,
    pub effect: ArtifactEffect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopGoods {
    Card(String),
    Artifact(String),
    Material { material_id: String, quality: Quality },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopEntry {
    pub id: String,
    pub goods: ShopGoods,
    pub price: i64,
    pub min_rank: GuildRank,
    /// `None` means unlimited.
    #[serde(default)]
    pub stock: Option<u32>,
}

/// Complete static content for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterData {
    pub materials: Vec<MaterialDef>,
    pub items: Vec<ItemDef>,
    pub recipes: Vec<RecipeDef>,
    pub locations: Vec<LocationDef>,
    pub cards: Vec<CardDef>,
    pub starting_deck: Vec<String>,
    pub clients: Vec<ClientDef>,
    pub quest_templates: Vec<QuestTemplate>,
    pub ranks: Vec<RankRule>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactDef>,
    #[serde(default)]
    pub shop: Vec<ShopEntry>,
}

impl MasterData {
    /// Content bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled JSON fails to parse or validate.
    pub fn builtin() -> Result<Self, DataError> {
        Self::from_json(BUILTIN_MASTER_JSON)
    }

    /// Parse and validate master data.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has dangling references.
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let data: Self = serde_json::from_str(json)?;
        data.validate()?;
        Ok(data)
    }

    #[must_use]
    pub fn material(&self, id: &str) -> Option<&MaterialDef> {
        self.materials.iter().find(|m| m.id == id)
    }

    #[must_use]
    pub fn item(&self, id: &str) -> Option<&ItemDef> {
        self.items.iter().find(|i| i.id == id)
    }

    #[must_use]
    pub fn recipe(&self, id: &str) -> Option<&RecipeDef> {
        self.recipes.iter().find(|r| r.id == id)
    }

    /// Recipe that produces `item_id`, if any.
    #[must_use]
    pub fn recipe_for_item(&self, item_id: &str) -> Option<&RecipeDef> {
        self.recipes.iter().find(|r| r.item_id == item_id)
    }

    #[must_use]
    pub fn location(&self, id: &str) -> Option<&LocationDef> {
        self.locations.iter().find(|l| l.id == id)
    }

    #[must_use]
    pub fn card(&self, id: &str) -> Option<&CardDef> {
        self.cards.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn client(&self, id: &str) -> Option<&ClientDef> {
        self.clients.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn quest_template(&self, id: &str) -> Option<&QuestTemplate> {
        self.quest_templates.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn rank_rule(&self, rank: GuildRank) -> Option<&RankRule> {
        self.ranks.iter().find(|r| r.rank == rank)
    }

    #[must_use]
    pub fn artifact(&self, id: &str) -> Option<&ArtifactDef> {
        self.artifacts.iter().find(|a| a.id == id)
    }

    #[must_use]
    pub fn shop_entry(&self, id: &str) -> Option<&ShopEntry> {
        self.shop.iter().find(|s| s.id == id)
    }

    /// Check ids are unique and every cross reference resolves.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), DataError> {
        unique("material", self.materials.iter().map(|m| m.id.as_str()))?;
        unique("item", self.items.iter().map(|i| i.id.as_str()))?;
        unique("recipe", self.recipes.iter().map(|r| r.id.as_str()))?;
        unique("location", self.locations.iter().map(|l| l.id.as_str()))?;
        unique("card", self.cards.iter().map(|c| c.id.as_str()))?;
        unique("client", self.clients.iter().map(|c| c.id.as_str()))?;
        unique("quest template", self.quest_templates.iter().map(|t| t.id.as_str()))?;
        unique("artifact", self.artifacts.iter().map(|a| a.id.as_str()))?;
        unique("shop entry", self.shop.iter().map(|s| s.id.as_str()))?;

        if self.starting_deck.is_empty() {
            return Err(DataError::Empty("starting_deck"));
        }
        if self.quest_templates.is_empty() {
            return Err(DataError::Empty("quest_templates"));
        }

        self.validate_recipes()?;
        self.validate_locations()?;
        self.validate_cards()?;
        for card in &self.starting_deck {
            self.require(self.card(card).is_some(), "starting_deck", "card", card)?;
        }
        self.validate_quests()?;
        self.validate_ranks()?;
        self.validate_shop()
    }

    fn require(&self, ok: bool, owner: &str, kind: &'static str, id: &str) -> Result<(), DataError> {
        if ok {
            Ok(())
        } else {
            Err(DataError::UnknownReference {
                owner: owner.to_string(),
                kind,
                id: id.to_string(),
            })
        }
    }

    fn validate_recipes(&self) -> Result<(), DataError> {
        for recipe in &self.recipes {
            self.require(self.item(&recipe.item_id).is_some(), &recipe.id, "item", &recipe.item_id)?;
            if recipe.ingredients.is_empty() || recipe.ingredients.iter().any(|i| i.quantity == 0) {
                return Err(DataError::Invalid {
                    owner: recipe.id.clone(),
                    reason: "recipe needs ingredients with positive quantities",
                });
            }
            for ingredient in &recipe.ingredients {
                match &ingredient.selector {
                    MaterialSelector::Material(id) => {
                        self.require(self.material(id).is_some(), &recipe.id, "material", id)?;
                    }
                    MaterialSelector::Category(category) => {
                        let known = self.materials.iter().any(|m| &m.category == category);
                        self.require(known, &recipe.id, "material category", category)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_locations(&self) -> Result<(), DataError> {
        for location in &self.locations {
            if location.drops.iter().all(|d| d.weight == 0) {
                return Err(DataError::Invalid {
                    owner: location.id.clone(),
                    reason: "drop table needs at least one positive weight",
                });
            }
            for drop in &location.drops {
                self.require(
                    self.material(&drop.material_id).is_some(),
                    &location.id,
                    "material",
                    &drop.material_id,
                )?;
                if drop.min_quality > drop.max_quality {
                    return Err(DataError::Invalid {
                        owner: location.id.clone(),
                        reason: "drop min_quality exceeds max_quality",
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_cards(&self) -> Result<(), DataError> {
        for card in &self.cards {
            match &card.kind {
                CardKind::Gathering {
                    location, rounds, ..
                } => {
                    self.require(self.location(location).is_some(), &card.id, "location", location)?;
                    if *rounds == 0 {
                        return Err(DataError::Invalid {
                            owner: card.id.clone(),
                            reason: "gathering card needs at least one round",
                        });
                    }
                }
                CardKind::Recipe { recipe } => {
                    self.require(self.recipe(recipe).is_some(), &card.id, "recipe", recipe)?;
                }
                CardKind::Enhancement { .. } => {}
            }
        }
        Ok(())
    }

    fn validate_quests(&self) -> Result<(), DataError> {
        for template in &self.quest_templates {
            self.require(
                self.client(&template.client_id).is_some(),
                &template.id,
                "client",
                &template.client_id,
            )?;
            match &template.condition.target {
                QuestTarget::Item(id) => {
                    self.require(self.item(id).is_some(), &template.id, "item", id)?;
                }
                QuestTarget::Category(category) => {
                    let known = self.items.iter().any(|i| &i.category == category);
                    self.require(known, &template.id, "item category", category)?;
                }
                QuestTarget::AnyItem => {}
            }
            if template.deadline_days <= 0 {
                return Err(DataError::Invalid {
                    owner: template.id.clone(),
                    reason: "deadline must be positive",
                });
            }
        }
        Ok(())
    }

    fn validate_ranks(&self) -> Result<(), DataError> {
        for rank in GuildRank::ALL.into_iter().filter(|r| !r.is_top()) {
            let rule = self.rank_rule(rank).ok_or(DataError::MissingRankRule(rank))?;
            if rule.day_limit <= 0 || rule.test.days <= 0 {
                return Err(DataError::Invalid {
                    owner: format!("rank {rank}"),
                    reason: "day limits must be positive",
                });
            }
            for req in &rule.test.requirements {
                self.require(self.item(&req.item_id).is_some(), rank.as_str(), "item", &req.item_id)?;
            }
        }
        Ok(())
    }

    fn validate_shop(&self) -> Result<(), DataError> {
        for entry in &self.shop {
            let (kind, id, ok) = match &entry.goods {
                ShopGoods::Card(id) => ("card", id, self.card(id).is_some()),
                ShopGoods::Artifact(id) => ("artifact", id, self.artifact(id).is_some()),
                ShopGoods::Material { material_id, .. } => {
                    ("material", material_id, self.material(material_id).is_some())
                }
            };
            self.require(ok, &entry.id, kind, id)?;
            if entry.price < 0 {
                return Err(DataError::Invalid {
                    owner: entry.id.clone(),
                    reason: "price must not be negative",
                });
            }
        }
        Ok(())
    }
}

fn unique<'a>(kind: &'static str, ids: impl Iterator<Item = &'a str>) -> Result<(), DataError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(DataError::Duplicate {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}
