//! Item and material quality grades plus the multiplier tables keyed on them.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Quality grade, ordered from lowest (`D`) to highest (`S`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Quality {
    #[default]
    D,
    C,
    B,
    A,
    S,
}

/// Raised when a grade label cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} label `{label}`")]
pub struct ParseGradeError {
    pub kind: &'static str,
    pub label: String,
}

impl Quality {
    pub const ALL: [Self; 5] = [Self::D, Self::C, Self::B, Self::A, Self::S];

    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::D => 0,
            Self::C => 1,
            Self::B => 2,
            Self::A => 3,
            Self::S => 4,
        }
    }

    /// Map an ordinal back to a grade, clamping anything outside `[D, S]`.
    #[must_use]
    pub const fn from_ordinal(value: i32) -> Self {
        match value {
            i32::MIN..=0 => Self::D,
            1 => Self::C,
            2 => Self::B,
            3 => Self::A,
            _ => Self::S,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::D => "D",
            Self::C => "C",
            Self::B => "B",
            Self::A => "A",
            Self::S => "S",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = ParseGradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseGradeError {
                kind: "quality",
                label: s.to_string(),
            })
    }
}

/// Price multipliers used by item valuation and quest board previews.
pub const PRICE_MULTIPLIERS: [f64; 5] = [0.5, 1.0, 1.5, 2.0, 3.0];

/// Bonus multipliers applied to delivery rewards. The lowest grade takes the
/// 0.25 slot.
pub const DELIVERY_MULTIPLIERS: [f64; 5] = [0.25, 0.5, 1.0, 1.5, 2.0];

/// Selects one of the two quality multiplier tables.
///
/// The tables disagree on purpose; the reward calculator is configured with
/// one of them rather than reconciling the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QualityTableId {
    Price,
    #[default]
    Delivery,
}

impl QualityTableId {
    #[must_use]
    pub const fn table(self) -> &'static [f64; 5] {
        match self {
            Self::Price => &PRICE_MULTIPLIERS,
            Self::Delivery => &DELIVERY_MULTIPLIERS,
        }
    }

    #[must_use]
    pub const fn multiplier(self, quality: Quality) -> f64 {
        self.table()[quality.ordinal() as usize]
    }
}
