//! Guild rank ladder.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::quality::ParseGradeError;

/// Player tier in the guild, from `G` (entry) to `S` (game clear).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum GuildRank {
    #[default]
    G,
    F,
    E,
    D,
    C,
    B,
    A,
    S,
}

impl GuildRank {
    pub const ALL: [Self; 8] = [
        Self::G,
        Self::F,
        Self::E,
        Self::D,
        Self::C,
        Self::B,
        Self::A,
        Self::S,
    ];

    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::G => 0,
            Self::F => 1,
            Self::E => 2,
            Self::D => 3,
            Self::C => 4,
            Self::B => 5,
            Self::A => 6,
            Self::S => 7,
        }
    }

    /// The rank reached by passing this rank's promotion test.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::G => Some(Self::F),
            Self::F => Some(Self::E),
            Self::E => Some(Self::D),
            Self::D => Some(Self::C),
            Self::C => Some(Self::B),
            Self::B => Some(Self::A),
            Self::A => Some(Self::S),
            Self::S => None,
        }
    }

    #[must_use]
    pub const fn is_top(self) -> bool {
        matches!(self, Self::S)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::G => "G",
            Self::F => "F",
            Self::E => "E",
            Self::D => "D",
            Self::C => "C",
            Self::B => "B",
            Self::A => "A",
            Self::S => "S",
        }
    }
}

impl fmt::Display for GuildRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GuildRank {
    type Err = ParseGradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseGradeError {
                kind: "rank",
                label: s.to_string(),
            })
    }
}
