//! Deterministic random streams split by game domain.
//!
//! Each draw derives a fresh ChaCha20 generator from
//! HMAC-SHA256(seed, domain tag || cursor). Cursors are persisted with the
//! game, so a reloaded save continues the exact same sequence.
use hmac::{Hmac, Mac};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RngDomain {
    Deck,
    Draft,
    Board,
}

impl RngDomain {
    const fn tag(self) -> &'static [u8] {
        match self {
            Self::Deck => b"deck",
            Self::Draft => b"draft",
            Self::Board => b"board",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RngCursors {
    #[serde(default)]
    pub deck: u64,
    #[serde(default)]
    pub draft: u64,
    #[serde(default)]
    pub board: u64,
}

impl RngCursors {
    /// Generator for the next draw in `domain`; advances that domain's cursor.
    pub fn next_rng(&mut self, seed: u64, domain: RngDomain) -> ChaCha20Rng {
        let cursor = match domain {
            RngDomain::Deck => &mut self.deck,
            RngDomain::Draft => &mut self.draft,
            RngDomain::Board => &mut self.board,
        };
        let current = *cursor;
        *cursor = cursor.saturating_add(1);
        ChaCha20Rng::seed_from_u64(derive_stream_seed(seed, domain.tag(), current))
    }
}

/// Index of a weighted pick, or `None` when every weight is zero.
pub(crate) fn choose_weighted<R: Rng>(weights: &[u32], rng: &mut R) -> Option<usize> {
    let total: u32 = weights.iter().sum();
    if total == 0 {
        return None;
    }
    let roll = rng.gen_range(0..total);
    let mut current = 0;
    for (idx, weight) in weights.iter().enumerate() {
        current += *weight;
        if roll < current {
            return Some(idx);
        }
    }
    None
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8], cursor: u64) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    mac.update(&cursor.to_le_bytes());
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}
