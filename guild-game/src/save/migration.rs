//! Save format migrations.
//!
//! Migrations form a linear chain of JSON transforms, each lifting a save
//! exactly one version. Saves newer than [`CURRENT_SAVE_VERSION`] or with an
//! unknown version are rejected rather than guessed at.
use log::warn;
use serde_json::{Map, Value, json};
use thiserror::Error;

pub const CURRENT_SAVE_VERSION: &str = "1.2.0";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    #[error("save has no version")]
    MissingVersion,
    #[error("unsupported save version `{0}`")]
    UnsupportedVersion(String),
    #[error("save is missing the `{0}` object")]
    MissingSection(&'static str),
}

struct Migration {
    from: &'static str,
    to: &'static str,
    apply: fn(&mut Map<String, Value>) -> Result<(), MigrationError>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        from: "1.0.0",
        to: "1.1.0",
        apply: add_overflow_and_board,
    },
    Migration {
        from: "1.1.0",
        to: CURRENT_SAVE_VERSION,
        apply: add_rng_and_combo,
    },
];

fn section<'a>(
    root: &'a mut Map<String, Value>,
    name: &'static str,
) -> Result<&'a mut Map<String, Value>, MigrationError> {
    root.get_mut(name)
        .and_then(Value::as_object_mut)
        .ok_or(MigrationError::MissingSection(name))
}

fn add_overflow_and_board(root: &mut Map<String, Value>) -> Result<(), MigrationError> {
    section(root, "game")?
        .entry("apOverflow")
        .or_insert(json!(0));
    section(root, "quest")?
        .entry("questBoard")
        .or_insert(json!([]));
    Ok(())
}

fn add_rng_and_combo(root: &mut Map<String, Value>) -> Result<(), MigrationError> {
    root.entry("rng")
        .or_insert(json!({ "deck": 0, "draft": 0, "board": 0 }));
    section(root, "game")?
        .entry("deliveriesThisPhase")
        .or_insert(json!(0));
    Ok(())
}

/// Version string of a raw save.
///
/// # Errors
///
/// Returns [`MigrationError::MissingVersion`] when absent or not a string.
pub fn save_version(save: &Value) -> Result<&str, MigrationError> {
    save.get("version")
        .and_then(Value::as_str)
        .ok_or(MigrationError::MissingVersion)
}

#[must_use]
pub fn is_supported(version: &str) -> bool {
    version == CURRENT_SAVE_VERSION || MIGRATIONS.iter().any(|m| m.from == version)
}

/// Lift `save` to the current version in place. Returns the number of
/// migration steps applied.
///
/// # Errors
///
/// Fails for missing or unsupported versions and for saves missing a
/// section a step needs. On error `save` may be partially migrated.
pub fn migrate(save: &mut Value) -> Result<usize, MigrationError> {
    let original = save_version(save)?.to_string();
    if !is_supported(&original) {
        return Err(MigrationError::UnsupportedVersion(original));
    }
    let root = save
        .as_object_mut()
        .ok_or(MigrationError::MissingVersion)?;
    let mut steps = 0;
    let mut version = original.clone();
    while version != CURRENT_SAVE_VERSION {
        let step = MIGRATIONS
            .iter()
            .find(|m| m.from == version)
            .ok_or_else(|| MigrationError::UnsupportedVersion(version.clone()))?;
        (step.apply)(root)?;
        version = step.to.to_string();
        root.insert("version".to_string(), Value::String(version.clone()));
        steps += 1;
    }
    if steps > 0 {
        warn!("migrated save from {original} to {CURRENT_SAVE_VERSION} in {steps} step(s)");
    }
    Ok(steps)
}
