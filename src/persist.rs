//! Idempotent persistence of extracted competitor records.
//!
//! Records are written one at a time, keyed by `(startup_id, name)` with
//! case-insensitive matching. An existing row only gains the fields the
//! new record carries; a new row gets defaults for the rest. One bad
//! record never aborts the batch.

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::{CompetitorProfile, UpsertAction};
use crate::error::Result;
use crate::storage::Storage;

/// Tally of a persist pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistOutcome {
    /// Rows created.
    pub inserted: usize,
    /// Rows updated.
    pub updated: usize,
    /// One message per record that could not be written.
    pub errors: Vec<String>,
}

impl PersistOutcome {
    /// Records successfully written.
    #[must_use]
    pub const fn written(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Inserts or coalesce-updates one record.
///
/// # Errors
///
/// Returns the storage error for this record.
pub fn upsert_competitor<S: Storage + ?Sized>(
    storage: &mut S,
    startup_id: &str,
    profile: &CompetitorProfile,
) -> Result<UpsertAction> {
    if let Some(existing) = storage.find_competitor(startup_id, &profile.name)? {
        storage.update_competitor(&existing.id, profile)?;
        Ok(UpsertAction::Updated)
    } else {
        storage.insert_competitor(startup_id, profile)?;
        Ok(UpsertAction::Inserted)
    }
}

/// Writes every record in order and tallies the result.
pub fn persist<S: Storage + ?Sized>(
    storage: &mut S,
    startup_id: &str,
    records: &[CompetitorProfile],
) -> PersistOutcome {
    let mut outcome = PersistOutcome::default();

    for record in records {
        match upsert_competitor(storage, startup_id, record) {
            Ok(UpsertAction::Inserted) => outcome.inserted += 1,
            Ok(UpsertAction::Updated) => outcome.updated += 1,
            Err(e) => {
                warn!(competitor = %record.name, error = %e, "failed to save competitor");
                outcome
                    .errors
                    .push(format!("Error saving competitor {}: {e}", record.name));
            }
        }
    }

    debug!(
        startup_id,
        inserted = outcome.inserted,
        updated = outcome.updated,
        errors = outcome.errors.len(),
        "persisted competitors"
    );
    outcome
}
