//! Warning ledger.
//!
//! Per-user warning counts with a write-through JSON snapshot: every mutation
//! rewrites the full file (message rates are low, durability wins over
//! throughput). Snapshot keys are stringified user ids, matching the
//! `warnings.json` format of the reference deployment.

use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
};

use tracing::{error, info};

use crate::{domain::UserId, Error, Result};

pub struct WarningLedger {
    path: PathBuf,
    counts: HashMap<UserId, u32>,
}

impl WarningLedger {
    /// Read persisted state. A missing file starts empty; a malformed file is
    /// logged loudly but also starts empty - startup is never blocked.
    pub fn load(path: PathBuf) -> Self {
        let counts = match std::fs::read_to_string(&path) {
            Ok(txt) => match parse_snapshot(&txt) {
                Ok(counts) => {
                    info!("loaded {} warning records from {}", counts.len(), path.display());
                    counts
                }
                Err(e) => {
                    error!(
                        "malformed warnings file {}: {e}; continuing with an empty ledger",
                        path.display()
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("no warnings file at {}, starting empty", path.display());
                HashMap::new()
            }
            Err(e) => {
                error!(
                    "cannot read warnings file {}: {e}; continuing with an empty ledger",
                    path.display()
                );
                HashMap::new()
            }
        };

        Self { path, counts }
    }

    pub fn count(&self, user: UserId) -> u32 {
        self.counts.get(&user).copied().unwrap_or(0)
    }

    /// Bump the user's count and persist the snapshot. Returns the new count.
    pub fn increment(&mut self, user: UserId) -> u32 {
        let count = self.counts.entry(user).or_insert(0);
        *count += 1;
        let count = *count;
        self.persist();
        count
    }

    /// Remove the user's record entirely (not set-to-zero) and persist.
    pub fn reset(&mut self, user: UserId) {
        self.counts.remove(&user);
        self.persist();
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Write the full snapshot; last full write wins. The in-memory state
    /// stays authoritative when the write fails.
    fn persist(&self) {
        match self.snapshot_json() {
            Ok(txt) => {
                if let Err(e) = std::fs::write(&self.path, txt) {
                    error!("failed to persist warnings to {}: {e}", self.path.display());
                }
            }
            Err(e) => error!("failed to serialize warnings snapshot: {e}"),
        }
    }

    fn snapshot_json(&self) -> Result<String> {
        // BTreeMap keeps the snapshot stable across rewrites.
        let raw: BTreeMap<String, u32> = self
            .counts
            .iter()
            .map(|(user, count)| (user.0.to_string(), *count))
            .collect();
        Ok(serde_json::to_string(&raw)?)
    }
}

fn parse_snapshot(txt: &str) -> Result<HashMap<UserId, u32>> {
    let raw: HashMap<String, u32> = serde_json::from_str(txt)?;
    raw.into_iter()
        .map(|(k, v)| {
            k.parse::<i64>()
                .map(|id| (UserId(id), v))
                .map_err(|_| Error::External(format!("invalid user id key in snapshot: {k:?}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        let path = PathBuf::from(format!("/tmp/maxbot-ledger-{}-{name}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn missing_file_starts_empty() {
        let ledger = WarningLedger::load(scratch_path("missing"));
        assert!(ledger.is_empty());
        assert_eq!(ledger.count(UserId(1)), 0);
    }

    #[test]
    fn malformed_file_starts_empty() {
        let path = scratch_path("malformed");
        std::fs::write(&path, "{not json").unwrap();

        let ledger = WarningLedger::load(path.clone());
        assert!(ledger.is_empty());

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn non_numeric_key_is_malformed() {
        let path = scratch_path("badkey");
        std::fs::write(&path, r#"{"alice": 3}"#).unwrap();

        let ledger = WarningLedger::load(path.clone());
        assert!(ledger.is_empty());

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn increment_counts_sequentially_and_reset_removes() {
        let path = scratch_path("increment");
        let mut ledger = WarningLedger::load(path.clone());

        let user = UserId(42);
        for expected in 1..=4 {
            assert_eq!(ledger.increment(user), expected);
        }
        assert_eq!(ledger.count(user), 4);

        ledger.reset(user);
        assert_eq!(ledger.count(user), 0);
        assert!(ledger.is_empty());

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn snapshot_round_trips() {
        let path = scratch_path("roundtrip");
        let mut ledger = WarningLedger::load(path.clone());
        ledger.increment(UserId(7));
        ledger.increment(UserId(7));
        ledger.increment(UserId(-100500));

        let reloaded = WarningLedger::load(path.clone());
        assert_eq!(reloaded.count(UserId(7)), 2);
        assert_eq!(reloaded.count(UserId(-100500)), 1);
        assert_eq!(reloaded.len(), 2);

        let _ = std::fs::remove_file(path);
    }
}
