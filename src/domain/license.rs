//! Qualifying-license predicate.
//!
//! Decides whether a database's license set counts as "qualifying" for
//! `NewLicense` alerts. The engine fires when a database goes from not
//! qualifying to qualifying between two snapshots.

use std::collections::BTreeSet;

use super::snapshot::{License, Snapshot};

/// License name treated as qualifying when nothing else is configured.
pub const DEFAULT_QUALIFYING_LICENSE: &str = "Oracle ENT";

/// Configurable predicate over a database's license set.
///
/// A license set qualifies when at least one entry is flagged `used` and
/// its name is in `names`. An empty `names` set accepts any used license.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseRule {
    names: BTreeSet<String>,
}

impl LicenseRule {
    /// Builds a rule matching the given license names.
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// A rule accepting any used license.
    #[must_use]
    pub fn any_used() -> Self {
        Self {
            names: BTreeSet::new(),
        }
    }

    /// Parses a comma-separated list of names; blank entries are ignored.
    #[must_use]
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(',').map(str::trim).filter(|s| !s.is_empty()))
    }

    /// Names this rule matches. Empty means "any".
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Returns `true` if the license set contains a qualifying entry.
    #[must_use]
    pub fn qualifies(&self, licenses: &[License]) -> bool {
        licenses
            .iter()
            .any(|lic| lic.used && (self.names.is_empty() || self.names.contains(&lic.name)))
    }

    /// Returns `true` if any database of the machine holds a qualifying
    /// license. Licensing is tracked per machine, so this is the state
    /// `NewLicense` compares.
    #[must_use]
    pub fn qualifies_snapshot(&self, snapshot: &Snapshot) -> bool {
        snapshot
            .databases
            .iter()
            .any(|db| self.qualifies(&db.licenses))
    }
}

impl Default for LicenseRule {
    fn default() -> Self {
        Self::new([DEFAULT_QUALIFYING_LICENSE])
    }
}
