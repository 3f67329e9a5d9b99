//! Machine snapshots and the database observations nested inside them.
//!
//! A [`Snapshot`] is the immutable, recorded state of one machine at one
//! point in time. Snapshots for the same machine share a `hostname` and
//! are ordered by `created_at`.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier of a snapshot.
///
/// Wraps a UUID so snapshot identifiers cannot be confused with other
/// UUIDs (or with alert row IDs). Never reused once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(uuid::Uuid);

impl SnapshotId {
    /// Creates a new random `SnapshotId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `SnapshotId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SnapshotId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

impl From<uuid::Uuid> for SnapshotId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<SnapshotId> for uuid::Uuid {
    fn from(id: SnapshotId) -> Self {
        id.0
    }
}

/// A licensable capability and whether the database is using it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// License name (e.g. `"Oracle ENT"`).
    pub name: String,
    /// Whether the capability is in use.
    pub used: bool,
}

impl License {
    /// Creates a license entry.
    #[must_use]
    pub fn new(name: impl Into<String>, used: bool) -> Self {
        Self {
            name: name.into(),
            used,
        }
    }
}

/// A database feature/option and its observed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    /// Feature name (e.g. `"Partitioning"`).
    pub name: String,
    /// `true` when the feature is active.
    pub status: bool,
}

impl Feature {
    /// Creates a feature entry.
    #[must_use]
    pub fn new(name: impl Into<String>, status: bool) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// A database observed on a machine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Database {
    /// Database name, unique within one snapshot.
    pub name: String,
    /// License entries reported for this database.
    #[serde(default)]
    pub licenses: Vec<License>,
    /// Feature entries reported for this database.
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl Database {
    /// Creates a database observation with no licenses or features.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            licenses: Vec::new(),
            features: Vec::new(),
        }
    }

    /// Adds a license entry (builder style).
    #[must_use]
    pub fn with_license(mut self, name: impl Into<String>, used: bool) -> Self {
        self.licenses.push(License::new(name, used));
        self
    }

    /// Adds a feature entry (builder style).
    #[must_use]
    pub fn with_feature(mut self, name: impl Into<String>, status: bool) -> Self {
        self.features.push(Feature::new(name, status));
        self
    }
}

/// Recorded state of one machine at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Store-assigned identifier.
    pub id: SnapshotId,
    /// Stable identity key of the machine across snapshots.
    pub hostname: String,
    /// When the snapshot was recorded.
    pub created_at: DateTime<Utc>,
    /// Databases hosted on the machine.
    #[serde(default)]
    pub databases: Vec<Database>,
}

impl Snapshot {
    /// Creates a snapshot with a fresh identifier and no databases.
    #[must_use]
    pub fn new(hostname: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: SnapshotId::new(),
            hostname: hostname.into(),
            created_at,
            databases: Vec::new(),
        }
    }

    /// Adds a database observation (builder style).
    #[must_use]
    pub fn with_database(mut self, database: Database) -> Self {
        self.databases.push(database);
        self
    }

    /// Looks up a database by name.
    #[must_use]
    pub fn database(&self, name: &str) -> Option<&Database> {
        self.databases.iter().find(|db| db.name == name)
    }

    /// Returns the first database name that appears more than once.
    #[must_use]
    pub fn duplicate_database(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.databases
            .iter()
            .map(|db| db.name.as_str())
            .find(|name| !seen.insert(*name))
    }

    /// Returns `true` if both snapshots describe the same machine state,
    /// ignoring identifier and recording time.
    #[must_use]
    pub fn same_state(&self, other: &Self) -> bool {
        self.hostname == other.hostname && self.databases == other.databases
    }
}
