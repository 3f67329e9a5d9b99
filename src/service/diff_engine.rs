//! Diff engine: turns two snapshots of a machine into alerts.
//!
//! Pure and synchronous. The only input besides the two snapshots is the
//! alert date, supplied by the caller from its clock.
//!
//! Emission order:
//!
//! 1. `NewServer` when there is no prior snapshot.
//! 2. For every database of the new snapshot, in snapshot order:
//!    - new database: `NewDatabase`, then a baseline `NewOption` listing
//!      every active feature (possibly none);
//!    - known database: `NewLicense` if the machine now holds a qualifying
//!      license and did not before, then `NewOption` if any feature was
//!      activated.
//!
//! Removed databases produce nothing.

use chrono::{DateTime, Utc};

use crate::domain::{Alert, AlertPayload, Database, LicenseRule, Snapshot, diff_features};
use crate::error::DiffError;

/// Computes alerts from consecutive snapshots of one machine.
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    license_rule: LicenseRule,
}

impl DiffEngine {
    /// Creates an engine using `license_rule` to decide license novelty.
    #[must_use]
    pub fn new(license_rule: LicenseRule) -> Self {
        Self { license_rule }
    }

    /// Returns the license predicate in use.
    #[must_use]
    pub fn license_rule(&self) -> &LicenseRule {
        &self.license_rule
    }

    /// Compares `prior` (or its absence) with `new` and returns the alerts
    /// to raise, in emission order. Every alert is dated `date`.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::DuplicateDatabase`] if either snapshot lists
    /// the same database name twice.
    pub fn diff(
        &self,
        prior: Option<&Snapshot>,
        new: &Snapshot,
        date: DateTime<Utc>,
    ) -> Result<Vec<Alert>, DiffError> {
        check_unique_databases(new)?;
        if let Some(prior) = prior {
            check_unique_databases(prior)?;
        }

        let hostname = &new.hostname;
        let mut alerts = Vec::new();

        if prior.is_none() {
            alerts.push(Alert::new(
                AlertPayload::NewServer {
                    hostname: hostname.clone(),
                },
                date,
            ));
        }

        // Licensing is machine-wide; known databases only report it.
        let license_acquired = prior
            .is_some_and(|p| !self.license_rule.qualifies_snapshot(p))
            && self.license_rule.qualifies_snapshot(new);

        for db in &new.databases {
            match prior.and_then(|p| p.database(&db.name)) {
                None => Self::new_database(hostname, db, date, &mut alerts),
                Some(old) => {
                    Self::known_database(hostname, old, db, license_acquired, date, &mut alerts);
                }
            }
        }

        Ok(alerts)
    }

    fn new_database(
        hostname: &str,
        db: &Database,
        date: DateTime<Utc>,
        alerts: &mut Vec<Alert>,
    ) {
        alerts.push(Alert::new(
            AlertPayload::NewDatabase {
                hostname: hostname.to_string(),
                dbname: db.name.clone(),
            },
            date,
        ));
        alerts.push(Alert::new(
            AlertPayload::NewOption {
                hostname: hostname.to_string(),
                dbname: db.name.clone(),
                features: diff_features(&[], &db.features).activated(),
            },
            date,
        ));
    }

    fn known_database(
        hostname: &str,
        old: &Database,
        db: &Database,
        license_acquired: bool,
        date: DateTime<Utc>,
        alerts: &mut Vec<Alert>,
    ) {
        if license_acquired {
            alerts.push(Alert::new(
                AlertPayload::NewLicense {
                    hostname: hostname.to_string(),
                },
                date,
            ));
        }

        let activated = diff_features(&old.features, &db.features).activated();
        if !activated.is_empty() {
            alerts.push(Alert::new(
                AlertPayload::NewOption {
                    hostname: hostname.to_string(),
                    dbname: db.name.clone(),
                    features: activated,
                },
                date,
            ));
        }
    }
}

fn check_unique_databases(snapshot: &Snapshot) -> Result<(), DiffError> {
    match snapshot.duplicate_database() {
        Some(dbname) => Err(DiffError::DuplicateDatabase {
            hostname: snapshot.hostname.clone(),
            dbname: dbname.to_string(),
        }),
        None => Ok(()),
    }
}
