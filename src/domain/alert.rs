//! Alert records produced by the diff engine.
//!
//! The alert payload is a tagged variant per [`AlertCode`]. On the wire it
//! keeps the stable external contract: an `alert_code` discriminator next
//! to an `other_info` object holding `hostname`, `dbname` and `features`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed classification of alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertCode {
    /// A machine was observed for the first time.
    NewServer,
    /// A database appeared on a machine.
    NewDatabase,
    /// A machine started using a qualifying license.
    NewLicense,
    /// A database activated one or more features (or baseline for a new one).
    NewOption,
}

impl AlertCode {
    /// Returns the wire name of the code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NewServer => "NewServer",
            Self::NewDatabase => "NewDatabase",
            Self::NewLicense => "NewLicense",
            Self::NewOption => "NewOption",
        }
    }

    /// Severity assigned to alerts of this code.
    #[must_use]
    pub const fn severity(&self) -> AlertSeverity {
        match self {
            Self::NewServer | Self::NewDatabase => AlertSeverity::Notice,
            Self::NewLicense | Self::NewOption => AlertSeverity::Critical,
        }
    }
}

impl fmt::Display for AlertCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How urgently an operator should look at an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    /// Informational inventory change.
    Notice,
    /// Worth checking but not urgent.
    Warning,
    /// Has licensing or cost implications.
    Critical,
}

impl AlertSeverity {
    /// Returns the wire name of the severity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Notice => "NOTICE",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Operator workflow state of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    /// Not yet looked at. Every generated alert starts here.
    New,
    /// Acknowledged by an operator.
    Ack,
}

impl AlertStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Ack => "ACK",
        }
    }
}

/// Context carried by an alert, one fixed field set per code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "alert_code", content = "other_info")]
pub enum AlertPayload {
    /// A machine was observed for the first time.
    NewServer {
        /// Machine hostname.
        hostname: String,
    },
    /// A database appeared on a machine.
    NewDatabase {
        /// Machine hostname.
        hostname: String,
        /// Name of the new database.
        dbname: String,
    },
    /// A machine started using a qualifying license.
    NewLicense {
        /// Machine hostname.
        hostname: String,
    },
    /// Features activated on a database.
    NewOption {
        /// Machine hostname.
        hostname: String,
        /// Database the features belong to.
        dbname: String,
        /// Activated feature names, sorted.
        features: Vec<String>,
    },
}

impl AlertPayload {
    /// Returns the classification code of this payload.
    #[must_use]
    pub const fn code(&self) -> AlertCode {
        match self {
            Self::NewServer { .. } => AlertCode::NewServer,
            Self::NewDatabase { .. } => AlertCode::NewDatabase,
            Self::NewLicense { .. } => AlertCode::NewLicense,
            Self::NewOption { .. } => AlertCode::NewOption,
        }
    }

    /// Hostname the alert refers to.
    #[must_use]
    pub fn hostname(&self) -> &str {
        match self {
            Self::NewServer { hostname }
            | Self::NewDatabase { hostname, .. }
            | Self::NewLicense { hostname }
            | Self::NewOption { hostname, .. } => hostname,
        }
    }

    /// Database name, for database-level alerts.
    #[must_use]
    pub fn dbname(&self) -> Option<&str> {
        match self {
            Self::NewDatabase { dbname, .. } | Self::NewOption { dbname, .. } => Some(dbname),
            Self::NewServer { .. } | Self::NewLicense { .. } => None,
        }
    }

    /// Returns the `other_info` object exactly as exposed to consumers.
    #[must_use]
    pub fn other_info(&self) -> serde_json::Value {
        match self {
            Self::NewServer { hostname } | Self::NewLicense { hostname } => {
                serde_json::json!({ "hostname": hostname })
            }
            Self::NewDatabase { hostname, dbname } => {
                serde_json::json!({ "hostname": hostname, "dbname": dbname })
            }
            Self::NewOption {
                hostname,
                dbname,
                features,
            } => serde_json::json!({
                "hostname": hostname,
                "dbname": dbname,
                "features": features,
            }),
        }
    }

    /// Human-readable one-line description.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::NewServer { hostname } => {
                format!("The server '{hostname}' was added to the inventory")
            }
            Self::NewDatabase { hostname, dbname } => {
                format!("The database '{dbname}' was created on the server '{hostname}'")
            }
            Self::NewLicense { hostname } => {
                format!("The server '{hostname}' has enabled a new license")
            }
            Self::NewOption {
                hostname,
                dbname,
                features,
            } if features.is_empty() => {
                format!("The database '{dbname}' on '{hostname}' has no active features")
            }
            Self::NewOption {
                hostname,
                dbname,
                features,
            } => format!(
                "The database '{dbname}' on '{hostname}' has enabled new features ({})",
                features.join(", ")
            ),
        }
    }
}

/// A single notification about an inventory change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Code and context.
    #[serde(flatten)]
    pub payload: AlertPayload,
    /// Severity derived from the code.
    pub severity: AlertSeverity,
    /// Workflow state.
    pub status: AlertStatus,
    /// Human-readable description.
    pub description: String,
    /// When the alert was raised.
    pub date: DateTime<Utc>,
}

impl Alert {
    /// Builds a fresh alert in the [`AlertStatus::New`] state.
    #[must_use]
    pub fn new(payload: AlertPayload, date: DateTime<Utc>) -> Self {
        Self {
            severity: payload.code().severity(),
            status: AlertStatus::New,
            description: payload.describe(),
            payload,
            date,
        }
    }

    /// Returns the classification code.
    #[must_use]
    pub const fn code(&self) -> AlertCode {
        self.payload.code()
    }
}
