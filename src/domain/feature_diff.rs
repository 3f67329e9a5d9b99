//! Feature transition classifier.
//!
//! Compares the feature sets of two observations of the same database and
//! assigns each feature name one [`FeatureTransition`]. Only
//! [`FeatureTransition::Activated`] drives a `NewOption` alert.

use std::collections::BTreeMap;

use super::snapshot::Feature;

/// How a feature's active flag changed between two observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureTransition {
    /// Absent or inactive before, absent or inactive now.
    Inactive,
    /// Active before, absent or inactive now.
    Deactivated,
    /// Not present in either observation.
    Missing,
    /// Absent or inactive before, active now.
    Activated,
    /// Active before and active now.
    Active,
}

impl FeatureTransition {
    /// Returns the numeric code used in stored diffs (`-2..=2`).
    #[must_use]
    pub const fn code(&self) -> i8 {
        match self {
            Self::Inactive => -2,
            Self::Deactivated => -1,
            Self::Missing => 0,
            Self::Activated => 1,
            Self::Active => 2,
        }
    }

    fn between(prior: Option<bool>, new: Option<bool>) -> Self {
        match (prior, new) {
            (None, None) => Self::Missing,
            (Some(true), Some(true)) => Self::Active,
            (Some(true), _) => Self::Deactivated,
            (_, Some(true)) => Self::Activated,
            _ => Self::Inactive,
        }
    }
}

/// Result of classifying two feature sets, keyed by feature name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureDiff {
    transitions: BTreeMap<String, FeatureTransition>,
}

impl FeatureDiff {
    /// Transition for `name`; [`FeatureTransition::Missing`] if neither
    /// side mentioned it.
    #[must_use]
    pub fn get(&self, name: &str) -> FeatureTransition {
        self.transitions
            .get(name)
            .copied()
            .unwrap_or(FeatureTransition::Missing)
    }

    /// Names classified as [`FeatureTransition::Activated`], sorted.
    #[must_use]
    pub fn activated(&self) -> Vec<String> {
        self.transitions
            .iter()
            .filter(|(_, t)| **t == FeatureTransition::Activated)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Iterates over every classified feature in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, FeatureTransition)> {
        self.transitions.iter().map(|(name, t)| (name.as_str(), *t))
    }

    /// Number of classified features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Returns `true` when no feature appeared on either side.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Classifies every feature appearing in `prior` or `new`.
///
/// When a name repeats within one side, the last entry wins.
#[must_use]
pub fn diff_features(prior: &[Feature], new: &[Feature]) -> FeatureDiff {
    let mut sides: BTreeMap<&str, (Option<bool>, Option<bool>)> = BTreeMap::new();
    for feature in prior {
        sides.entry(feature.name.as_str()).or_default().0 = Some(feature.status);
    }
    for feature in new {
        sides.entry(feature.name.as_str()).or_default().1 = Some(feature.status);
    }

    let transitions = sides
        .into_iter()
        .map(|(name, (p, n))| (name.to_string(), FeatureTransition::between(p, n)))
        .collect();

    FeatureDiff { transitions }
}
