//! Static catalog of every feature the platform knows about.
//!
//! The registry is compiled in and never touches the database. The feature
//! table is seeded from it, and clients use it to recognise core features
//! without a round trip.

use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureCategory {
    Core,
    Health,
    Organization,
    Finance,
    Social,
    Ai,
}

impl FeatureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureCategory::Core => "core",
            FeatureCategory::Health => "health",
            FeatureCategory::Organization => "organization",
            FeatureCategory::Finance => "finance",
            FeatureCategory::Social => "social",
            FeatureCategory::Ai => "ai",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDescriptor {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub category: FeatureCategory,
    pub is_core: bool,
    pub dependencies: &'static [&'static str],
    pub version: &'static str,
}

const FEATURES: &[FeatureDescriptor] = &[
    FeatureDescriptor {
        name: "dashboard",
        display_name: "Dashboard",
        description: "Overview of pets, upcoming appointments and reminders",
        category: FeatureCategory::Core,
        is_core: true,
        dependencies: &[],
        version: "1.0.0",
    },
    FeatureDescriptor {
        name: "pets",
        display_name: "Pet Profiles",
        description: "Create and manage pet profiles",
        category: FeatureCategory::Core,
        is_core: true,
        dependencies: &[],
        version: "1.0.0",
    },
    FeatureDescriptor {
        name: "settings",
        display_name: "Settings",
        description: "Account and application settings",
        category: FeatureCategory::Core,
        is_core: true,
        dependencies: &[],
        version: "1.0.0",
    },
    FeatureDescriptor {
        name: "profile",
        display_name: "User Profile",
        description: "Personal profile and subscription details",
        category: FeatureCategory::Core,
        is_core: true,
        dependencies: &[],
        version: "1.0.0",
    },
    FeatureDescriptor {
        name: "appointments",
        display_name: "Appointments",
        description: "Schedule and track vet appointments",
        category: FeatureCategory::Health,
        is_core: false,
        dependencies: &["pets"],
        version: "1.0.0",
    },
    FeatureDescriptor {
        name: "health-records",
        display_name: "Health Records",
        description: "Medical history, treatments and lab results",
        category: FeatureCategory::Health,
        is_core: false,
        dependencies: &["pets"],
        version: "1.0.0",
    },
    FeatureDescriptor {
        name: "vaccinations",
        display_name: "Vaccinations",
        description: "Vaccination schedules and certificates",
        category: FeatureCategory::Health,
        is_core: false,
        dependencies: &["health-records"],
        version: "1.0.0",
    },
    FeatureDescriptor {
        name: "weight-tracking",
        display_name: "Weight Tracking",
        description: "Track weight and body condition over time",
        category: FeatureCategory::Health,
        is_core: false,
        dependencies: &["pets"],
        version: "1.0.0",
    },
    FeatureDescriptor {
        name: "reminders",
        display_name: "Reminders",
        description: "Recurring reminders for medication, feeding and grooming",
        category: FeatureCategory::Organization,
        is_core: false,
        dependencies: &[],
        version: "1.0.0",
    },
    FeatureDescriptor {
        name: "documents",
        display_name: "Documents",
        description: "Store adoption papers, insurance and vet documents",
        category: FeatureCategory::Organization,
        is_core: false,
        dependencies: &["pets"],
        version: "1.0.0",
    },
    FeatureDescriptor {
        name: "expenses",
        display_name: "Expenses",
        description: "Track pet-related spending by category",
        category: FeatureCategory::Finance,
        is_core: false,
        dependencies: &["pets"],
        version: "1.0.0",
    },
    FeatureDescriptor {
        name: "social",
        display_name: "Community Feed",
        description: "Share posts and follow other pet owners",
        category: FeatureCategory::Social,
        is_core: false,
        dependencies: &[],
        version: "1.0.0",
    },
    FeatureDescriptor {
        name: "stories",
        display_name: "Stories",
        description: "Short-lived photo stories",
        category: FeatureCategory::Social,
        is_core: false,
        dependencies: &["social"],
        version: "1.0.0",
    },
    FeatureDescriptor {
        name: "challenges",
        display_name: "Challenges",
        description: "Community challenges and badges",
        category: FeatureCategory::Social,
        is_core: false,
        dependencies: &["social"],
        version: "1.0.0",
    },
    FeatureDescriptor {
        name: "ai-vet",
        display_name: "AI Vet Assistant",
        description: "Symptom triage and care questions answered by an assistant",
        category: FeatureCategory::Ai,
        is_core: false,
        dependencies: &["health-records"],
        version: "0.9.0",
    },
];

/// Served by clients when the feature endpoint cannot be reached.
const DEFAULT_CLIENT_FEATURES: &[&str] = &[
    "dashboard",
    "pets",
    "settings",
    "profile",
    "reminders",
    "appointments",
];

pub fn resolve_feature(name: &str) -> Option<&'static FeatureDescriptor> {
    FEATURES.iter().find(|f| f.name == name)
}

/// Core first, then category name, then display name
pub fn list_features() -> Vec<&'static FeatureDescriptor> {
    let mut features: Vec<_> = FEATURES.iter().collect();
    features.sort_by(|a, b| {
        b.is_core
            .cmp(&a.is_core)
            .then_with(|| a.category.as_str().cmp(b.category.as_str()))
            .then_with(|| a.display_name.cmp(b.display_name))
    });
    features
}

pub fn is_core_feature(name: &str) -> bool {
    resolve_feature(name).map(|f| f.is_core).unwrap_or(false)
}

/// True iff every dependency of `name` is core or in `enabled`. Unknown names are never satisfied.
pub fn dependencies_satisfied(name: &str, enabled: &BTreeSet<String>) -> bool {
    missing_dependencies(name, enabled).map_or(false, |missing| missing.is_empty())
}

/// Dependencies of `name` that are neither core nor enabled, or None for an unknown feature.
pub fn missing_dependencies(name: &str, enabled: &BTreeSet<String>) -> Option<Vec<&'static str>> {
    let descriptor = resolve_feature(name)?;
    Some(
        descriptor
            .dependencies
            .iter()
            .copied()
            .filter(|dep| !is_core_feature(dep) && !enabled.contains(*dep))
            .collect(),
    )
}

pub fn default_client_features() -> BTreeSet<String> {
    DEFAULT_CLIENT_FEATURES.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn names_are_unique_and_dependencies_resolve() {
        let mut seen = BTreeSet::new();
        for f in FEATURES {
            assert!(seen.insert(f.name), "duplicate feature {}", f.name);
            for dep in f.dependencies {
                assert!(resolve_feature(dep).is_some(), "{} depends on unknown {}", f.name, dep);
            }
        }
    }

    #[test]
    fn core_features_are_in_core_category() {
        for f in FEATURES.iter().filter(|f| f.is_core) {
            assert_eq!(f.category, FeatureCategory::Core);
        }
    }

    #[test]
    fn listing_puts_core_first_then_category_then_display_name() {
        let listed = list_features();
        let first_non_core = listed.iter().position(|f| !f.is_core).unwrap();
        assert!(listed[..first_non_core].iter().all(|f| f.is_core));
        assert!(listed[first_non_core..].iter().all(|f| !f.is_core));

        let core_names: Vec<_> = listed[..first_non_core].iter().map(|f| f.display_name).collect();
        assert_eq!(core_names, vec!["Dashboard", "Pet Profiles", "Settings", "User Profile"]);

        // "ai" sorts before "finance"
        assert_eq!(listed[first_non_core].name, "ai-vet");
        for pair in listed[first_non_core..].windows(2) {
            let a = (pair[0].category.as_str(), pair[0].display_name);
            let b = (pair[1].category.as_str(), pair[1].display_name);
            assert!(a <= b, "{:?} listed before {:?}", a, b);
        }
    }

    #[test]
    fn core_dependencies_are_always_satisfied() {
        assert!(dependencies_satisfied("expenses", &BTreeSet::new()));
        assert!(dependencies_satisfied("dashboard", &BTreeSet::new()));
    }

    #[test]
    fn optional_dependencies_must_be_enabled() {
        assert!(!dependencies_satisfied("stories", &set(&["dashboard"])));
        assert!(dependencies_satisfied("stories", &set(&["social"])));
        assert_eq!(
            missing_dependencies("vaccinations", &BTreeSet::new()),
            Some(vec!["health-records"])
        );
    }

    #[test]
    fn unknown_feature_is_never_satisfied() {
        assert!(!dependencies_satisfied("teleportation", &set(&["teleportation"])));
        assert!(resolve_feature("teleportation").is_none());
        assert!(!is_core_feature("teleportation"));
    }

    #[test]
    fn client_defaults_include_the_minimal_navigation() {
        let defaults = default_client_features();
        for name in ["dashboard", "pets", "settings"] {
            assert!(defaults.contains(name));
        }
        assert!(defaults.iter().all(|name| resolve_feature(name).is_some()));
    }
}
