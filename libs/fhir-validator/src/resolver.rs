//! Value set lookup for bindings without an inline code list

use ferrum_models::ValueSet;
use std::collections::{BTreeSet, HashMap};

/// Terminology collaborator consulted for required bindings that only name a
/// value set.
///
/// Returning `None` leaves the binding unresolved; it is then treated as
/// advisory and never produces a violation.
pub trait ValueSetResolver: Send + Sync {
    fn resolve_value_set(&self, url: &str) -> Option<BTreeSet<String>>;
}

impl<F> ValueSetResolver for F
where
    F: Fn(&str) -> Option<BTreeSet<String>> + Send + Sync,
{
    fn resolve_value_set(&self, url: &str) -> Option<BTreeSet<String>> {
        self(url)
    }
}

/// Resolver over ValueSet resources held in memory.
///
/// Sets are indexed by canonical URL and by `url|version` when a version is
/// present. Intensional sets (filters, imports) are only indexed when they
/// carry an expansion.
#[derive(Debug, Clone, Default)]
pub struct InMemoryValueSets {
    sets: HashMap<String, BTreeSet<String>>,
}

impl InMemoryValueSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the value set could not be enumerated.
    pub fn insert(&mut self, value_set: &ValueSet) -> bool {
        if value_set.is_intensional() && value_set.expansion.is_none() {
            tracing::debug!(url = %value_set.url, "skipping intensional value set");
            return false;
        }

        let codes = value_set.codes();
        if let Some(version) = &value_set.version {
            self.sets
                .insert(format!("{}|{}", value_set.url, version), codes.clone());
        }
        self.sets.insert(value_set.url.clone(), codes);
        true
    }

    /// Parse a ValueSet resource from JSON and index it.
    pub fn load_json(&mut self, input: &str) -> ferrum_models::Result<bool> {
        let value_set = ValueSet::from_json(input)?;
        Ok(self.insert(&value_set))
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl FromIterator<ValueSet> for InMemoryValueSets {
    fn from_iter<T: IntoIterator<Item = ValueSet>>(iter: T) -> Self {
        let mut sets = Self::new();
        for value_set in iter {
            sets.insert(&value_set);
        }
        sets
    }
}

impl ValueSetResolver for InMemoryValueSets {
    fn resolve_value_set(&self, url: &str) -> Option<BTreeSet<String>> {
        self.sets.get(url).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK_TYPES: &str = r#"{
        "resourceType": "ValueSet",
        "url": "http://example.org/ValueSet/link-type",
        "version": "1.0.0",
        "status": "active",
        "compose": {
            "include": [{
                "system": "http://example.org/CodeSystem/link-type",
                "concept": [{ "code": "replaced-by" }, { "code": "refer" }]
            }]
        }
    }"#;

    #[test]
    fn indexes_by_url_and_version() {
        let mut sets = InMemoryValueSets::new();
        assert!(sets.load_json(LINK_TYPES).unwrap());
        assert_eq!(sets.len(), 2);

        let codes = sets
            .resolve_value_set("http://example.org/ValueSet/link-type|1.0.0")
            .unwrap();
        assert!(codes.contains("refer"));
        assert!(sets
            .resolve_value_set("http://example.org/ValueSet/link-type")
            .is_some());
        assert!(sets.resolve_value_set("http://example.org/other").is_none());
    }

    #[test]
    fn intensional_sets_are_skipped() {
        let input = r#"{
            "resourceType": "ValueSet",
            "url": "http://example.org/ValueSet/filtered",
            "status": "draft",
            "compose": { "include": [{ "system": "http://loinc.org", "filter": [{ "property": "class", "op": "=", "value": "LP" }] }] }
        }"#;
        let mut sets = InMemoryValueSets::new();
        assert!(!sets.load_json(input).unwrap());
        assert!(sets.is_empty());
    }

    #[test]
    fn closures_resolve() {
        let resolver = |url: &str| {
            (url == "http://example.org/vs").then(|| BTreeSet::from(["a".to_string()]))
        };
        assert!(resolver.resolve_value_set("http://example.org/vs").is_some());
        assert!(resolver.resolve_value_set("http://example.org/other").is_none());
    }
}
