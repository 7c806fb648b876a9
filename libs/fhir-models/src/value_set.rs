//! FHIR ValueSet model
//!
//! Only the parts needed to enumerate the codes of a value set are modeled;
//! other elements are skipped when parsing.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Publication status of a conformance resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    Draft,
    Active,
    Retired,
    Unknown,
}

/// FHIR ValueSet resource
///
/// A set of codes drawn from one or more code systems.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueSet {
    /// Resource type - always "ValueSet"
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Canonical identifier
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub status: PublicationStatus,

    /// Content logical definition (the "intension")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compose: Option<ValueSetCompose>,

    /// Used when the value set is "expanded"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expansion: Option<ValueSetExpansion>,
}

fn default_resource_type() -> String {
    "ValueSet".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetCompose {
    /// Whether inactive codes are in the value set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactive: Option<bool>,

    pub include: Vec<ValueSetInclude>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<ValueSetInclude>>,
}

/// Include codes from a code system
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetInclude {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Specific codes from the system
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<Vec<ValueSetConcept>>,

    /// Select codes/concepts by their properties; not evaluated here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Vec<Value>>,

    /// Select only contents included in specified value set(s)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_set: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueSetConcept {
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetExpansion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    /// Time valueset expansion was generated
    pub timestamp: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<Vec<ValueSetExpansionContains>>,
}

/// Codes in an expansion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetExpansionContains {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// If user cannot select this entry
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub is_abstract: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactive: Option<bool>,

    /// Code - if blank, this is not a selectable code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    /// Codes contained under this entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<Vec<ValueSetExpansionContains>>,
}

impl ValueSet {
    /// Create a new ValueSet with minimal required fields
    pub fn new(url: impl Into<String>, status: PublicationStatus) -> Self {
        Self {
            resource_type: "ValueSet".to_string(),
            id: None,
            url: url.into(),
            version: None,
            name: None,
            status,
            compose: None,
            expansion: None,
        }
    }

    pub fn from_json(input: &str) -> Result<Self> {
        let value_set: ValueSet = serde_json::from_str(input)?;
        if value_set.resource_type != "ValueSet" {
            return Err(Error::InvalidResource(format!(
                "expected ValueSet, got {}",
                value_set.resource_type
            )));
        }
        Ok(value_set)
    }

    /// Enumerate codes that are listed explicitly.
    ///
    /// Collects the concepts of every `compose.include` minus those of
    /// `compose.exclude`, plus the selectable codes of the expansion.
    /// Filters and imported value sets are not evaluated.
    pub fn codes(&self) -> BTreeSet<String> {
        let mut codes = BTreeSet::new();

        if let Some(compose) = &self.compose {
            for include in &compose.include {
                codes.extend(include_codes(include));
            }
            for exclude in compose.exclude.iter().flatten() {
                for code in include_codes(exclude) {
                    codes.remove(&code);
                }
            }
        }

        if let Some(expansion) = &self.expansion {
            collect_expansion(expansion.contains.iter().flatten(), &mut codes);
        }

        codes
    }

    /// True when filters or imported value sets make [`ValueSet::codes`]
    /// incomplete.
    pub fn is_intensional(&self) -> bool {
        self.compose.as_ref().is_some_and(|compose| {
            compose
                .include
                .iter()
                .any(|include| include.filter.is_some() || include.value_set.is_some())
        })
    }
}

fn include_codes(include: &ValueSetInclude) -> impl Iterator<Item = String> + '_ {
    include
        .concept
        .iter()
        .flatten()
        .map(|concept| concept.code.clone())
}

fn collect_expansion<'a>(
    entries: impl Iterator<Item = &'a ValueSetExpansionContains>,
    codes: &mut BTreeSet<String>,
) {
    for entry in entries {
        if entry.is_abstract != Some(true) {
            if let Some(code) = &entry.code {
                codes.insert(code.clone());
            }
        }
        collect_expansion(entry.contains.iter().flatten(), codes);
    }
}
