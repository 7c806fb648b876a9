//! Terminology bindings on coded fields

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Binding strength for terminology bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingStrength {
    Required,
    Extensible,
    Preferred,
    Example,
}

impl std::fmt::Display for BindingStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Required => "required",
            Self::Extensible => "extensible",
            Self::Preferred => "preferred",
            Self::Example => "example",
        };
        write!(f, "{}", s)
    }
}

/// Coded-value constraint attached to a field.
///
/// `codes` is the inline list of allowed codes. It may be empty, in which case
/// the binding can only be checked through an external value set resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetBinding {
    pub strength: BindingStrength,

    /// Canonical URL of the bound value set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_set: Option<String>,

    /// Code system the inline codes are drawn from
    #[serde(default, rename = "system", skip_serializing_if = "Option::is_none")]
    pub code_system: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub codes: BTreeSet<String>,
}

impl ValueSetBinding {
    pub fn new(strength: BindingStrength) -> Self {
        Self {
            strength,
            value_set: None,
            code_system: None,
            codes: BTreeSet::new(),
        }
    }

    pub fn required<I, S>(code_system: impl Into<String>, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(BindingStrength::Required)
            .with_code_system(code_system)
            .with_codes(codes)
    }

    pub fn with_value_set(mut self, url: impl Into<String>) -> Self {
        self.value_set = Some(url.into());
        self
    }

    pub fn with_code_system(mut self, system: impl Into<String>) -> Self {
        self.code_system = Some(system.into());
        self
    }

    pub fn with_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.codes.extend(codes.into_iter().map(Into::into));
        self
    }

    /// Only required bindings reject codes outside the value set.
    pub fn is_enforced(&self) -> bool {
        self.strength == BindingStrength::Required
    }

    pub fn has_inline_codes(&self) -> bool {
        !self.codes.is_empty()
    }

    /// Check a code against the inline list. `None` when there is no inline list.
    pub fn allows(&self, code: &str) -> Option<bool> {
        if self.codes.is_empty() {
            None
        } else {
            Some(self.codes.contains(code))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_required_is_enforced() {
        assert!(ValueSetBinding::new(BindingStrength::Required).is_enforced());
        assert!(!ValueSetBinding::new(BindingStrength::Extensible).is_enforced());
        assert!(!ValueSetBinding::new(BindingStrength::Preferred).is_enforced());
        assert!(!ValueSetBinding::new(BindingStrength::Example).is_enforced());
    }

    #[test]
    fn allows_without_inline_codes_is_unknown() {
        let binding = ValueSetBinding::new(BindingStrength::Required)
            .with_value_set("http://hl7.org/fhir/ValueSet/example");
        assert_eq!(binding.allows("anything"), None);

        let binding = ValueSetBinding::required("http://hl7.org/fhir/bundle-type", ["document"]);
        assert_eq!(binding.allows("document"), Some(true));
        assert_eq!(binding.allows("searchset"), Some(false));
    }

    #[test]
    fn deserializes_from_definition_json() {
        let binding: ValueSetBinding = serde_json::from_str(
            r#"{"strength":"extensible","valueSet":"http://hl7.org/fhir/ValueSet/x","codes":["a","b"]}"#,
        )
        .unwrap();
        assert_eq!(binding.strength, BindingStrength::Extensible);
        assert_eq!(binding.codes.len(), 2);
        assert!(binding.code_system.is_none());
    }
}
