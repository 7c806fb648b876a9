use crate::validator::{IssueCode, ValidationIssue};
use ferrum_schema::Max;
use std::fmt;

/// A conformance problem found in a record.
///
/// `path` is the instance location with indexes on repeating fields
/// (`Bundle.entry[2].request.method`); `field` is the name of the field the
/// problem was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Occurrence count outside `min..max`
    Cardinality {
        path: String,
        field: String,
        min: u32,
        max: Max,
        count: usize,
    },
    /// Code outside the value set of a required binding
    CodeBinding {
        path: String,
        field: String,
        code: String,
        value_set: Option<String>,
        allowed: Vec<String>,
    },
}

impl Violation {
    pub fn path(&self) -> &str {
        match self {
            Violation::Cardinality { path, .. } | Violation::CodeBinding { path, .. } => path,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Violation::Cardinality { field, .. } | Violation::CodeBinding { field, .. } => field,
        }
    }

    pub fn is_cardinality(&self) -> bool {
        matches!(self, Violation::Cardinality { .. })
    }

    pub fn is_code_binding(&self) -> bool {
        matches!(self, Violation::CodeBinding { .. })
    }

    /// Render as an error issue for an OperationOutcome.
    pub fn to_issue(&self) -> ValidationIssue {
        let code = match self {
            Violation::Cardinality { min, count, .. } if *count < *min as usize => {
                IssueCode::Required
            }
            Violation::Cardinality { .. } => IssueCode::Structure,
            Violation::CodeBinding { .. } => IssueCode::CodeInvalid,
        };
        ValidationIssue::error(code, self.to_string())
            .with_location(self.path().to_string())
            .with_expression(vec![self.path().to_string()])
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Cardinality {
                path,
                min,
                max,
                count,
                ..
            } => write!(
                f,
                "{}: expected {}..{} occurrences, found {}",
                path, min, max, count
            ),
            Violation::CodeBinding {
                path,
                code,
                value_set,
                allowed,
                ..
            } => {
                write!(f, "{}: code '{}' is not in the required value set", path, code)?;
                if let Some(url) = value_set {
                    write!(f, " {}", url)?;
                }
                write!(f, " (allowed: {})", allowed.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::IssueSeverity;

    #[test]
    fn cardinality_messages() {
        let missing = Violation::Cardinality {
            path: "CoverageEligibilityResponse.patient".to_string(),
            field: "patient".to_string(),
            min: 1,
            max: Max::Bounded(1),
            count: 0,
        };
        assert_eq!(
            missing.to_string(),
            "CoverageEligibilityResponse.patient: expected 1..1 occurrences, found 0"
        );
        let issue = missing.to_issue();
        assert_eq!(issue.severity, IssueSeverity::Error);
        assert_eq!(issue.code, IssueCode::Required);
        assert_eq!(issue.location.as_deref(), Some("CoverageEligibilityResponse.patient"));

        let too_many = Violation::Cardinality {
            path: "Device.status".to_string(),
            field: "status".to_string(),
            min: 0,
            max: Max::Bounded(1),
            count: 2,
        };
        assert_eq!(too_many.to_issue().code, IssueCode::Structure);
    }

    #[test]
    fn binding_messages() {
        let violation = Violation::CodeBinding {
            path: "Bundle.type".to_string(),
            field: "type".to_string(),
            code: "nope".to_string(),
            value_set: Some("http://hl7.org/fhir/ValueSet/bundle-type".to_string()),
            allowed: vec!["batch".to_string(), "document".to_string()],
        };
        assert_eq!(violation.field(), "type");
        assert!(violation.is_code_binding());
        assert_eq!(
            violation.to_string(),
            "Bundle.type: code 'nope' is not in the required value set \
             http://hl7.org/fhir/ValueSet/bundle-type (allowed: batch, document)"
        );
        assert_eq!(violation.to_issue().code, IssueCode::CodeInvalid);
    }
}
