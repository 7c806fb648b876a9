//! Required-binding conformance of coded values
//!
//! A `code` (or any string primitive) is checked directly. A `Coding` is
//! checked by its `code`, and only conforms when its `system` is absent or
//! matches the binding's code system. A `CodeableConcept` conforms when any
//! of its codings does; a concept with no coded coding has nothing to check.

use crate::config::UnresolvedBindings;
use crate::plan::BindingPlan;
use crate::resolver::ValueSetResolver;
use crate::validator::{Findings, IssueCode, ValidationIssue};
use crate::violation::Violation;
use ferrum_models::{TypedRecord, Value};
use ferrum_schema::{FieldSpec, ValueSetBinding};
use std::borrow::Cow;
use std::collections::BTreeSet;

/// A code found in a value together with the system it claims
struct Candidate<'a> {
    system: Option<&'a str>,
    code: &'a str,
}

pub(crate) fn check_value(
    field: &FieldSpec,
    binding: &ValueSetBinding,
    value: &Value,
    path: &str,
    plan: &BindingPlan,
    resolver: Option<&dyn ValueSetResolver>,
    findings: &mut Findings,
) {
    if !binding.is_enforced() {
        return;
    }

    let candidates = candidates(value);
    let Some(first) = candidates.first() else {
        return;
    };

    let Some(allowed) = allowed_codes(binding, resolver) else {
        unresolved(binding, path, plan, findings);
        return;
    };

    if candidates
        .iter()
        .any(|candidate| conforms(candidate, binding, &allowed))
    {
        return;
    }

    tracing::trace!(path, code = first.code, "code outside required binding");
    findings.push(Violation::CodeBinding {
        path: path.to_string(),
        field: field.name.clone(),
        code: first.code.to_string(),
        value_set: binding.value_set.clone(),
        allowed: allowed.iter().cloned().collect(),
    });
}

fn candidates(value: &Value) -> Vec<Candidate<'_>> {
    match value {
        Value::String(code) => vec![Candidate {
            system: None,
            code: code.as_str(),
        }],
        Value::Record(record) => match record.type_name() {
            "Coding" => coding(record).into_iter().collect(),
            "CodeableConcept" => record.records("coding").filter_map(coding).collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn coding(record: &TypedRecord) -> Option<Candidate<'_>> {
    Some(Candidate {
        system: record.str("system"),
        code: record.str("code")?,
    })
}

fn conforms(candidate: &Candidate<'_>, binding: &ValueSetBinding, allowed: &BTreeSet<String>) -> bool {
    let system_matches = match (candidate.system, binding.code_system.as_deref()) {
        (Some(system), Some(expected)) => system == expected,
        _ => true,
    };
    system_matches && allowed.contains(candidate.code)
}

fn allowed_codes<'b>(
    binding: &'b ValueSetBinding,
    resolver: Option<&dyn ValueSetResolver>,
) -> Option<Cow<'b, BTreeSet<String>>> {
    if binding.has_inline_codes() {
        return Some(Cow::Borrowed(&binding.codes));
    }
    let url = binding.value_set.as_deref()?;
    resolver?.resolve_value_set(url).map(Cow::Owned)
}

fn unresolved(binding: &ValueSetBinding, path: &str, plan: &BindingPlan, findings: &mut Findings) {
    let value_set = binding.value_set.as_deref().unwrap_or("<unnamed>");
    tracing::debug!(path, value_set, "required binding not resolvable, treated as advisory");

    if plan.unresolved == UnresolvedBindings::Advisory {
        findings.advise(
            ValidationIssue::information(
                IssueCode::NotSupported,
                format!("{}: value set {} could not be resolved, binding not checked", path, value_set),
            )
            .with_location(path.to_string()),
        );
    }
}
