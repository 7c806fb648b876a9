use super::field_path;
use crate::validator::Findings;
use crate::violation::Violation;
use ferrum_models::{TypedRecord, Value};
use ferrum_schema::{FieldKind, FieldSpec, TypeRef};
use serde_json::Value as JsonValue;

pub(crate) fn check_field(
    record: &TypedRecord,
    field: &FieldSpec,
    values: &[Value],
    path: &str,
    findings: &mut Findings,
) {
    let count = occurrences(record, field, values);
    if field.cardinality.admits(count) {
        return;
    }

    tracing::trace!(
        path,
        field = %field.name,
        cardinality = %field.cardinality,
        count,
        "cardinality violated"
    );
    findings.push(Violation::Cardinality {
        path: field_path(path, &field.name, None),
        field: field.name.clone(),
        min: field.cardinality.min,
        max: field.cardinality.max,
        count,
    });
}

/// Values of a field plus primitives present only through `_field` metadata
fn occurrences(record: &TypedRecord, field: &FieldSpec, values: &[Value]) -> usize {
    let metadata = |wire_key: String| metadata_entries(record.extra(&format!("_{}", wire_key)));
    let metadata_only = match &field.kind {
        FieldKind::Primitive(_) => metadata(field.wire_key(None)),
        FieldKind::Choice(alternatives) => alternatives
            .iter()
            .filter(|alt| matches!(alt, TypeRef::Primitive(_)))
            .map(|alt| metadata(field.wire_key(Some(alt))))
            .sum(),
        _ => 0,
    };
    values.len().max(metadata_only)
}

fn metadata_entries(metadata: Option<&JsonValue>) -> usize {
    match metadata {
        None | Some(JsonValue::Null) => 0,
        Some(JsonValue::Array(entries)) => entries.iter().filter(|entry| !entry.is_null()).count(),
        Some(_) => 1,
    }
}
