//! Per-field checks run by the validator for each step of the plan

pub(crate) mod bindings;
pub(crate) mod cardinality;

/// Location of a field, indexed when the field repeats
pub(crate) fn field_path(parent: &str, name: &str, index: Option<usize>) -> String {
    match index {
        Some(index) => format!("{}.{}[{}]", parent, name, index),
        None => format!("{}.{}", parent, name),
    }
}
