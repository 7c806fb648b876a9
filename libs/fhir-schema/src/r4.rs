//! Bundled FHIR R4 record types
//!
//! The definitions are compiled into the binary and loaded into a shared
//! registry on first use.

use crate::error::Result;
use crate::registry::SchemaRegistry;
use once_cell::sync::OnceCell;

static REGISTRY: OnceCell<SchemaRegistry> = OnceCell::new();

const DEFINITIONS: &[(&str, &str)] = &[
    ("datatypes", include_str!("../definitions/r4/datatypes.json")),
    ("Bundle", include_str!("../definitions/r4/bundle.json")),
    (
        "ChargeItemDefinition",
        include_str!("../definitions/r4/chargeitemdefinition.json"),
    ),
    (
        "CoverageEligibilityResponse",
        include_str!("../definitions/r4/coverageeligibilityresponse.json"),
    ),
    ("Device", include_str!("../definitions/r4/device.json")),
    (
        "DeviceDefinition",
        include_str!("../definitions/r4/devicedefinition.json"),
    ),
    (
        "ImmunizationEvaluation",
        include_str!("../definitions/r4/immunizationevaluation.json"),
    ),
    ("Procedure", include_str!("../definitions/r4/procedure.json")),
    ("RequestGroup", include_str!("../definitions/r4/requestgroup.json")),
];

/// Shared registry holding the bundled R4 resources and datatypes
pub fn registry() -> Result<&'static SchemaRegistry> {
    REGISTRY.get_or_try_init(build)
}

/// Build a fresh registry from the bundled definitions.
///
/// Useful as a starting point when additional types should be registered
/// next to the bundled ones.
pub fn build() -> Result<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    for (source, definitions) in DEFINITIONS {
        let loaded = registry.load_json(definitions)?;
        tracing::trace!(source, loaded, "loaded R4 definitions");
    }
    registry.verify()?;

    tracing::debug!(types = registry.len(), "built R4 schema registry");
    Ok(registry)
}
