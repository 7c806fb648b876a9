use ferrum_schema::{
    r4, BindingStrength, Cardinality, Error, FieldKind, Max, PrimitiveType, SchemaRegistry,
    TypeCategory, TypeRef,
};

#[test]
fn bundle_entry_backbones_are_registered() {
    let registry = r4::registry().unwrap();

    let bundle = registry.lookup("Bundle").unwrap();
    assert_eq!(bundle.category(), TypeCategory::Resource);
    assert!(bundle.field("text").is_none());

    let entry = bundle.field("entry").unwrap();
    assert_eq!(entry.kind, FieldKind::Record("Bundle.Entry".into()));
    assert!(entry.is_repeating());

    let entry_spec = registry.lookup("Bundle.Entry").unwrap();
    assert_eq!(entry_spec.category(), TypeCategory::Backbone);
    assert_eq!(entry_spec.field("resource").unwrap().kind, FieldKind::Resource);
    assert_eq!(
        entry_spec.field("link").unwrap().kind,
        FieldKind::Record("Bundle.Link".into())
    );

    let request = registry.lookup("Bundle.Entry.Request").unwrap();
    let method = request.field("method").unwrap();
    assert_eq!(method.path, "Bundle.entry.request.method");
    assert_eq!(method.cardinality, Cardinality::REQUIRED);
}

#[test]
fn bundle_type_has_required_binding() {
    let registry = r4::registry().unwrap();
    let bundle = registry.lookup("Bundle").unwrap();

    let binding = bundle.field("type").unwrap().binding.as_ref().unwrap();
    assert!(binding.is_enforced());
    assert_eq!(binding.allows("searchset"), Some(true));
    assert_eq!(binding.allows("not-a-real-type"), Some(false));
    assert_eq!(binding.codes.len(), 9);
}

#[test]
fn device_status_reason_is_extensible() {
    let registry = r4::registry().unwrap();
    let device = registry.lookup("Device").unwrap();

    let reason = device.field("statusReason").unwrap();
    assert_eq!(reason.cardinality.max, Max::Unbounded);
    let binding = reason.binding.as_ref().unwrap();
    assert_eq!(binding.strength, BindingStrength::Extensible);
    assert!(!binding.is_enforced());
}

#[test]
fn procedure_performed_is_a_choice() {
    let registry = r4::registry().unwrap();
    let procedure = registry.lookup("Procedure").unwrap();

    let performed = procedure.field("performed").unwrap();
    let codes: Vec<&str> = performed.kind.alternatives().iter().map(TypeRef::code).collect();
    assert_eq!(codes, ["dateTime", "Period", "string", "Age", "Range"]);

    let (field, alternative) = procedure.resolve_wire_key("performedAge").unwrap();
    assert_eq!(field.name, "performed");
    assert_eq!(alternative, Some(&TypeRef::Complex("Age".into())));

    let (_, alternative) = procedure.resolve_wire_key("performedDateTime").unwrap();
    assert_eq!(
        alternative,
        Some(&TypeRef::Primitive(PrimitiveType::DateTime))
    );
}

#[test]
fn coverage_eligibility_response_patient_is_required() {
    let registry = r4::registry().unwrap();
    let response = registry.lookup("CoverageEligibilityResponse").unwrap();

    let patient = response.field("patient").unwrap();
    assert!(patient.is_required());
    assert_eq!(patient.kind, FieldKind::Reference(vec!["Patient".into()]));

    let benefit = registry
        .lookup("CoverageEligibilityResponse.Insurance.Item.Benefit")
        .unwrap();
    assert!(benefit.resolve_wire_key("allowedMoney").is_some());
    assert!(benefit.resolve_wire_key("usedUnsignedInt").is_some());
}

#[test]
fn request_group_actions_nest_recursively() {
    let registry = r4::registry().unwrap();
    let action = registry.lookup("RequestGroup.Action").unwrap();

    assert_eq!(
        action.field("action").unwrap().kind,
        FieldKind::Record("RequestGroup.Action".into())
    );
    assert!(registry.contains("RequestGroup.Action.RelatedAction"));
    assert!(action.resolve_wire_key("timingTiming").is_some());
}

#[test]
fn price_component_is_an_ordinary_backbone() {
    let registry = r4::registry().unwrap();
    let component = registry
        .lookup("ChargeItemDefinition.PropertyGroup.PriceComponent")
        .unwrap();

    let names: Vec<&str> = component.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["id", "type", "code", "factor", "amount"]);
}

#[test]
fn extending_the_bundled_registry() {
    let mut registry = r4::build().unwrap();
    let before = registry.len();

    let added = registry
        .load_json(
            r#"{ "name": "Basic", "kind": "resource", "elements": [
                { "name": "code", "card": "1..1", "type": ["CodeableConcept"] },
                { "name": "subject", "card": "0..1", "type": ["Reference"] }
            ] }"#,
        )
        .unwrap();
    assert_eq!(added, 1);
    assert_eq!(registry.len(), before + 1);

    let err = registry
        .load_json(r#"{ "name": "Device", "kind": "resource", "elements": [] }"#)
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateType(name) if name == "Device"));
}

#[test]
fn unknown_types_are_reported() {
    let registry = SchemaRegistry::new();
    assert!(registry.is_empty());
    assert!(matches!(
        registry.lookup("Observation"),
        Err(Error::UnknownType(_))
    ));
}
