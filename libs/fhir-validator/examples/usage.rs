use ferrum_format::{JsonCodec, WireCodec};
use ferrum_validator::*;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let registry = ferrum_schema::r4::registry()?;

    // Example 1: Using presets
    let ingestion_cfg = ValidatorConfig::preset(Preset::Ingestion);
    let plan = ingestion_cfg.compile()?;
    println!("Ingestion plan has {} steps", plan.steps.len());

    // Example 2: Builder pattern
    let custom_cfg = ValidatorConfig::builder()
        .preset(Preset::Server)
        .unresolved_bindings(UnresolvedBindings::Advisory)
        .max_violations(500)
        .build();

    let plan = custom_cfg.compile()?;
    println!("Custom plan has {} steps", plan.steps.len());

    // Example 3: YAML configuration
    let yaml = r#"
cardinality:
  enabled: true
bindings:
  enabled: true
  unresolved: ignore
max_violations: 1000
recurse_resources: true
"#;

    let cfg = ValidatorConfig::from_yaml(yaml)?;
    let validator = Validator::from_config(registry, &cfg)?;

    // Example 4: Validating a decoded resource
    let bundle = JsonCodec::new(registry).decode_str(
        r#"{"resourceType":"Bundle","type":"transaction","entry":[{"request":{"method":"FETCH"}}]}"#,
    )?;
    for violation in validator.validate(&bundle)? {
        println!("{}", violation);
    }
    let outcome = validator.outcome(&bundle)?;
    println!("{}", serde_json::to_string_pretty(&outcome.to_operation_outcome())?);

    // Example 5: Error handling
    let invalid_cfg = ValidatorConfig::builder()
        .cardinality(false)
        .bindings(false)
        .build();

    match invalid_cfg.compile() {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Caught expected error: {}", e),
    }

    // Example 6: Export to YAML
    let cfg = ValidatorConfig::preset(Preset::Authoring);
    let yaml_output = cfg.to_yaml()?;
    println!("\nAuthoring preset as YAML:\n{}", yaml_output);

    Ok(())
}
