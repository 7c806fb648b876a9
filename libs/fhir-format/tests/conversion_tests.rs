use ferrum_format::{json_to_xml, xml_to_json, JsonCodec, WireCodec, XmlCodec};
use ferrum_schema::{r4, SchemaRegistry};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

fn registry() -> &'static SchemaRegistry {
    r4::registry().expect("bundled R4 definitions must load")
}

/// Helper to normalize JSON for comparison (ignoring formatting/whitespace differences)
fn normalize_json(json_str: &str) -> Value {
    serde_json::from_str(json_str).expect("Failed to parse JSON")
}

/// Helper to get test data directory
fn test_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
}

/// Discover all test file base names that have both a JSON and an XML file
fn discover_test_cases() -> Vec<String> {
    let data_dir = test_data_dir();
    let mut test_cases = std::collections::HashSet::new();

    if let Ok(entries) = fs::read_dir(&data_dir) {
        for entry in entries.flatten() {
            if let Some(file_name) = entry.file_name().to_str() {
                if let Some(stem) = file_name.strip_suffix(".json") {
                    if data_dir.join(format!("{}.xml", stem)).exists() {
                        test_cases.insert(stem.to_string());
                    }
                }
            }
        }
    }

    let mut cases: Vec<_> = test_cases.into_iter().collect();
    cases.sort();
    cases
}

fn load_test_files(base_name: &str) -> (String, String) {
    let json_path = test_data_dir().join(format!("{}.json", base_name));
    let xml_path = test_data_dir().join(format!("{}.xml", base_name));

    let json = fs::read_to_string(&json_path)
        .unwrap_or_else(|_| panic!("Failed to read {}", json_path.display()));
    let xml = fs::read_to_string(&xml_path)
        .unwrap_or_else(|_| panic!("Failed to read {}", xml_path.display()));

    (json, xml)
}

#[test]
fn test_data_files_exist() {
    let test_cases = discover_test_cases();
    assert!(
        test_cases.len() >= 3,
        "Expected paired test cases in {}",
        test_data_dir().display()
    );
}

#[test]
fn test_all_json_reencodes_identically() {
    let codec = JsonCodec::new(registry());

    for base_name in discover_test_cases() {
        let (json, _xml) = load_test_files(&base_name);
        let record = codec
            .decode_str(&json)
            .unwrap_or_else(|e| panic!("{}: JSON decode failed: {}", base_name, e));
        let encoded = codec
            .encode_string(&record)
            .unwrap_or_else(|e| panic!("{}: JSON encode failed: {}", base_name, e));

        // Fixtures are written in declaration order, so the compact forms match
        let expected = serde_json::to_string(&normalize_json(&json)).unwrap();
        assert_eq!(encoded, expected, "{}: re-encoded JSON differs", base_name);
    }
}

#[test]
fn test_all_formats_decode_to_the_same_record() {
    let json_codec = JsonCodec::new(registry());
    let xml_codec = XmlCodec::new(registry());

    for base_name in discover_test_cases() {
        let (json, xml) = load_test_files(&base_name);
        let from_json = json_codec
            .decode_str(&json)
            .unwrap_or_else(|e| panic!("{}: JSON decode failed: {}", base_name, e));
        let from_xml = xml_codec
            .decode_str(&xml)
            .unwrap_or_else(|e| panic!("{}: XML decode failed: {}", base_name, e));
        assert_eq!(from_json, from_xml, "{}: records differ", base_name);
    }
}

#[test]
fn test_all_xml_converts_to_paired_json() {
    for base_name in discover_test_cases() {
        let (json, xml) = load_test_files(&base_name);
        let result_json = xml_to_json(registry(), &xml)
            .unwrap_or_else(|e| panic!("{}: XML to JSON conversion failed: {}", base_name, e));

        assert_eq!(
            normalize_json(&result_json),
            normalize_json(&json),
            "{}: converted JSON differs",
            base_name
        );
    }
}

#[test]
fn test_all_round_trip_json_xml_json() {
    for base_name in discover_test_cases() {
        let (json, _xml) = load_test_files(&base_name);

        let xml = json_to_xml(registry(), &json)
            .unwrap_or_else(|e| panic!("{}: JSON to XML conversion failed: {}", base_name, e));
        roxmltree::Document::parse(&xml)
            .unwrap_or_else(|e| panic!("{}: Generated XML is not valid: {}", base_name, e));

        let result_json = xml_to_json(registry(), &xml)
            .unwrap_or_else(|e| panic!("{}: XML to JSON conversion failed: {}", base_name, e));

        assert_eq!(
            normalize_json(&result_json),
            normalize_json(&json),
            "{}: round trip changed the resource",
            base_name
        );
    }
}

#[test]
fn test_all_round_trip_xml_json_xml() {
    let xml_codec = XmlCodec::new(registry());

    for base_name in discover_test_cases() {
        let (_json, xml) = load_test_files(&base_name);
        let original = xml_codec.decode_str(&xml).unwrap();

        let json = xml_to_json(registry(), &xml)
            .unwrap_or_else(|e| panic!("{}: XML to JSON conversion failed: {}", base_name, e));
        let result_xml = json_to_xml(registry(), &json)
            .unwrap_or_else(|e| panic!("{}: JSON to XML conversion failed: {}", base_name, e));

        let round_trip = xml_codec
            .decode_str(&result_xml)
            .unwrap_or_else(|e| panic!("{}: Result XML decode failed: {}", base_name, e));
        assert_eq!(original, round_trip, "{}: round trip changed the resource", base_name);
    }
}

#[test]
fn test_all_preserve_extensions() {
    let mut tested_count = 0;

    for base_name in discover_test_cases() {
        let (json, _xml) = load_test_files(&base_name);
        let original = normalize_json(&json);

        let has_extensions = original
            .as_object()
            .map(|obj| obj.keys().any(|k| k.starts_with('_') || k == "extension"))
            .unwrap_or(false);
        if !has_extensions {
            continue;
        }
        tested_count += 1;

        let xml = json_to_xml(registry(), &json)
            .unwrap_or_else(|e| panic!("{}: JSON to XML conversion failed: {}", base_name, e));
        assert!(
            xml.contains("<extension url="),
            "{}: XML should contain extension elements",
            base_name
        );

        let round_trip = normalize_json(&xml_to_json(registry(), &xml).unwrap());
        for (key, value) in original.as_object().into_iter().flatten() {
            if key.starts_with('_') || key == "extension" {
                assert_eq!(round_trip.get(key), Some(value), "{}: {} lost", base_name, key);
            }
        }
    }

    assert!(tested_count > 0, "No test cases with extensions were found");
}

#[test]
fn test_all_preserve_contained_resources() {
    let mut tested_count = 0;

    for base_name in discover_test_cases() {
        let (json, _xml) = load_test_files(&base_name);
        let original = normalize_json(&json);
        let Some(contained) = original.get("contained") else {
            continue;
        };
        tested_count += 1;

        let xml = json_to_xml(registry(), &json).unwrap();
        assert!(
            xml.contains("<contained>"),
            "{}: XML should contain contained elements",
            base_name
        );

        let round_trip = normalize_json(&xml_to_json(registry(), &xml).unwrap());
        assert_eq!(round_trip.get("contained"), Some(contained), "{}", base_name);
    }

    assert!(tested_count > 0, "No test cases with contained resources were found");
}
