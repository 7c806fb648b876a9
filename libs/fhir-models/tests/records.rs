use ferrum_models::{Error, TypedRecord, Value};
use ferrum_schema::r4;
use quickcheck::{quickcheck, TestResult};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

fn hash_of(record: &TypedRecord) -> u64 {
    let mut hasher = DefaultHasher::new();
    record.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn builds_bundle_against_r4_specs() {
    let registry = r4::registry().unwrap();
    let bundle = registry.lookup("Bundle").unwrap();
    let entry = registry.lookup("Bundle.Entry").unwrap();
    let device = registry.lookup("Device").unwrap();

    let device = TypedRecord::builder(&device)
        .set("status", "active")
        .extra("customVendorField", json!("x"))
        .build()
        .unwrap();
    let entry = TypedRecord::builder(&entry)
        .set("fullUrl", "urn:uuid:1")
        .set("resource", device)
        .build()
        .unwrap();
    let bundle = TypedRecord::builder(&bundle)
        .set("type", "searchset")
        .push("entry", entry)
        .build()
        .unwrap();

    assert_eq!(bundle.count("entry"), 1);
    let entry = bundle.record("entry").unwrap();
    assert_eq!(entry.str("fullUrl"), Some("urn:uuid:1"));
    let device = entry.record("resource").unwrap();
    assert_eq!(device.type_name(), "Device");
    assert_eq!(device.str("status"), Some("active"));
}

#[test]
fn builder_rejects_wrong_record_type() {
    let registry = r4::registry().unwrap();
    let procedure = registry.lookup("Procedure").unwrap();

    let err = TypedRecord::builder(&procedure)
        .choice("performed", "Period", TypedRecord::new("Range"))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidFieldValue { path, .. } if path == "Procedure.performed[x]"));
}

#[test]
fn records_work_as_set_members() {
    let mut first = TypedRecord::new("Money");
    first.set("value", Decimal::from_str("10.50").unwrap());
    first.set("currency", "EUR");

    let mut second = TypedRecord::new("Money");
    second.set("currency", "EUR");
    second.set("value", Decimal::from_str("10.50").unwrap());

    let mut set = HashSet::new();
    set.insert(first);
    assert!(!set.insert(second));
    assert_eq!(set.len(), 1);
}

quickcheck! {
    fn field_insertion_order_does_not_matter(pairs: Vec<(String, String)>) -> TestResult {
        let keys: HashSet<&String> = pairs.iter().map(|(k, _)| k).collect();
        if keys.len() != pairs.len() {
            return TestResult::discard();
        }

        let mut forward = TypedRecord::new("Basic");
        for (key, value) in &pairs {
            forward.set(key.clone(), value.as_str());
            forward.set_extra(format!("_{}", key), json!({ "id": value }));
        }
        let mut backward = TypedRecord::new("Basic");
        for (key, value) in pairs.iter().rev() {
            backward.set_extra(format!("_{}", key), json!({ "id": value }));
            backward.set(key.clone(), value.as_str());
        }

        TestResult::from_bool(forward == backward && hash_of(&forward) == hash_of(&backward))
    }

    fn set_replaces_all_occurrences(values: Vec<i64>, last: i64) -> bool {
        let mut record = TypedRecord::new("Timing.Repeat");
        for value in &values {
            record.push("count", *value);
        }
        record.set("count", last);
        record.get("count") == [Value::Integer(last)]
    }
}
