//! Schema-driven FHIR JSON and XML codecs.
//!
//! Both codecs decode wire documents into [`TypedRecord`]s using the record
//! type specs of a [`SchemaRegistry`] and encode records back in declaration
//! order:
//! - Choice fields are resolved through their type suffix (`performedPeriod`).
//! - Primitive values are coerced with the FHIR lexical rules.
//! - Content the schema does not declare is kept as opaque extras and written
//!   back unchanged.
//!
//! ```no_run
//! use ferrum_format::{JsonCodec, WireCodec};
//!
//! let registry = ferrum_schema::r4::registry()?;
//! let codec = JsonCodec::new(registry);
//! let device = codec.decode_str(r#"{"resourceType":"Device","status":"active"}"#)?;
//! assert_eq!(device.str("status"), Some("active"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod codec;
mod error;
mod json;
mod primitive;
mod xml;

pub use codec::{CodecOptions, WireCodec};
pub use error::{FormatError, Result};
pub use json::JsonCodec;
pub use primitive::parse_decimal;
pub use xml::{XmlCodec, FHIR_NS, XHTML_NS};

use ferrum_schema::SchemaRegistry;

/// Convert a FHIR JSON resource into its XML representation.
pub fn json_to_xml(registry: &SchemaRegistry, input: &str) -> Result<String> {
    let record = JsonCodec::new(registry).decode_str(input)?;
    XmlCodec::with_options(registry, CodecOptions::pretty()).encode_string(&record)
}

/// Convert a FHIR XML resource into its JSON representation.
pub fn xml_to_json(registry: &SchemaRegistry, input: &str) -> Result<String> {
    let record = XmlCodec::new(registry).decode_str(input)?;
    JsonCodec::with_options(registry, CodecOptions::pretty()).encode_string(&record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrum_schema::r4;
    use serde_json::Value;

    #[test]
    fn json_to_xml_device() {
        let json = r#"
        {
            "resourceType": "Device",
            "id": "dev-1",
            "status": "active",
            "manufacturer": "Acme",
            "deviceName": [
                { "name": "Pump", "type": "user-friendly-name" }
            ]
        }
        "#;

        let xml = json_to_xml(r4::registry().unwrap(), json).expect("conversion failed");
        assert!(xml.contains("<Device"));
        assert!(xml.contains(r#"<id value="dev-1"/>"#));
        assert!(xml.contains(r#"<status value="active"/>"#));
        assert!(xml.contains(r#"<name value="Pump"/>"#));
    }

    #[test]
    fn xml_to_json_round_trip() {
        let xml = r#"
        <Device xmlns="http://hl7.org/fhir">
            <id value="d1"/>
            <status value="active"/>
            <deviceName>
                <name value="Pump"/>
                <type value="user-friendly-name"/>
            </deviceName>
        </Device>
        "#;

        let json = xml_to_json(r4::registry().unwrap(), xml).expect("xml->json failed");
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["resourceType"], "Device");
        assert_eq!(value["id"], "d1");
        assert_eq!(value["status"], "active");
        assert_eq!(value["deviceName"][0]["name"], "Pump");
    }

    #[test]
    fn primitive_metadata_survives_roundtrip() {
        let registry = r4::registry().unwrap();
        let json = r#"
        {
            "resourceType": "Device",
            "expirationDate": "2030-12-25",
            "_expirationDate": { "id": "exp1" }
        }
        "#;

        let xml = json_to_xml(registry, json).unwrap();
        assert!(xml.contains("<expirationDate"));
        assert!(xml.contains(r#"value="2030-12-25""#));
        assert!(xml.contains(r#"id="exp1""#));

        let back = xml_to_json(registry, &xml).unwrap();
        let val: Value = serde_json::from_str(&back).unwrap();
        assert_eq!(val["expirationDate"], "2030-12-25");
        assert_eq!(val["_expirationDate"]["id"], "exp1");
    }
}
