use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ferrum_format::{JsonCodec, WireCodec, XmlCodec};
use ferrum_schema::r4;

const PROCEDURE_JSON: &str = include_str!("../tests/data/procedure-performed-period.json");
const DEVICE_XML: &str = include_str!("../tests/data/device-vendor-field.xml");

fn bench_json(c: &mut Criterion) {
    let registry = r4::registry().expect("bundled R4 definitions must load");
    let codec = JsonCodec::new(registry);
    let record = codec.decode_str(PROCEDURE_JSON).expect("fixture must decode");

    c.bench_function("json_decode_procedure", |b| {
        b.iter(|| codec.decode_str(black_box(PROCEDURE_JSON)))
    });
    c.bench_function("json_encode_procedure", |b| {
        b.iter(|| codec.encode_string(black_box(&record)))
    });
}

fn bench_xml(c: &mut Criterion) {
    let registry = r4::registry().expect("bundled R4 definitions must load");
    let codec = XmlCodec::new(registry);
    let record = codec.decode_str(DEVICE_XML).expect("fixture must decode");

    c.bench_function("xml_decode_device", |b| {
        b.iter(|| codec.decode_str(black_box(DEVICE_XML)))
    });
    c.bench_function("xml_encode_device", |b| {
        b.iter(|| codec.encode_string(black_box(&record)))
    });
}

criterion_group!(benches, bench_json, bench_xml);
criterion_main!(benches);
