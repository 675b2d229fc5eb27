//! Test fixtures and constants.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Public base URL the test app hands out
pub const PUBLIC_BASE_URL: &str = "http://files.test/docs/";

/// base64 of `Hello {{name}}`
pub const HELLO_TEMPLATE_B64: &str = "SGVsbG8ge3tuYW1lfX0=";

/// A small ODF-like XML fragment with placeholders
pub const LETTER_TEMPLATE: &str = r#"<office:text><text:p>Dear {{ customer.name }},</text:p>{% for line in lines %}<text:p>{{ line }}</text:p>{% endfor %}</office:text>"#;

/// Encode template text the way callers send inline templates
pub fn encode(template: &str) -> String {
    STANDARD.encode(template.as_bytes())
}

/// Build a request body with an inline template and context
pub fn inline_body(template: &str, context: serde_json::Value) -> String {
    serde_json::json!({
        "template": encode(template),
        "context": context,
    })
    .to_string()
}

/// Build a request body with inline binary template bytes
pub fn inline_bytes_body(template: &[u8], context: serde_json::Value) -> String {
    serde_json::json!({
        "template": STANDARD.encode(template),
        "context": context,
    })
    .to_string()
}

/// Minimal ODF text package with the given `content.xml`
pub fn odt_template(content_xml: &str) -> Vec<u8> {
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file("mimetype", stored).unwrap();
    writer
        .write_all(b"application/vnd.oasis.opendocument.text")
        .unwrap();
    writer.start_file("META-INF/manifest.xml", deflated).unwrap();
    writer
        .write_all(b"<manifest:manifest manifest:version=\"1.2\"/>")
        .unwrap();
    writer.start_file("content.xml", deflated).unwrap();
    writer.write_all(content_xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

/// Read one entry out of a stored ODF package
pub fn odt_entry(package: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(package)).expect("not a zip package");
    let mut entry = archive.by_name(name).expect("entry missing");
    let mut data = String::new();
    entry.read_to_string(&mut data).unwrap();
    data
}

/// Build a request body referencing a template URL
pub fn url_body(url: &str, context: serde_json::Value) -> String {
    serde_json::json!({
        "template": url,
        "context": context,
    })
    .to_string()
}
