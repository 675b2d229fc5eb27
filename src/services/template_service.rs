use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use tera::{Context, Tera};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Name under which the request template is registered with Tera
const TEMPLATE_NAME: &str = "document";

/// Local file header signature that opens every zip container, ODF packages included
const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

/// ODF package parts that carry template markup
const ODF_TEMPLATE_PARTS: &[&str] = &["content.xml", "styles.xml"];

/// Error type for template rendering
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The template itself is unusable (not UTF-8, syntax error)
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// Rendering a well-formed template failed
    #[error("Rendering failed: {0}")]
    Engine(String),
}

/// A templating engine that merges a context into template bytes
pub trait RenderEngine: Send + Sync {
    fn render(&self, template: &[u8], context: &Map<String, Value>)
        -> Result<Vec<u8>, RenderError>;
}

/// Tera-backed render engine (Jinja2-style `{{ var }}`, loops and conditionals)
#[derive(Debug, Default, Clone, Copy)]
pub struct TeraEngine;

impl TeraEngine {
    pub fn new() -> Self {
        Self
    }

    /// Register custom Tera filters
    fn register_filters(tera: &mut Tera) {
        // truncate filter with custom length
        tera.register_filter(
            "truncate",
            |value: &tera::Value, args: &HashMap<String, tera::Value>| {
                let s = tera::try_get_value!("truncate", "value", String, value);
                let len = args.get("length").and_then(|v| v.as_u64()).unwrap_or(50) as usize;

                if s.chars().count() <= len {
                    Ok(tera::Value::String(s))
                } else {
                    let truncated =
                        s.chars().take(len.saturating_sub(3)).collect::<String>() + "...";
                    Ok(tera::Value::String(truncated))
                }
            },
        );

        // format_time filter for unix timestamps
        tera.register_filter(
            "format_time",
            |value: &tera::Value, args: &HashMap<String, tera::Value>| {
                let ts = tera::try_get_value!("format_time", "value", i64, value);
                let fmt = args
                    .get("format")
                    .and_then(|v| v.as_str())
                    .unwrap_or("%Y-%m-%d %H:%M");

                use chrono::{TimeZone, Utc};
                if let Some(dt) = Utc.timestamp_opt(ts, 0).single() {
                    Ok(tera::Value::String(dt.format(fmt).to_string()))
                } else {
                    Ok(tera::Value::String("--".to_string()))
                }
            },
        );
    }
}

impl RenderEngine for TeraEngine {
    fn render(
        &self,
        template: &[u8],
        context: &Map<String, Value>,
    ) -> Result<Vec<u8>, RenderError> {
        let context = Context::from_value(Value::Object(context.clone()))
            .map_err(|e| RenderError::Engine(error_chain(&e)))?;

        if template.starts_with(ZIP_SIGNATURE) {
            return render_package(template, &context);
        }

        let source = std::str::from_utf8(template)
            .map_err(|e| RenderError::InvalidTemplate(format!("template is not UTF-8: {e}")))?;
        render_markup(source, &context).map(String::into_bytes)
    }
}

/// Render one piece of markup with a fresh Tera instance
fn render_markup(source: &str, context: &Context) -> Result<String, RenderError> {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    TeraEngine::register_filters(&mut tera);
    tera.add_raw_template(TEMPLATE_NAME, source)
        .map_err(|e| RenderError::InvalidTemplate(error_chain(&e)))?;

    tera.render(TEMPLATE_NAME, context)
        .map_err(|e| RenderError::Engine(error_chain(&e)))
}

/// Render the markup parts of an ODF package.
///
/// Every other entry is copied with its original name, order and compression
/// method, so the `mimetype` entry stays first and stored. A package whose
/// parts render to themselves is returned byte for byte.
fn render_package(template: &[u8], context: &Context) -> Result<Vec<u8>, RenderError> {
    let broken = |e: ZipError| RenderError::InvalidTemplate(format!("broken document package: {e}"));
    let repack = |e: ZipError| RenderError::Engine(format!("failed to write document package: {e}"));

    let mut archive = ZipArchive::new(Cursor::new(template)).map_err(broken)?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut changed = false;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(broken)?;
        let name = entry.name().to_string();
        let options = SimpleFileOptions::default().compression_method(entry.compression());

        if entry.is_dir() {
            writer
                .add_directory(name.as_str(), options)
                .map_err(repack)?;
            continue;
        }

        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|e| broken(e.into()))?;

        let part = if ODF_TEMPLATE_PARTS.contains(&name.as_str()) {
            let source = std::str::from_utf8(&data).map_err(|e| {
                RenderError::InvalidTemplate(format!("{name} is not UTF-8: {e}"))
            })?;
            let rendered = render_markup(source, context)?;
            changed |= rendered.as_bytes() != data.as_slice();
            rendered.into_bytes()
        } else {
            data
        };

        writer.start_file(name.as_str(), options).map_err(repack)?;
        writer.write_all(&part).map_err(|e| repack(e.into()))?;
    }

    if !changed {
        return Ok(template.to_vec());
    }

    let package = writer.finish().map_err(repack)?;
    Ok(package.into_inner())
}

/// Tera wraps the useful message in the error source chain
fn error_chain(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
