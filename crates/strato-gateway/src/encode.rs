//! Markup encoding boundary
//!
//! Handlers hand back a plain nested tree; this seam turns it into the
//! provider's wire markup. The rendering is generic tree-to-markup and
//! deliberately lives outside the engine so it stays swappable.

use serde_json::Value;
use strato_engine::ApiResponse;

pub trait ResponseEncoder: Send + Sync {
    fn encode(&self, response: &ApiResponse) -> String;
    fn content_type(&self) -> &'static str;
}

/// Renders the tree the way the emulated provider's XML looks: an
/// object becomes child elements, an array repeats its element once per
/// entry (and disappears when empty), null renders as an empty element.
pub struct XmlEncoder;

impl ResponseEncoder for XmlEncoder {
    fn encode(&self, response: &ApiResponse) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        write_element(&mut out, response.root, &response.body);
        out
    }

    fn content_type(&self) -> &'static str {
        "application/xml"
    }
}

fn write_element(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::Null => empty_element(out, name),
        Value::Array(items) => {
            for item in items {
                write_element(out, name, item);
            }
        }
        Value::Object(fields) => {
            if fields.is_empty() {
                empty_element(out, name);
            } else {
                open_tag(out, name);
                for (key, child) in fields {
                    write_element(out, key, child);
                }
                close_tag(out, name);
            }
        }
        Value::String(text) => {
            open_tag(out, name);
            escape_into(out, text);
            close_tag(out, name);
        }
        other => {
            open_tag(out, name);
            out.push_str(&other.to_string());
            close_tag(out, name);
        }
    }
}

fn open_tag(out: &mut String, name: &str) {
    out.push('<');
    out.push_str(name);
    out.push('>');
}

fn close_tag(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn empty_element(out: &mut String, name: &str) {
    out.push('<');
    out.push_str(name);
    out.push_str("/>");
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
