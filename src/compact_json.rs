//! A JSON pretty-printer that keeps small byte-span objects on one line.
//!
//! WebKit's media-source manifests are written as
//!
//! ```text
//! {
//!     "init": { "offset": 0, "size": 1270 },
//!     "media": [
//!         { "offset": 1270, "size": 4096, "timestamp": 0.0, "duration": 2.0 }
//!     ]
//! }
//! ```
//!
//! Which objects collapse onto a single line is decided by a predicate, see
//! [`is_compact_object`]. Scalars are spelled exactly like the checked-in
//! fixtures spell them: ASCII-only strings and floats that always show a
//! fractional part or a signed two-digit exponent.

use std::fmt::Write;

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::Result;

pub const DEFAULT_INDENT: &str = "    ";

/// Objects describing a byte span are printed on a single line
#[must_use]
pub fn is_compact_object(object: &Map<String, Value>) -> bool {
    object.contains_key("offset")
}

/// Renders `value`, putting every object accepted by `is_compact` on one line
/// and every other container over several lines indented by `indent`.
///
/// The output has no trailing newline.
pub fn render<F>(value: &Value, indent: &str, is_compact: F) -> String
where
    F: Fn(&Map<String, Value>) -> bool,
{
    let mut out = String::new();
    render_block(&mut out, value, indent, 0, &is_compact);
    out
}

/// Serializes `manifest` and renders it with [`is_compact_object`]
///
/// # Errors
/// Errors if `manifest` cannot be represented as JSON
pub fn to_manifest_string(manifest: &impl Serialize, indent: &str) -> Result<String> {
    let value = serde_json::to_value(manifest)?;
    Ok(render(&value, indent, is_compact_object))
}

fn render_block<F>(out: &mut String, value: &Value, indent: &str, level: usize, is_compact: &F)
where
    F: Fn(&Map<String, Value>) -> bool,
{
    let (open, close) = match value {
        Value::Object(object) if is_compact(object) => {
            let mut inline = String::new();
            write_inline(&mut inline, value);
            // `{"offset": 0}` becomes `{ "offset": 0 }`
            out.push_str("{ ");
            out.push_str(&inline[1..inline.len() - 1]);
            out.push_str(" }");
            return;
        }
        Value::Object(_) => ('{', '}'),
        Value::Array(_) => ('[', ']'),
        scalar => return write_inline(out, scalar),
    };

    out.push(open);
    let item_prefix = indent.repeat(level + 1);
    let mut first = true;
    let mut next_item = |out: &mut String| {
        out.push_str(if first { "\n" } else { ",\n" });
        out.push_str(&item_prefix);
        first = false;
    };

    match value {
        Value::Object(object) => {
            for (key, child) in object {
                next_item(out);
                write_string(out, key);
                out.push_str(": ");
                render_block(out, child, indent, level + 1, is_compact);
            }
        }
        Value::Array(items) => {
            for child in items {
                next_item(out);
                render_block(out, child, indent, level + 1, is_compact);
            }
        }
        _ => unreachable!("scalars are rendered above"),
    }

    out.push('\n');
    out.push_str(&indent.repeat(level));
    out.push(close);
}

/// Single-line encoding with `, ` and `: ` separators
fn write_inline(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_inline(out, item);
            }
            out.push(']');
        }
        Value::Object(object) => {
            out.push('{');
            for (i, (key, item)) in object.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_string(out, key);
                out.push_str(": ");
                write_inline(out, item);
            }
            out.push('}');
        }
    }
}

fn write_number(out: &mut String, n: &Number) {
    if n.is_f64() {
        // serde_json numbers are always finite
        out.push_str(&float_repr(n.as_f64().unwrap_or_default()));
    } else {
        out.push_str(&n.to_string());
    }
}

/// Shortest round-trip representation of `x`, always with a `.0` on integral
/// values, and in exponent form (`1e+16`, `1.5e-07`) below 1e-4 or from 1e16 up.
fn float_repr(x: f64) -> String {
    let sci = format!("{x:e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or_default();
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(m) => ("-", m),
        None => ("", mantissa),
    };
    let digits = mantissa.replace('.', "");
    // Position of the decimal point relative to the start of `digits`
    let point = exponent + 1;

    let mut out = String::from(sign);
    if point > -4 && point <= 16 {
        if point <= 0 {
            out.push_str("0.");
            out.push_str(&"0".repeat(point.unsigned_abs() as usize));
            out.push_str(&digits);
        } else {
            let point = point.unsigned_abs() as usize;
            if point >= digits.len() {
                out.push_str(&digits);
                out.push_str(&"0".repeat(point - digits.len()));
                out.push_str(".0");
            } else {
                out.push_str(&digits[..point]);
                out.push('.');
                out.push_str(&digits[point..]);
            }
        }
    } else {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        let _ = write!(out, "e{exp_sign}{:02}", exponent.unsigned_abs());
    }
    out
}

/// JSON string made of printable ASCII only, anything else becomes `\uXXXX` escapes
fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if !(' '..='~').contains(&c) => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
