//! TSV flattening of result documents.
//!
//! A generated program prints one nested JSON document per run. Collecting
//! many runs into a table means flattening each document to `a::b::c` keys
//! (document order, which `preserve_order` keeps) and writing one row per run
//! under a header taken from the first document.

use std::io::Write;
use std::path::Path;

use serde_json::Value;

/// Parse a document printed by a generated program.
pub fn parse_document(text: &str) -> Result<Value, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| format!("invalid JSON output: {}", e))?;
    if !value.is_object() {
        return Err("result document is not a JSON object".to_string());
    }
    Ok(value)
}

/// Flatten nested objects to `outer::inner` keys, in document order.
/// Non-object values (lists included) are leaves.
pub fn flatten(value: &Value) -> Vec<(String, Value)> {
    let mut pairs = Vec::new();
    let Value::Object(map) = value else {
        return pairs;
    };
    for (key, value) in map {
        if value.is_object() {
            for (inner, leaf) in flatten(value) {
                pairs.push((format!("{}::{}", key.trim(), inner.trim()), leaf));
            }
        } else {
            pairs.push((key.clone(), value.clone()));
        }
    }
    pairs
}

/// A one-element list stands for its element.
pub fn unwrap_single(value: Value) -> Value {
    match value {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    }
}

/// Row label for a run directory: its file name up to the first `.`.
pub fn benchmark_name(dir: &str) -> String {
    let path = Path::new(dir.trim());
    let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    name.split('.').next().unwrap_or_default().to_string()
}

/// Text of a value the way the evaluating runtime prints it.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => repr(other),
    }
}

fn repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        Value::Number(n) => match n.as_i64().map(|i| i.to_string()).or_else(|| n.as_u64().map(|u| u.to_string())) {
            Some(int) => int,
            None => float_repr(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => string_repr(s),
        Value::Array(items) => format!("[{}]", items.iter().map(repr).collect::<Vec<_>>().join(", ")),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter().map(|(k, v)| format!("{}: {}", string_repr(k), repr(v))).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn float_repr(f: f64) -> String {
    if !f.is_finite() {
        return if f.is_nan() { "nan".into() } else if f > 0.0 { "inf".into() } else { "-inf".into() };
    }
    let abs = f.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let text = format!("{:e}", f);
        let Some((mantissa, exponent)) = text.split_once('e') else {
            return text;
        };
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(digits) => ('-', digits),
            None => ('+', exponent),
        };
        return format!("{}e{}{:0>2}", mantissa, sign, digits);
    }
    if f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

fn string_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Writes one TSV row per document; the first document fixes the header.
pub struct TsvWriter<W: Write> {
    writer: csv::Writer<W>,
    wrote_header: bool,
}

impl<W: Write> TsvWriter<W> {
    pub fn new(out: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .flexible(true)
            .from_writer(out);
        Self { writer, wrote_header: false }
    }

    pub fn write_document(&mut self, benchmark: &str, document: &Value) -> Result<(), String> {
        let pairs = flatten(document);
        if !self.wrote_header {
            let header = std::iter::once("Benchmark").chain(pairs.iter().map(|(k, _)| k.as_str()));
            self.writer.write_record(header).map_err(|e| format!("Failed to write header: {}", e))?;
            self.wrote_header = true;
        }
        let mut row = vec![benchmark.to_string()];
        row.extend(pairs.into_iter().map(|(_, v)| cell_text(&unwrap_single(v))));
        self.writer
            .write_record(&row)
            .map_err(|e| format!("Failed to write row for '{}': {}", benchmark, e))?;
        self.writer.flush().map_err(|e| format!("Failed to flush: {}", e))
    }

    pub fn into_inner(self) -> Result<W, String> {
        self.writer.into_inner().map_err(|e| format!("Failed to finish output: {}", e))
    }
}
