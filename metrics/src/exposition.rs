//! Prometheus text format writer.

use std::borrow::Cow;
use std::fmt::Write;

/// Content type of [`crate::Metrics::snapshot`] output.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub(crate) fn write_header(out: &mut String, name: &str, help: &str, kind: &str) {
    let name = sanitize_metric_name(name);
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} {kind}");
}

/// Write one sample line. `le` is appended as the final label for histogram buckets.
pub(crate) fn write_sample(
    out: &mut String,
    name: &str,
    labels: &[(&str, &str)],
    le: Option<&str>,
    value: &str,
) {
    out.push_str(&sanitize_metric_name(name));
    if !labels.is_empty() || le.is_some() {
        out.push('{');
        let mut first = true;
        let extra = le.map(|le| ("le", le));
        for (key, val) in labels.iter().copied().chain(extra) {
            if !first {
                out.push(',');
            }
            first = false;
            let _ = write!(out, "{}=\"{}\"", sanitize_metric_name(key), escape_label_value(val));
        }
        out.push('}');
    }
    out.push(' ');
    out.push_str(value);
    out.push('\n');
}

fn sanitize_metric_name(name: &str) -> Cow<'_, str> {
    if name
        .chars()
        .all(|ch| matches!(ch, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | ':'))
    {
        return Cow::Borrowed(name);
    }
    Cow::Owned(
        name.chars()
            .map(|ch| match ch {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | ':' => ch,
                _ => '_',
            })
            .collect(),
    )
}

fn escape_label_value(value: &str) -> Cow<'_, str> {
    if !value.contains(['\\', '"', '\n']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 4);
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}
