//! Message templates and target lists.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Substitute `{{name}}` and `{{name|default}}` placeholders.
///
/// - `{{name}}` with no value is left untouched.
/// - `{{name|default}}` falls back to `default`.
/// - Names and defaults are trimmed.
/// - A placeholder never spans lines.
pub fn render(template: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];

        let Some(end) = after_open.find(CLOSE) else {
            rest = &rest[start..];
            break;
        };
        let inner = &after_open[..end];
        if inner.contains('\n') {
            out.push_str(OPEN);
            rest = after_open;
            continue;
        }

        match inner.split_once('|') {
            Some((name, default)) => {
                let value = vars.get(name.trim()).map(String::as_str);
                out.push_str(value.unwrap_or(default.trim()));
            }
            None => match vars.get(inner.trim()) {
                Some(value) => out.push_str(value),
                None => {
                    out.push_str(OPEN);
                    out.push_str(inner);
                    out.push_str(CLOSE);
                }
            },
        }
        rest = &after_open[end + CLOSE.len()..];
    }

    out.push_str(rest);
    out
}

/// Read a target list: one entry per line, blank lines and `#` comments skipped.
pub fn read_targets(path: &Path) -> io::Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    Ok(parse_targets(&contents))
}

fn parse_targets(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read a message template, trimming surrounding whitespace.
pub fn read_template(path: &Path) -> io::Result<String> {
    Ok(fs::read_to_string(path)?.trim().to_string())
}
