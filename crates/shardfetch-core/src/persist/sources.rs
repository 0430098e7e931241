//! Multi-file source payloads.
//!
//! The provider returns multi-file contracts as standard compiler JSON wrapped
//! in an extra pair of braces (`{{ "language": ..., "sources": {...} }}`), or
//! occasionally as a bare `{ "path": {"content": ...} }` map. Single-file
//! sources are plain text and have nothing to unpack.

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
struct SourceFile {
    content: String,
}

#[derive(Debug, Deserialize)]
struct StandardJson {
    sources: BTreeMap<String, SourceFile>,
}

/// Strips one outer brace pair from `{{...}}`; other input is returned trimmed.
pub fn unwrap_double_braces(source: &str) -> &str {
    let s = source.trim();
    if s.len() >= 4 && s.starts_with("{{") && s.ends_with("}}") {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Path → content for every file in a multi-file payload, or `None` when the
/// source is a single file (or not parseable as either JSON layout).
pub fn parse_sources(source_code: &str) -> Option<BTreeMap<String, String>> {
    let json = unwrap_double_braces(source_code);
    if !json.starts_with('{') {
        return None;
    }
    let files = match serde_json::from_str::<StandardJson>(json) {
        Ok(standard) => standard.sources,
        Err(_) => serde_json::from_str::<BTreeMap<String, SourceFile>>(json).ok()?,
    };
    Some(files.into_iter().map(|(path, f)| (path, f.content)).collect())
}
