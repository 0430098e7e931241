//! Path sanitization for record files and extracted sources.

use std::path::PathBuf;

const NAME_MAX: usize = 255;

/// Sanitizes one path component for safe use on Linux.
///
/// - Replaces NUL, `/`, `\`, whitespace and control characters with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing dots and underscores
/// - Limits length to 255 bytes (Linux NAME_MAX)
pub fn sanitize_component(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let bad = c == '\0' || c == '/' || c == '\\' || c.is_control() || c.is_whitespace();
        if bad || c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut take = trimmed.len().min(NAME_MAX);
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}

/// File name of the record for `address`: `<address>.json`.
pub fn record_file_name(address: &str) -> String {
    let stem = sanitize_component(address);
    if stem.is_empty() {
        "_.json".to_string()
    } else {
        format!("{stem}.json")
    }
}

/// Turns a provider-supplied source path into a relative path that cannot
/// escape the extraction root. `None` when nothing usable remains.
pub fn relative_source_path(path: &str) -> Option<PathBuf> {
    let parts: Vec<String> = path
        .split(['/', '\\'])
        .filter(|p| !p.is_empty() && *p != "." && *p != "..")
        .map(sanitize_component)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn record_name_from_address() {
        assert_eq!(record_file_name("0xAbC"), "0xAbC.json");
        assert_eq!(record_file_name("a/b"), "a_b.json");
        assert_eq!(record_file_name(".."), "_.json");
    }

    #[test]
    fn component_rules() {
        assert_eq!(sanitize_component("  ..  file.sol  .. "), "file.sol");
        assert_eq!(sanitize_component("a___b"), "a_b");
        assert_eq!(sanitize_component("x\x00y"), "x_y");
    }

    #[test]
    fn long_component_is_truncated_on_char_boundary() {
        let name = "é".repeat(200);
        let out = sanitize_component(&name);
        assert!(out.len() <= NAME_MAX);
        assert!(out.chars().all(|c| c == 'é'));
    }

    #[test]
    fn source_paths_stay_inside_root() {
        assert_eq!(
            relative_source_path("@openzeppelin/contracts/token/ERC20.sol").as_deref(),
            Some(Path::new("@openzeppelin/contracts/token/ERC20.sol"))
        );
        assert_eq!(
            relative_source_path("../../etc/passwd").as_deref(),
            Some(Path::new("etc/passwd"))
        );
        assert_eq!(
            relative_source_path("/abs/./A.sol").as_deref(),
            Some(Path::new("abs/A.sol"))
        );
        assert_eq!(relative_source_path("../.."), None);
    }
}
