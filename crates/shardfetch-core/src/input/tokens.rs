//! Token file loader.
//!
//! Accepted formats:
//! - JSON array of strings: `["KEY1", "KEY2"]`
//! - JSON array of objects: `[{"id": "KEY1", "max_concurrency": 2}]`
//! - Plain text, one token per line; blank lines and `#` comments ignored.
//!
//! Entries without an explicit budget get `token_multiplier`.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;
use crate::token_pool::Token;

#[derive(Deserialize)]
#[serde(untagged)]
enum TokenEntry {
    Id(String),
    Full {
        id: String,
        max_concurrency: Option<usize>,
    },
}

pub fn load_tokens(path: &Path, token_multiplier: usize) -> Result<Vec<Token>, ConfigError> {
    let data =
        std::fs::read_to_string(path).map_err(|e| ConfigError::input("tokens", path, e))?;
    let tokens = parse_tokens(&data, token_multiplier).map_err(|e| match e {
        ConfigError::Input { reason, .. } => ConfigError::input("tokens", path, reason),
        other => other,
    })?;
    tracing::info!(count = tokens.len(), path = %path.display(), "loaded tokens");
    Ok(tokens)
}

pub fn parse_tokens(data: &str, token_multiplier: usize) -> Result<Vec<Token>, ConfigError> {
    let trimmed = data.trim_start();
    let tokens: Vec<Token> = if trimmed.starts_with('[') {
        let entries: Vec<TokenEntry> = serde_json::from_str(trimmed)
            .map_err(|e| ConfigError::input("tokens", Path::new("<inline>"), e))?;
        entries
            .into_iter()
            .map(|entry| match entry {
                TokenEntry::Id(id) => Token::new(id.trim(), token_multiplier),
                TokenEntry::Full {
                    id,
                    max_concurrency,
                } => Token::new(id.trim(), max_concurrency.unwrap_or(token_multiplier)),
            })
            .collect()
    } else {
        data.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|l| Token::new(l, token_multiplier))
            .collect()
    };
    validate_tokens(&tokens)?;
    Ok(tokens)
}

/// Rejects an empty set, duplicate ids and zero budgets.
pub(crate) fn validate_tokens(tokens: &[Token]) -> Result<(), ConfigError> {
    if tokens.is_empty() {
        return Err(ConfigError::NoTokens);
    }
    let mut seen = HashSet::new();
    for token in tokens {
        if token.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency(token.redacted()));
        }
        if !seen.insert(token.id.as_str()) {
            return Err(ConfigError::DuplicateToken(token.redacted()));
        }
    }
    Ok(())
}
