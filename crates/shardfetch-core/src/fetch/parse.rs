//! Decode and classify the provider's `getsourcecode` answer.
//!
//! Shape: `{"status": "1"|"0", "message": "...", "result": [...] | "..."}`.
//! On `status = "0"` the result is a human-readable reason.

use serde::Deserialize;

use super::ContractData;
use crate::retry::FetchError;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

/// Parse a response body for `address` into a record or a classified error.
pub fn parse_source_response(address: &str, body: &[u8]) -> Result<ContractData, FetchError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(FetchError::EmptyResponse);
    }
    let resp: ApiResponse =
        serde_json::from_slice(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    if resp.status != "1" {
        let reason = match &resp.result {
            serde_json::Value::String(s) if !s.is_empty() => s.clone(),
            _ => resp.message.clone(),
        };
        return Err(classify_rejection(reason));
    }

    let entry = resp
        .result
        .as_array()
        .and_then(|a| a.first())
        .filter(|e| e.is_object())
        .cloned()
        .ok_or_else(|| FetchError::Malformed("result is not a non-empty array".to_string()))?;

    let field = |name: &str| {
        entry
            .get(name)
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let source_code = field("SourceCode");
    if source_code.trim().is_empty() {
        return Err(FetchError::NotFound(format!(
            "{address}: contract source code not verified"
        )));
    }

    Ok(ContractData {
        address: address.to_string(),
        contract_name: field("ContractName"),
        compiler_version: field("CompilerVersion"),
        source_code,
        raw: entry,
    })
}

fn classify_rejection(reason: String) -> FetchError {
    let lower = reason.to_ascii_lowercase();
    if lower.contains("rate limit") {
        FetchError::RateLimited(reason)
    } else if lower.contains("invalid address") || lower.contains("not verified") {
        FetchError::NotFound(reason)
    } else if lower.contains("api key") || lower.contains("apikey") {
        FetchError::Permanent(reason)
    } else {
        FetchError::Transient(reason)
    }
}
