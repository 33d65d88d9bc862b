//! Decoding of one log line into a [`UsageRecord`], and the content-addressed
//! fingerprint used for deduplication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One parsed, fingerprinted observation of a host-model interaction.
///
/// Identity is the `fingerprint`; two records with the same fingerprint are
/// the same record for every purpose in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub timestamp: DateTime<Utc>,
    pub tokens: TokenCounts,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub fingerprint: String,
    pub day_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenCounts {
    pub input: u64,
    pub output: u64,
    pub cache_creation: u64,
    pub cache_read: u64,
}

/// Wire shape accepted on one `.jsonl` line. Only the fields we care about
/// are modeled; unknown fields are ignored by serde's default behavior.
#[derive(Debug, Deserialize)]
struct RawLine {
    timestamp: String,
    message: RawMessage,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
    #[serde(rename = "requestId")]
    request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    usage: Option<RawUsage>,
    id: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUsage {
    input_tokens: Option<serde_json::Value>,
    output_tokens: Option<serde_json::Value>,
    #[serde(default)]
    cache_creation_input_tokens: u64,
    #[serde(default)]
    cache_read_input_tokens: u64,
}

/// Why a line was rejected. Never fatal; the caller logs it at `debug` and
/// skips the line.
#[derive(Debug, PartialEq, Eq)]
pub enum RejectReason {
    Blank,
    Malformed,
    MissingTimestamp,
    MissingUsage,
    NonIntegerTokens,
}

/// Decode one textual line into a [`UsageRecord`], or a reason it was
/// rejected. Performs no I/O.
pub fn parse_line(line: &str) -> Result<UsageRecord, RejectReason> {
    if line.trim().is_empty() {
        return Err(RejectReason::Blank);
    }

    let raw: RawLine = serde_json::from_str(line).map_err(|_| RejectReason::Malformed)?;

    if raw.timestamp.trim().is_empty() {
        return Err(RejectReason::MissingTimestamp);
    }
    let timestamp: DateTime<Utc> = raw
        .timestamp
        .parse()
        .map_err(|_| RejectReason::MissingTimestamp)?;

    let usage = raw.message.usage.ok_or(RejectReason::MissingUsage)?;
    let input = as_u64(usage.input_tokens.as_ref()).ok_or(RejectReason::NonIntegerTokens)?;
    let output = as_u64(usage.output_tokens.as_ref()).ok_or(RejectReason::NonIntegerTokens)?;

    let tokens = TokenCounts {
        input,
        output,
        cache_creation: usage.cache_creation_input_tokens,
        cache_read: usage.cache_read_input_tokens,
    };

    let model = raw.message.model.unwrap_or_else(|| "unknown".to_string());
    let day_key = timestamp.format("%Y-%m-%d").to_string();
    let fingerprint = fingerprint_of(&raw.timestamp, raw.message.id.as_deref(), raw.request_id.as_deref());

    Ok(UsageRecord {
        timestamp,
        tokens,
        model,
        session_id: raw.session_id,
        fingerprint,
        day_key,
    })
}

/// `input_tokens`/`output_tokens` must be integers; a float, string, or
/// missing value is rejected rather than coerced.
fn as_u64(value: Option<&serde_json::Value>) -> Option<u64> {
    value.and_then(|v| v.as_u64())
}

/// SHA-256 over `timestamp ‖ message_id ‖ request_id`, hex-encoded. Missing
/// fields contribute the empty string. Changing this derivation is a
/// breaking change to dedup across every installed agent.
pub fn fingerprint_of(timestamp: &str, message_id: Option<&str>, request_id: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.as_bytes());
    hasher.update(message_id.unwrap_or("").as_bytes());
    hasher.update(request_id.unwrap_or("").as_bytes());
    hex::encode(hasher.finalize())
}
