//! Best-effort recovery of a JSON array from a free-form model reply.
//!
//! Models wrap their answer in prose or markdown fences no matter how the
//! prompt is worded. The candidate payload is the span from the first `[` to
//! the last `]`; when there is no such span the whole reply is tried.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ExtractionError;
use crate::models::record::{json_kind, ReceiptRecord};

lazy_static! {
    // Greedy and dot-matches-newline: first '[' through last ']'.
    static ref ARRAY_SPAN: Regex = Regex::new(r"(?s)\[.*\]").unwrap();
}

/// Select the candidate payload from a model reply.
pub fn find_candidate(reply: &str) -> &str {
    match ARRAY_SPAN.find(reply) {
        Some(m) => {
            debug!("Candidate array span {}..{} of {}", m.start(), m.end(), reply.len());
            m.as_str()
        }
        None => {
            debug!("No array span in reply, trying the full text");
            reply
        }
    }
}

/// Decode a model reply into records.
///
/// An array yields its object elements in order; other elements are skipped
/// with a warning. A single object yields one record. Anything that does not
/// decode, or decodes to a scalar, is a parse failure carrying the raw reply.
pub fn parse_records(reply: &str) -> Result<Vec<ReceiptRecord>, ExtractionError> {
    let candidate = find_candidate(reply);

    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| parse_error(e.to_string(), reply))?;

    let items = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        other => {
            return Err(parse_error(
                format!("expected a JSON array or object, found {}", json_kind(&other)),
                reply,
            ));
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match ReceiptRecord::from_value(item) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping element {} of model reply: {}", i, e),
        }
    }

    Ok(records)
}

fn parse_error(reason: String, reply: &str) -> ExtractionError {
    ExtractionError::Parse {
        reason,
        raw_response: reply.to_string(),
    }
}
