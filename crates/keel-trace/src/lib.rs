// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! keel-trace: canonical newline-delimited trace records.
//!
//! The kernel emits one [`TraceRecord`] per interesting event (monitor
//! aggregate, proposals, controller outcome, actuator targets, ...); this
//! crate fixes their wire form so replay tooling can compare runs byte for
//! byte.
//!
//! Determinism contract
//! - Each record encodes to exactly one line of canonical JSON: keys
//!   sorted by byte order, no whitespace, shortest round-trip float
//!   spellings that always carry a decimal point or exponent.
//! - `loads(dumps(records)) == records` and, for canonical input text,
//!   `dumps(loads(text)) == text`. The decoder rejects non-canonical
//!   spellings instead of normalizing them, which is what makes the second
//!   fixed point hold.
//! - [`trace_digest`] is a BLAKE3 digest over the canonical bytes under a
//!   versioned domain prefix; equal digests mean byte-identical traces.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::float_cmp
)]

mod canon;
mod value;

use std::collections::BTreeMap;

use thiserror::Error;

pub use canon::{decode_value, encode_value, CanonError};
pub use value::TraceValue;

/// Canonical 256-bit digest of a trace.
pub type Hash = [u8; 32];

/// Domain prefix for trace digests. Changing it is a breaking change for
/// stored digests.
const TRACE_DIGEST_V1: &[u8] = b"keel:trace_digest:v1\0";

/// One timestamped, tagged trace record.
#[derive(Clone, Debug, PartialEq)]
pub struct TraceRecord {
    /// Kernel time of the event (monotonic seconds).
    pub t: f64,
    /// Event family, e.g. `"monitor"`, `"controller"`, `"actuators"`.
    pub tag: String,
    /// Structured event payload.
    pub payload: BTreeMap<String, TraceValue>,
}

impl TraceRecord {
    /// Builds a record.
    pub fn new(t: f64, tag: impl Into<String>, payload: BTreeMap<String, TraceValue>) -> Self {
        Self {
            t,
            tag: tag.into(),
            payload,
        }
    }
}

/// Failure while parsing trace text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    /// A line was not canonical JSON.
    #[error("canonical decode failed on line {line}: {source}")]
    Canon {
        /// 1-based line number.
        line: usize,
        /// Underlying codec error.
        source: CanonError,
    },
    /// A line decoded to something other than an object.
    #[error("record on line {line} is not an object")]
    NotAnObject {
        /// 1-based line number.
        line: usize,
    },
    /// A record field is missing or has the wrong shape.
    #[error("record on line {line} missing or invalid field `{field}`")]
    BadField {
        /// 1-based line number.
        line: usize,
        /// Offending field name.
        field: &'static str,
    },
    /// A record carries a field outside the record schema.
    #[error("record on line {line} has unexpected field `{field}`")]
    UnexpectedField {
        /// 1-based line number.
        line: usize,
        /// Offending field name.
        field: String,
    },
}

fn record_to_value(record: &TraceRecord) -> TraceValue {
    let mut fields = BTreeMap::new();
    fields.insert(
        "payload".to_owned(),
        TraceValue::Map(record.payload.clone()),
    );
    fields.insert("t".to_owned(), TraceValue::Float(record.t));
    fields.insert("tag".to_owned(), TraceValue::Text(record.tag.clone()));
    TraceValue::Map(fields)
}

/// Serializes records to newline-delimited canonical JSON, one record per
/// line, each line newline-terminated. Fails only on non-finite floats in
/// a payload.
pub fn dumps_jsonl(records: &[TraceRecord]) -> Result<String, CanonError> {
    let mut out = String::new();
    for record in records {
        out.push_str(&canon::encode_value(&record_to_value(record))?);
        out.push('\n');
    }
    Ok(out)
}

/// Parses newline-delimited canonical trace text. Blank lines are
/// skipped; every other line must be one canonical record object with
/// exactly the fields `payload` (object), `t` (float) and `tag` (string).
pub fn loads_jsonl(text: &str) -> Result<Vec<TraceRecord>, TraceError> {
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let value = canon::decode_value(line)
            .map_err(|source| TraceError::Canon { line: line_no, source })?;
        let TraceValue::Map(mut fields) = value else {
            return Err(TraceError::NotAnObject { line: line_no });
        };
        let payload = match fields.remove("payload") {
            Some(TraceValue::Map(m)) => m,
            _ => {
                return Err(TraceError::BadField {
                    line: line_no,
                    field: "payload",
                })
            }
        };
        let t = match fields.remove("t") {
            Some(TraceValue::Float(t)) => t,
            _ => {
                return Err(TraceError::BadField {
                    line: line_no,
                    field: "t",
                })
            }
        };
        let tag = match fields.remove("tag") {
            Some(TraceValue::Text(s)) => s,
            _ => {
                return Err(TraceError::BadField {
                    line: line_no,
                    field: "tag",
                })
            }
        };
        if let Some((field, _)) = fields.into_iter().next() {
            return Err(TraceError::UnexpectedField {
                line: line_no,
                field,
            });
        }
        records.push(TraceRecord { t, tag, payload });
    }
    Ok(records)
}

/// BLAKE3 digest of canonical trace text under the v1 domain prefix.
///
/// Stable across architectures; equal digests mean byte-identical traces.
#[must_use]
pub fn trace_digest(canonical_text: &str) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(TRACE_DIGEST_V1);
    hasher.update(canonical_text.as_bytes());
    *hasher.finalize().as_bytes()
}

/// Hex spelling of a trace digest for logs and comparisons.
#[must_use]
pub fn digest_hex(digest: &Hash) -> String {
    hex::encode(digest)
}
