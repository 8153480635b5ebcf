// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

// Telemetry helpers for JSONL diagnostics when the `telemetry` feature is
// enabled. Manually formats JSON to avoid a non-deterministic serde_json
// dependency; timestamps are the caller's kernel time, never wall clock.

#[cfg(feature = "telemetry")]
fn emit_line(line: &str) {
    use std::io::Write as _;
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(line.as_bytes());
    let _ = out.write_all(b"\n");
}

/// Emits a gate decision event as a JSON line to stdout.
///
/// Best-effort: I/O errors are ignored. Keys are emitted pre-sorted.
#[cfg(feature = "telemetry")]
pub fn gate_decision(t: f64, code: &str, ok: bool) {
    emit_line(&format!(
        r#"{{"code":"{code}","event":"gate","ok":{ok},"t":{t:?}}}"#
    ));
}

/// Emits a controller tick summary as a JSON line to stdout.
///
/// Best-effort: I/O errors are ignored. Keys are emitted pre-sorted.
#[cfg(feature = "telemetry")]
pub fn tick(t: f64, ok: bool, selected_spaces: usize) {
    emit_line(&format!(
        r#"{{"event":"tick","ok":{ok},"selected":{selected_spaces},"t":{t:?}}}"#
    ));
}
