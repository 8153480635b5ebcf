// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Minimal canonical JSON encoder/decoder for trace records.
//!
//! Enforces:
//! - No whitespace anywhere
//! - Map keys sorted by byte order, strictly increasing; no duplicates
//! - Integers spelled with no leading zeros and no `-0`
//! - Floats spelled in shortest round-trip form, always carrying a decimal
//!   point or exponent (so the int/float distinction survives re-parsing)
//! - Only the escapes the encoder emits (`\"` `\\` `\n` `\r` `\t` and
//!   `\u00xx` for remaining control characters); everything else rejected
//!
//! Re-parsing and re-emitting canonical text is a fixed point; the decoder
//! rejects every non-canonical spelling rather than normalizing it.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::value::TraceValue;

/// Canonicality or well-formedness violation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CanonError {
    /// Input ended inside a value.
    #[error("incomplete input")]
    Incomplete,
    /// Bytes remained after the top-level value.
    #[error("trailing bytes after value")]
    Trailing,
    /// NaN or infinity handed to the encoder.
    #[error("non-finite float cannot be encoded")]
    NonFinite,
    /// Integer spelled with leading zeros, a bare `-0`, or other excess.
    #[error("non-canonical integer spelling")]
    NonCanonicalInt,
    /// Float text that does not re-emit byte-identically.
    #[error("non-canonical float spelling")]
    NonCanonicalFloat,
    /// Number token that parses as neither canonical int nor float.
    #[error("unparseable number")]
    BadNumber,
    /// Map keys not strictly increasing in byte order.
    #[error("map keys not strictly increasing")]
    MapKeyOrder,
    /// The same map key twice.
    #[error("duplicate map key")]
    MapKeyDuplicate,
    /// Raw control character inside a string.
    #[error("unescaped control character in string")]
    ControlChar,
    /// Escape sequence the encoder would never emit.
    #[error("unsupported or non-canonical escape")]
    BadEscape,
    /// Any other malformation.
    #[error("decode error: {0}")]
    Decode(String),
}

type Result<T> = std::result::Result<T, CanonError>;

/// Encodes a value to canonical text.
pub fn encode_value(value: &TraceValue) -> Result<String> {
    let mut out = String::new();
    enc_value(value, &mut out)?;
    Ok(out)
}

/// Decodes canonical text into a value, rejecting non-canonical input.
pub fn decode_value(text: &str) -> Result<TraceValue> {
    let mut dec = Decoder {
        bytes: text.as_bytes(),
        pos: 0,
    };
    let value = dec.value()?;
    if dec.pos != dec.bytes.len() {
        return Err(CanonError::Trailing);
    }
    Ok(value)
}

// --- Encoder --------------------------------------------------------------

fn enc_value(value: &TraceValue, out: &mut String) -> Result<()> {
    match value {
        TraceValue::Null => out.push_str("null"),
        TraceValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        TraceValue::Int(n) => {
            let _ = write!(out, "{n}");
        }
        TraceValue::Float(f) => enc_float(*f, out)?,
        TraceValue::Text(s) => enc_text(s, out),
        TraceValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                enc_value(item, out)?;
            }
            out.push(']');
        }
        TraceValue::Map(map) => {
            out.push('{');
            for (i, (key, val)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                enc_text(key, out);
                out.push(':');
                enc_value(val, out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn enc_float(v: f64, out: &mut String) -> Result<()> {
    if !v.is_finite() {
        return Err(CanonError::NonFinite);
    }
    // Shortest round-trip spelling; always carries '.' or an exponent.
    let _ = write!(out, "{v:?}");
    Ok(())
}

fn enc_text(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

// --- Decoder --------------------------------------------------------------

struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Decoder<'_> {
    fn peek(&self) -> Result<u8> {
        self.bytes.get(self.pos).copied().ok_or(CanonError::Incomplete)
    }

    fn bump(&mut self) -> Result<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        if self.bump()? == b {
            Ok(())
        } else {
            Err(CanonError::Decode(format!(
                "expected {:?} at byte {}",
                b as char,
                self.pos - 1
            )))
        }
    }

    fn literal(&mut self, text: &str, value: TraceValue) -> Result<TraceValue> {
        let end = self.pos + text.len();
        if end > self.bytes.len() {
            return Err(CanonError::Incomplete);
        }
        if &self.bytes[self.pos..end] != text.as_bytes() {
            return Err(CanonError::Decode(format!("bad literal at byte {}", self.pos)));
        }
        self.pos = end;
        Ok(value)
    }

    fn value(&mut self) -> Result<TraceValue> {
        match self.peek()? {
            b'n' => self.literal("null", TraceValue::Null),
            b't' => self.literal("true", TraceValue::Bool(true)),
            b'f' => self.literal("false", TraceValue::Bool(false)),
            b'"' => self.text().map(TraceValue::Text),
            b'[' => self.array(),
            b'{' => self.map(),
            b'-' | b'0'..=b'9' => self.number(),
            other => Err(CanonError::Decode(format!(
                "unexpected byte {:#04x} at {}",
                other, self.pos
            ))),
        }
    }

    fn array(&mut self) -> Result<TraceValue> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        if self.peek()? == b']' {
            self.pos += 1;
            return Ok(TraceValue::Array(items));
        }
        loop {
            items.push(self.value()?);
            match self.bump()? {
                b',' => {}
                b']' => return Ok(TraceValue::Array(items)),
                _ => {
                    return Err(CanonError::Decode(format!(
                        "expected ',' or ']' at byte {}",
                        self.pos - 1
                    )))
                }
            }
        }
    }

    fn map(&mut self) -> Result<TraceValue> {
        self.expect(b'{')?;
        let mut entries: BTreeMap<String, TraceValue> = BTreeMap::new();
        if self.peek()? == b'}' {
            self.pos += 1;
            return Ok(TraceValue::Map(entries));
        }
        let mut last_key: Option<String> = None;
        loop {
            let key = self.text()?;
            if let Some(prev) = &last_key {
                if key == *prev {
                    return Err(CanonError::MapKeyDuplicate);
                }
                if key.as_bytes() < prev.as_bytes() {
                    return Err(CanonError::MapKeyOrder);
                }
            }
            self.expect(b':')?;
            let value = self.value()?;
            entries.insert(key.clone(), value);
            last_key = Some(key);
            match self.bump()? {
                b',' => {}
                b'}' => return Ok(TraceValue::Map(entries)),
                _ => {
                    return Err(CanonError::Decode(format!(
                        "expected ',' or '}}' at byte {}",
                        self.pos - 1
                    )))
                }
            }
        }
    }

    fn text(&mut self) -> Result<String> {
        self.expect(b'"')?;
        let mut raw: Vec<u8> = Vec::new();
        loop {
            match self.bump()? {
                b'"' => break,
                b'\\' => match self.bump()? {
                    b'"' => raw.push(b'"'),
                    b'\\' => raw.push(b'\\'),
                    b'n' => raw.push(b'\n'),
                    b'r' => raw.push(b'\r'),
                    b't' => raw.push(b'\t'),
                    b'u' => raw.push(self.unicode_escape()?),
                    _ => return Err(CanonError::BadEscape),
                },
                b if b < 0x20 => return Err(CanonError::ControlChar),
                b => raw.push(b),
            }
        }
        String::from_utf8(raw).map_err(|_| CanonError::Decode("invalid UTF-8 in string".to_owned()))
    }

    /// Accepts only `\u00xx` (lowercase hex) for control characters that
    /// have no shorter escape; anything else is non-canonical.
    fn unicode_escape(&mut self) -> Result<u8> {
        let mut code: u32 = 0;
        for _ in 0..4 {
            let b = self.bump()?;
            let digit = match b {
                b'0'..=b'9' => u32::from(b - b'0'),
                b'a'..=b'f' => u32::from(b - b'a') + 10,
                // Uppercase hex is well-formed JSON but not our spelling.
                _ => return Err(CanonError::BadEscape),
            };
            code = code * 16 + digit;
        }
        if code >= 0x20 {
            return Err(CanonError::BadEscape);
        }
        if matches!(code, 0x0a | 0x0d | 0x09) {
            return Err(CanonError::BadEscape);
        }
        u8::try_from(code).map_err(|_| CanonError::BadEscape)
    }

    fn number(&mut self) -> Result<TraceValue> {
        let start = self.pos;
        while let Some(&b) = self.bytes.get(self.pos) {
            if b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let token = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| CanonError::BadNumber)?;
        if token.is_empty() {
            return Err(CanonError::Incomplete);
        }

        if token.contains('.') || token.contains('e') || token.contains('E') {
            let parsed: f64 = token.parse().map_err(|_| CanonError::BadNumber)?;
            if !parsed.is_finite() {
                return Err(CanonError::BadNumber);
            }
            // Canonical floats re-emit byte-identically.
            if format!("{parsed:?}") != token {
                return Err(CanonError::NonCanonicalFloat);
            }
            return Ok(TraceValue::Float(parsed));
        }

        let digits = token.strip_prefix('-').unwrap_or(token);
        if digits.is_empty() || digits.contains('+') || digits.contains('-') {
            return Err(CanonError::BadNumber);
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return Err(CanonError::NonCanonicalInt);
        }
        if token.starts_with('-') && digits == "0" {
            return Err(CanonError::NonCanonicalInt);
        }
        let parsed: i64 = token.parse().map_err(|_| CanonError::BadNumber)?;
        Ok(TraceValue::Int(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(text: &str) {
        let value = decode_value(text).unwrap();
        assert_eq!(encode_value(&value).unwrap(), text);
    }

    #[test]
    fn scalars_roundtrip() {
        roundtrip("null");
        roundtrip("true");
        roundtrip("false");
        roundtrip("0");
        roundtrip("-17");
        roundtrip("0.5");
        roundtrip("1.0");
        roundtrip("-0.25");
    }

    #[test]
    fn containers_roundtrip() {
        roundtrip(r#"[1,2.0,"x",null]"#);
        roundtrip(r#"{"a":1,"b":[true,false],"c":{"d":"e"}}"#);
        roundtrip("{}");
        roundtrip("[]");
    }

    #[test]
    fn escapes_roundtrip() {
        roundtrip(r#""line\nbreak""#);
        roundtrip(r#""quote\"backslash\\""#);
        roundtrip(r#""bell""#);
    }

    #[test]
    fn int_and_float_stay_distinct() {
        assert_eq!(decode_value("1").unwrap(), TraceValue::Int(1));
        assert_eq!(decode_value("1.0").unwrap(), TraceValue::Float(1.0));
    }

    #[test]
    fn rejects_unsorted_and_duplicate_keys() {
        assert_eq!(
            decode_value(r#"{"b":1,"a":2}"#).unwrap_err(),
            CanonError::MapKeyOrder
        );
        assert_eq!(
            decode_value(r#"{"a":1,"a":2}"#).unwrap_err(),
            CanonError::MapKeyDuplicate
        );
    }

    #[test]
    fn rejects_non_canonical_numbers() {
        assert_eq!(decode_value("01").unwrap_err(), CanonError::NonCanonicalInt);
        assert_eq!(decode_value("-0").unwrap_err(), CanonError::NonCanonicalInt);
        assert_eq!(
            decode_value("1.50").unwrap_err(),
            CanonError::NonCanonicalFloat
        );
        assert_eq!(
            decode_value("1e+5").unwrap_err(),
            CanonError::NonCanonicalFloat
        );
    }

    #[test]
    fn rejects_whitespace() {
        assert!(decode_value(r#"{"a": 1}"#).is_err());
        assert!(decode_value("[1, 2]").is_err());
        assert!(decode_value(" 1").is_err());
    }

    #[test]
    fn rejects_non_canonical_escapes() {
        // \u000a must be spelled \n; \u0041 must be a raw 'A'; \b is
        // never emitted (it becomes \u0008).
        assert_eq!(
            decode_value(r#""\u000a""#).unwrap_err(),
            CanonError::BadEscape
        );
        assert_eq!(
            decode_value(r#""\u0041""#).unwrap_err(),
            CanonError::BadEscape
        );
        assert_eq!(decode_value(r#""\b""#).unwrap_err(), CanonError::BadEscape);
    }

    #[test]
    fn rejects_trailing_bytes() {
        assert_eq!(decode_value("1 ").unwrap_err(), CanonError::Trailing);
        assert_eq!(decode_value("{}x").unwrap_err(), CanonError::Trailing);
    }

    #[test]
    fn encoder_rejects_non_finite() {
        assert_eq!(
            encode_value(&TraceValue::Float(f64::NAN)).unwrap_err(),
            CanonError::NonFinite
        );
        assert_eq!(
            encode_value(&TraceValue::Float(f64::INFINITY)).unwrap_err(),
            CanonError::NonFinite
        );
    }
}
