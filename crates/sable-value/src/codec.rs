//! Self-describing wire codec
//!
//! Every value is a one-byte kind tag followed by its payload. Numbers are
//! written as canonical text; a reader consumes the longest numeric run, which
//! is unambiguous because no tag byte can appear inside a number.
//!
//! ```text
//! u                 Uninit
//! b1 | b0           Bool
//! i<decimal>        Long
//! r<text>           Double (`1.5`, `-0`, `inf`, `-inf`, `NaN`)
//! s<bytes>          String, top level only: payload runs to end of buffer
//! S<len>:<bytes>    String, length-prefixed
//! a<count>:<items>  Array, items in stream form
//! ```
//!
//! [`Value::pack`] emits the top-level form. [`Value::pack_onto`] emits the
//! stream form, where strings are always length-prefixed so their bytes may
//! contain any tag or delimiter. Decoded strings come from outside the
//! process and are sanitized like any other tainted input.

use crate::array::ObjArray;
use crate::error::{ValueError, ValueResult};
use crate::string::StringValue;
use crate::value::{Value, format_double};
use std::fmt::Write;

/// Deepest array nesting `unpack` accepts
pub const MAX_DEPTH: usize = 256;

/// Cursor over a pack buffer
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Byte offset of the next unread byte
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Unread bytes
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn error(&self, reason: impl Into<String>) -> ValueError {
        let err = ValueError::deserialize(self.pos, reason);
        tracing::trace!(error = %err, "rejected pack buffer");
        err
    }

    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn byte(&mut self, what: &str) -> ValueResult<u8> {
        let b = self
            .peek()
            .ok_or_else(|| self.error(format!("unexpected end of buffer, expected {what}")))?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, want: u8) -> ValueResult<()> {
        match self.peek() {
            Some(b) if b == want => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(self.error(format!(
                "expected '{}', found '{}'",
                want as char,
                b.escape_ascii()
            ))),
            None => Err(self.error(format!("unexpected end of buffer, expected '{}'", want as char))),
        }
    }

    fn take(&mut self, n: usize) -> ValueResult<&'a [u8]> {
        if self.buf.len() - self.pos < n {
            return Err(self.error(format!(
                "payload of {n} bytes runs past end of buffer ({} left)",
                self.buf.len() - self.pos
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn take_rest(&mut self) -> &'a [u8] {
        let bytes = &self.buf[self.pos..];
        self.pos = self.buf.len();
        bytes
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a [u8] {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.buf[start..self.pos]
    }

    fn starts_with(&self, prefix: &[u8]) -> bool {
        self.remaining().starts_with(prefix)
    }

    /// Parse the numeric run starting at the cursor
    fn number<T: std::str::FromStr>(&mut self, run: impl Fn(u8) -> bool, what: &str) -> ValueResult<T> {
        let start = self.pos;
        let digits = self.take_while(run);
        // the run is ASCII by construction
        let text = std::str::from_utf8(digits).unwrap_or_default();
        text.parse().map_err(|_| {
            self.pos = start;
            self.error(format!("invalid {what} '{text}'"))
        })
    }

    /// `<decimal>:` length or count prefix
    fn length(&mut self) -> ValueResult<usize> {
        let n = self.number(|b| b.is_ascii_digit(), "length")?;
        self.expect(b':')?;
        Ok(n)
    }
}

fn write_stream(value: &Value, out: &mut String) {
    match value {
        Value::Uninit => out.push('u'),
        Value::Bool(b) => out.push_str(if *b { "b1" } else { "b0" }),
        Value::Long(n) => {
            let _ = write!(out, "i{n}");
        }
        Value::Double(n) => {
            out.push('r');
            out.push_str(&format_double(*n));
        }
        Value::String(s) => {
            let _ = write!(out, "S{}:", s.byte_len());
            out.push_str(s.as_str());
        }
        Value::Array(arr) => {
            let _ = write!(out, "a{}:", arr.len());
            for element in arr.values() {
                write_stream(&element, out);
            }
        }
    }
}

fn read_stream(reader: &mut Reader<'_>, depth: usize) -> ValueResult<Value> {
    let tag_at = reader.position();
    match reader.byte("kind tag")? {
        b'u' => Ok(Value::Uninit),
        b'b' => match reader.byte("boolean payload")? {
            b'1' => Ok(Value::Bool(true)),
            b'0' => Ok(Value::Bool(false)),
            other => {
                reader.pos -= 1;
                Err(reader.error(format!("invalid boolean '{}'", other.escape_ascii())))
            }
        },
        b'i' => reader
            .number(|b| b == b'-' || b.is_ascii_digit(), "integer")
            .map(Value::Long),
        b'r' => {
            let words: [(&[u8], f64); 3] = [
                (b"-inf", f64::NEG_INFINITY),
                (b"inf", f64::INFINITY),
                (b"NaN", f64::NAN),
            ];
            for (word, n) in words {
                if reader.starts_with(word) {
                    reader.pos += word.len();
                    return Ok(Value::Double(n));
                }
            }
            reader
                .number(
                    |b| matches!(b, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E'),
                    "double",
                )
                .map(Value::Double)
        }
        b'S' => {
            let len = reader.length()?;
            let bytes = reader.take(len)?;
            Ok(Value::String(StringValue::tainted(bytes)))
        }
        b'a' => {
            if depth >= MAX_DEPTH {
                reader.pos = tag_at;
                return Err(reader.error(format!("arrays nested deeper than {MAX_DEPTH}")));
            }
            let count = reader.length()?;
            let mut arr = ObjArray::new();
            for _ in 0..count {
                arr.push(read_stream(reader, depth + 1)?);
            }
            Ok(Value::Array(arr))
        }
        b's' => {
            reader.pos = tag_at;
            Err(reader.error("unprefixed string inside a stream"))
        }
        other => {
            reader.pos = tag_at;
            Err(reader.error(format!("unknown kind tag '{}'", other.escape_ascii())))
        }
    }
}

impl Value {
    /// Top-level pack form of this value
    pub fn pack(&self) -> String {
        match self {
            Value::String(s) => {
                let mut out = String::with_capacity(s.byte_len() + 1);
                out.push('s');
                out.push_str(s.as_str());
                out
            }
            other => {
                let mut out = String::new();
                other.pack_onto(&mut out);
                out
            }
        }
    }

    /// Append the stream form of this value to `out`
    pub fn pack_onto(&self, out: &mut String) {
        write_stream(self, out);
    }

    /// Decode one value from a complete buffer.
    ///
    /// Accepts both the top-level and stream forms; bytes left over after the
    /// value are an error.
    pub fn unpack(buf: impl AsRef<[u8]>) -> ValueResult<Value> {
        let mut reader = Reader::new(buf.as_ref());
        if reader.peek() == Some(b's') {
            reader.pos += 1;
            return Ok(Value::String(StringValue::tainted(reader.take_rest())));
        }
        let value = read_stream(&mut reader, 0)?;
        if !reader.is_at_end() {
            return Err(reader.error(format!(
                "{} trailing bytes after value",
                reader.remaining().len()
            )));
        }
        Ok(value)
    }

    /// Decode one stream-form value at the cursor, advancing past it
    pub fn unpack_with_len(reader: &mut Reader<'_>) -> ValueResult<Value> {
        read_stream(reader, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_forms() {
        assert_eq!(Value::Uninit.pack(), "u");
        assert_eq!(Value::boolean(true).pack(), "b1");
        assert_eq!(Value::long(-42).pack(), "i-42");
        assert_eq!(Value::double(0.1).pack(), "r0.1");
        assert_eq!(Value::double(f64::NEG_INFINITY).pack(), "r-inf");
        assert_eq!(Value::string("x:y").pack(), "sx:y");
    }

    #[test]
    fn test_array_stream_form() {
        let v = Value::array([
            Value::long(1),
            Value::string("a:S3:"),
            Value::array([Value::double(2.5)]),
        ]);
        assert_eq!(v.pack(), "a3:i1S5:a:S3:a1:r2.5");
        assert_eq!(Value::unpack(v.pack()).unwrap(), v);
    }

    #[test]
    fn test_numbers_need_no_terminator() {
        let v = Value::unpack("a4:i12i-3rinfr-1.5").unwrap();
        assert_eq!(
            v,
            Value::array([
                Value::long(12),
                Value::long(-3),
                Value::double(f64::INFINITY),
                Value::double(-1.5),
            ])
        );
    }

    #[test]
    fn test_reader_advances() {
        let buf = b"i7S2:hiu";
        let mut reader = Reader::new(buf);
        assert_eq!(Value::unpack_with_len(&mut reader).unwrap(), Value::long(7));
        assert_eq!(reader.position(), 2);
        assert_eq!(Value::unpack_with_len(&mut reader).unwrap(), Value::string("hi"));
        assert_eq!(Value::unpack_with_len(&mut reader).unwrap(), Value::Uninit);
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_truncated_input() {
        for bad in ["", "S5:abc", "a2:i1", "b", "i", "S:", "Sx:"] {
            assert!(
                matches!(Value::unpack(bad), Err(ValueError::Deserialize { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_error_offsets() {
        let err = Value::unpack("a2:i1x").unwrap_err();
        assert_eq!(err, ValueError::deserialize(5, "unknown kind tag 'x'"));
        let err = Value::unpack("i1u").unwrap_err();
        assert!(matches!(err, ValueError::Deserialize { offset: 2, .. }));
    }

    #[test]
    fn test_depth_limit() {
        let deep = "a1:".repeat(MAX_DEPTH + 1) + "u";
        assert!(matches!(
            Value::unpack(&deep),
            Err(ValueError::Deserialize { .. })
        ));
        let ok = "a1:".repeat(MAX_DEPTH) + "u";
        assert!(Value::unpack(&ok).is_ok());
    }

    #[test]
    fn test_huge_count_is_not_preallocated() {
        assert!(Value::unpack("a4294967295:u").is_err());
    }

    #[test]
    fn test_decoded_strings_are_sanitized() {
        let v = Value::unpack(b"s\xffok").unwrap();
        assert_eq!(v, Value::string("\u{FFFD}ok"));
        let v = Value::unpack(b"S2:\xc3(").unwrap();
        assert_eq!(v, Value::string("\u{FFFD}("));
    }
}
