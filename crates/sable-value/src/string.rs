//! Unicode-aware script strings
//!
//! A [`StringValue`] always holds well-formed UTF-8. External input enters
//! through [`StringValue::tainted`], which repairs invalid sequences once at
//! construction; internally produced text enters through
//! [`StringValue::untainted`] and is never re-validated, because a Rust
//! `String` already carries the guarantee.
//!
//! All public offsets are counted in code points. Byte offsets only exist
//! inside this module and in [`SubString`] views.
//!
//! ## Views
//!
//! A [`SubString`] does not borrow its owner. It records the owner's identity
//! and generation; every mutating operation bumps the generation, so reading a
//! view after a mutation fails with [`ValueError::StaleView`] instead of
//! returning bytes from a reshaped buffer.

use crate::error::{ValueError, ValueResult};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, Range};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use tracing::debug;

/// Characters removed by `trim` when no explicit set is given
pub const DEFAULT_TRIM_SET: &str = " \t\r\n";

/// Replacement character used when repairing input
const REPLACEMENT: &str = "\u{FFFD}";

/// Identity source for string owners
static NEXT_STRING_ID: AtomicU64 = AtomicU64::new(1);

fn next_string_id() -> u64 {
    NEXT_STRING_ID.fetch_add(1, AtomicOrdering::Relaxed)
}

/// Returns true iff `bytes` is well-formed UTF-8.
pub fn is_valid_unicode(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_ok()
}

/// Explicit validity check; the only path that treats bad Unicode as an error.
pub fn validate_unicode(bytes: &[u8]) -> ValueResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| ValueError::InvalidUnicode {
        valid_up_to: e.valid_up_to(),
    })
}

/// Repairs `buf` in place so that it holds valid UTF-8.
///
/// Each maximal invalid sequence becomes U+FFFD. Valid input is left
/// untouched, so applying this twice is the same as applying it once.
/// Returns whether the buffer was modified.
pub fn sanitize_unicode(buf: &mut Vec<u8>) -> bool {
    if is_valid_unicode(buf) {
        return false;
    }
    *buf = repair(buf).into_bytes();
    true
}

fn repair(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
        if !chunk.invalid().is_empty() {
            out.push_str(REPLACEMENT);
        }
    }
    out
}

/// Which end(s) `trim` removes characters from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimSide {
    /// Start of the string only
    Leading,
    /// End of the string only
    Trailing,
    /// Both ends
    Both,
}

impl TrimSide {
    /// Script-level trim type code: 1 leading, 2 trailing, 3 both
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Leading),
            2 => Some(Self::Trailing),
            3 => Some(Self::Both),
            _ => None,
        }
    }
}

/// Mutable script string
pub struct StringValue {
    value: String,
    id: u64,
    generation: u64,
}

impl StringValue {
    /// Build from external bytes, repairing invalid UTF-8.
    pub fn tainted(bytes: impl AsRef<[u8]>) -> Self {
        let bytes = bytes.as_ref();
        let value = match std::str::from_utf8(bytes) {
            Ok(s) => s.to_owned(),
            Err(e) => {
                debug!(
                    len = bytes.len(),
                    valid_up_to = e.valid_up_to(),
                    "repaired tainted string input"
                );
                repair(bytes)
            }
        };
        Self::from_valid(value)
    }

    /// Build from internally produced text.
    pub fn untainted(s: impl Into<String>) -> Self {
        Self::from_valid(s.into())
    }

    fn from_valid(value: String) -> Self {
        Self {
            value,
            id: next_string_id(),
            generation: 0,
        }
    }

    /// Same as the free function; kept on the type for call-site symmetry.
    pub fn is_valid_unicode(bytes: &[u8]) -> bool {
        is_valid_unicode(bytes)
    }

    /// Same as the free function; kept on the type for call-site symmetry.
    pub fn sanitize_unicode(buf: &mut Vec<u8>) -> bool {
        sanitize_unicode(buf)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_bytes()
    }

    /// Length of the UTF-8 payload in bytes
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.value.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Number of code points. Walks the whole buffer.
    pub fn length(&self) -> usize {
        self.value.chars().count()
    }

    /// Owner identity used by [`SubString`] views
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of mutations applied so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Consume and return the underlying text
    pub fn into_string(self) -> String {
        self.value
    }

    /// Translate a code-point offset into a byte offset.
    ///
    /// `code_index == length()` maps to the end of the buffer.
    pub fn byte_offset(&self, code_index: usize) -> Option<usize> {
        match self.value.char_indices().nth(code_index) {
            Some((pos, _)) => Some(pos),
            None if code_index == self.length() => Some(self.value.len()),
            None => None,
        }
    }

    /// Byte range of `len` code points starting at `start`, clamped to the text.
    fn clamped_range(&self, start: usize, len: usize) -> Range<usize> {
        let mut iter = self.value.char_indices().skip(start);
        let begin = match iter.next() {
            Some((pos, _)) => pos,
            None => return self.value.len()..self.value.len(),
        };
        let end = if len == 0 {
            begin
        } else {
            self.value
                .char_indices()
                .skip(start)
                .nth(len)
                .map(|(pos, _)| pos)
                .unwrap_or(self.value.len())
        };
        begin..end
    }

    /// Code point at `index`
    pub fn char_at(&self, index: usize) -> Option<char> {
        self.value.chars().nth(index)
    }

    /// Copy `len` code points starting at code point `start`.
    ///
    /// Out-of-range requests clamp: a start past the end yields an empty
    /// string, a length past the end is truncated.
    pub fn substring(&self, start: usize, len: usize) -> StringValue {
        let range = self.clamped_range(start, len);
        StringValue::untainted(&self.value[range])
    }

    /// Detached view over the same clamped range [`substring`](Self::substring) would copy.
    pub fn view(&self, start: usize, len: usize) -> SubString {
        let range = self.clamped_range(start, len);
        SubString {
            owner: self.id,
            generation: self.generation,
            start: range.start,
            end: range.end,
        }
    }

    /// Code-point index of the first `target` at or after code point `start`.
    pub fn find(&self, target: &str, start: usize) -> Option<usize> {
        let from = self.byte_offset(start)?;
        let pos = self.value[from..].find(target)?;
        Some(start + self.value[from..from + pos].chars().count())
    }

    /// Compare `len` code points starting at `pos` with `other`.
    pub fn compare_range(&self, pos: usize, len: usize, other: &StringValue) -> bool {
        let range = self.clamped_range(pos, len);
        &self.value[range] == other.as_str()
    }

    /// Split on `separator`, or on runs of whitespace when `None`.
    pub fn split(&self, separator: Option<&str>) -> Vec<StringValue> {
        match separator {
            Some(sep) if !sep.is_empty() => self
                .value
                .split(sep)
                .map(StringValue::untainted)
                .collect(),
            Some(_) => self
                .value
                .chars()
                .map(|c| StringValue::untainted(c.to_string()))
                .collect(),
            None => self
                .value
                .split_whitespace()
                .map(StringValue::untainted)
                .collect(),
        }
    }

    /// Code points as UTF-32
    pub fn to_utf32(&self) -> Vec<u32> {
        self.value.chars().map(u32::from).collect()
    }

    /// Text as UTF-16 code units, with surrogate pairs above U+FFFF
    pub fn to_utf16(&self) -> Vec<u16> {
        self.value.encode_utf16().collect()
    }

    /// Encode one code point; surrogates and values past U+10FFFF become U+FFFD.
    pub fn from_utf32(code: u32) -> String {
        char::from_u32(code)
            .map(String::from)
            .unwrap_or_else(|| REPLACEMENT.to_string())
    }

    /// Decode UTF-16; unpaired surrogates become U+FFFD.
    pub fn from_utf16(units: &[u16]) -> String {
        char::decode_utf16(units.iter().copied())
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }

    fn touch(&mut self) {
        self.generation += 1;
    }

    /// Append text in place
    pub fn push_str(&mut self, s: &str) {
        self.value.push_str(s);
        self.touch();
    }

    /// Uppercase in place
    pub fn to_upper(&mut self) {
        self.value = self.value.to_uppercase();
        self.touch();
    }

    /// Lowercase in place
    pub fn to_lower(&mut self) {
        self.value = self.value.to_lowercase();
        self.touch();
    }

    /// Remove characters in `set` from the chosen side(s), in place.
    pub fn trim(&mut self, set: &str, side: TrimSide) {
        let in_set = |c: char| set.contains(c);
        let trimmed = match side {
            TrimSide::Leading => self.value.trim_start_matches(in_set),
            TrimSide::Trailing => self.value.trim_end_matches(in_set),
            TrimSide::Both => self.value.trim_matches(in_set),
        };
        self.value = trimmed.to_string();
        self.touch();
    }

    /// Replace every occurrence of `pattern` with `with`, in place.
    ///
    /// An empty pattern matches nothing.
    pub fn replace(&mut self, pattern: &str, with: &str) {
        if !pattern.is_empty() {
            self.value = self.value.replace(pattern, with);
        }
        self.touch();
    }

    /// Remove every occurrence of `pattern`, in place.
    pub fn remove(&mut self, pattern: &str) {
        self.replace(pattern, "");
    }

    /// Replace `len` code points at `start` with `with`, in place.
    ///
    /// `len` is clamped to the remaining text; `start` past the end fails.
    pub fn replace_range(&mut self, start: usize, len: usize, with: &str) -> ValueResult<()> {
        let count = self.length();
        if start > count {
            return Err(ValueError::out_of_range(start as i64, count));
        }
        let range = self.clamped_range(start, len);
        self.value.replace_range(range, with);
        self.touch();
        Ok(())
    }

    /// Approximate heap footprint in bytes
    pub fn size_estimate(&self) -> usize {
        std::mem::size_of::<Self>() + self.value.capacity()
    }
}

impl Clone for StringValue {
    fn clone(&self) -> Self {
        Self::from_valid(self.value.clone())
    }
}

impl std::fmt::Debug for StringValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StringValue({:?})", self.value)
    }
}

impl std::fmt::Display for StringValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl PartialEq for StringValue {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for StringValue {}

impl PartialOrd for StringValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StringValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.as_bytes().cmp(other.value.as_bytes())
    }
}

impl Hash for StringValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl AsRef<str> for StringValue {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl From<&str> for StringValue {
    fn from(s: &str) -> Self {
        Self::untainted(s)
    }
}

impl From<String> for StringValue {
    fn from(s: String) -> Self {
        Self::untainted(s)
    }
}

/// Detached byte-range view into a [`StringValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubString {
    owner: u64,
    generation: u64,
    start: usize,
    end: usize,
}

impl SubString {
    /// Whether `owner` is the unmodified string this view was taken from
    pub fn is_valid_for(&self, owner: &StringValue) -> bool {
        self.owner == owner.id && self.generation == owner.generation
    }

    /// Read the viewed text.
    pub fn get<'a>(&self, owner: &'a StringValue) -> ValueResult<&'a str> {
        if !self.is_valid_for(owner) {
            return Err(ValueError::StaleView);
        }
        owner
            .value
            .get(self.start..self.end)
            .ok_or(ValueError::StaleView)
    }

    /// Copy the viewed text into a new string
    pub fn to_string_value(&self, owner: &StringValue) -> ValueResult<StringValue> {
        self.get(owner).map(StringValue::untainted)
    }

    /// Byte range inside the owner's buffer
    pub fn byte_range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Read-only string.
///
/// Dereferences to [`StringValue`] by shared reference only, so none of the
/// `&mut self` operations can be reached through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstString(StringValue);

impl ConstString {
    /// Constants are built from external text and therefore sanitized.
    pub fn new(bytes: impl AsRef<[u8]>) -> Self {
        Self(StringValue::tainted(bytes))
    }

    /// Mutable copy of the constant
    pub fn to_string_value(&self) -> StringValue {
        self.0.clone()
    }
}

impl Deref for ConstString {
    type Target = StringValue;

    fn deref(&self) -> &StringValue {
        &self.0
    }
}

impl std::fmt::Display for ConstString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
