//! Conversion between wire positions/ranges and provider-native LSP values.
//!
//! Every range that leaves the crate goes through [`WireRange`], regardless of
//! the shape the provider answered with. Columns are UTF-16 code units, as in
//! LSP, so slicing helpers here count code units rather than bytes.

use lsp_types::{Location, LocationLink, Position, Range, SymbolKind};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Zero-based `{line, character}` pair as it appears in tool arguments and results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WirePosition {
    /// Zero-based line index
    pub line: u32,
    /// Zero-based UTF-16 column
    pub character: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WireRange {
    pub start: WirePosition,
    pub end: WirePosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireLocation {
    pub uri: String,
    pub range: WireRange,
}

impl From<WirePosition> for Position {
    fn from(pos: WirePosition) -> Self {
        Position::new(pos.line, pos.character)
    }
}

impl From<Position> for WirePosition {
    fn from(pos: Position) -> Self {
        Self {
            line: pos.line,
            character: pos.character,
        }
    }
}

impl From<WireRange> for Range {
    fn from(range: WireRange) -> Self {
        Range::new(range.start.into(), range.end.into())
    }
}

impl From<Range> for WireRange {
    fn from(range: Range) -> Self {
        Self {
            start: range.start.into(),
            end: range.end.into(),
        }
    }
}

impl From<&Location> for WireLocation {
    fn from(location: &Location) -> Self {
        Self {
            uri: location.uri.as_str().to_string(),
            range: location.range.into(),
        }
    }
}

impl From<&LocationLink> for WireLocation {
    fn from(link: &LocationLink) -> Self {
        Self {
            uri: link.target_uri.as_str().to_string(),
            range: link.target_range.into(),
        }
    }
}

impl WireRange {
    /// Zero-width range at `pos`.
    pub fn point(pos: WirePosition) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }
}

/// Numeric LSP ordinal of a symbol kind (1-based, `File = 1`).
pub fn symbol_kind_ordinal(kind: SymbolKind) -> u32 {
    serde_json::to_value(kind)
        .ok()
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

/// Returns the substring of `line` starting at UTF-16 column `start` and
/// spanning `length` code units. Out-of-range spans are clamped to the line.
pub fn slice_utf16(line: &str, start: u32, length: u32) -> &str {
    let begin = byte_offset_utf16(line, start);
    let end = byte_offset_utf16(line, start.saturating_add(length));
    &line[begin..end.max(begin)]
}

fn byte_offset_utf16(line: &str, column: u32) -> usize {
    let mut units = 0u32;
    for (offset, ch) in line.char_indices() {
        if units >= column {
            return offset;
        }
        units += ch.len_utf16() as u32;
    }
    line.len()
}
