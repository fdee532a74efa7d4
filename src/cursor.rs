// src/cursor.rs
use crate::error::{PaxError, Result};

/// Tag at the start of every PAX block.
pub(crate) const PAX_TAG: &str = "PAX";
/// Tag for the number of bytes in one value.
pub(crate) const BPV_TAG: &str = "BYTES_PER_VALUE";
/// Tag for the number of values in one element.
pub(crate) const VPE_TAG: &str = "VALUES_PER_ELEMENT";
/// Legacy spelling of the first (fast) dimension tag.
pub(crate) const DIM1_TAG: &str = "ELEMENTS_IN_SEQUENTIAL_DIMENSION";
/// Legacy spelling of the second (slow) dimension tag.
pub(crate) const DIM2_TAG: &str = "ELEMENTS_IN_STRIDED_DIMENSION";
/// Tag at the end of the header, before the raster payload.
pub(crate) const DATALEN_TAG: &str = "DATA_LENGTH";

/// Classification of one header line, by its non-whitespace prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    Comment,
    Metadata,
    Tag,
    BytesPerValue,
    ValuesPerElement,
    Dimension(u8),
    DataLength,
    Unknown,
}

/// Skip policy applied around a numeric token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skip(u8);

impl Skip {
    pub const NOTHING: Skip = Skip(0);
    pub const DELIMITER: Skip = Skip(0x01);
    pub const LINEFEED: Skip = Skip(0x02);
    pub const ALL: Skip = Skip(0x03);

    fn delimiter(self) -> bool {
        self.0 & Self::DELIMITER.0 != 0
    }

    fn linefeed(self) -> bool {
        self.0 & Self::LINEFEED.0 != 0
    }
}

/// Position-tracking view over an immutable byte buffer.
///
/// All scanning and typed extraction during a parse goes through a `Cursor`.
/// Legal whitespace is space, tab and CR; linefeeds terminate lines and are
/// only consumed where a skip policy says so. The cursor borrows the buffer
/// and never outlives it.
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

fn is_ws(b: u8, skip_newline: bool) -> bool {
    b == b' ' || b == b'\t' || b == b'\r' || (skip_newline && b == b'\n')
}

/// Bytes that terminate a bare token: whitespace, delimiters, brackets,
/// a comment hash, or the end of the line.
fn is_token_stop(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'#' | b':' | b'=' | b'[' | b']')
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// The unconsumed tail of the buffer.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub(crate) fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    pub(crate) fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.buf.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.buf.len());
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.buf.len());
    }

    pub fn skip_whitespace(&mut self, skip_newline: bool) {
        while let Some(b) = self.peek() {
            if !is_ws(b, skip_newline) {
                break;
            }
            self.bump();
        }
    }

    /// Advance past the next linefeed. `Incomplete` when none remains.
    pub fn skip_to_next_line(&mut self) -> Result<()> {
        match self.remaining().iter().position(|&b| b == b'\n') {
            Some(i) => {
                self.pos += i + 1;
                Ok(())
            }
            None => {
                self.pos = self.buf.len();
                Err(PaxError::Incomplete)
            }
        }
    }

    /// Advance to the next token stop byte, optionally consuming a
    /// terminating linefeed.
    fn skip_junk(&mut self, skip_newline: bool) {
        while let Some(b) = self.peek() {
            if is_token_stop(b) {
                break;
            }
            self.bump();
        }
        if skip_newline && self.peek() == Some(b'\n') {
            self.bump();
        }
    }

    /// Required trailing junk/whitespace after a parsed token.
    pub(crate) fn finish_token(&mut self, skip_newline: bool) {
        self.skip_junk(skip_newline);
        self.skip_whitespace(skip_newline);
    }

    /// Skip whitespace, one `:` or `=` delimiter, then whitespace. The
    /// delimiter must occur before the end of the line.
    pub fn skip_delimiter(&mut self, skip_newline: bool) -> Result<()> {
        self.skip_whitespace(skip_newline);
        loop {
            match self.peek() {
                None => return Err(PaxError::Incomplete),
                Some(b':') | Some(b'=') => {
                    self.bump();
                    break;
                }
                Some(b'\n') => return Err(PaxError::MalformedNumber { offset: self.pos }),
                Some(_) => self.bump(),
            }
        }
        self.skip_whitespace(skip_newline);
        Ok(())
    }

    /// Scan forward to the next `:` or `=` on this line and consume it,
    /// leaving surrounding whitespace untouched. Used where the byte right
    /// after the delimiter is significant (string value space stripping).
    pub(crate) fn seek_past_delimiter(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                None => return Err(PaxError::Incomplete),
                Some(b':') | Some(b'=') => {
                    self.bump();
                    return Ok(());
                }
                Some(b'\n') => return Err(PaxError::MalformedNumber { offset: self.pos }),
                Some(_) => self.bump(),
            }
        }
    }

    /// Consume bytes up to the next token stop without any skipping around
    /// it; may return an empty slice.
    pub(crate) fn take_until_stop(&mut self) -> &'a [u8] {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_token_stop(b) {
                break;
            }
            self.bump();
        }
        &self.buf[start..self.pos]
    }

    /// Skip junk and whitespace, then the expected byte if present.
    /// Tolerates an absent byte, as the legacy scanner did.
    pub(crate) fn skip_expected(&mut self, expected: u8, skip_newline: bool) {
        self.finish_token(skip_newline);
        if self.peek() == Some(expected) {
            self.bump();
            self.skip_whitespace(skip_newline);
        }
    }

    /// Case-insensitive ASCII prefix test against the unconsumed buffer.
    pub(crate) fn starts_with_ci(&self, tag: &str) -> bool {
        let rest = self.remaining();
        rest.len() >= tag.len() && rest[..tag.len()].eq_ignore_ascii_case(tag.as_bytes())
    }

    /// Read one bare token, consuming leading whitespace (including
    /// linefeeds, so wrapped array rows parse like single lines). Returns
    /// the token and its byte offset.
    pub(crate) fn token(&mut self) -> Result<(&'a [u8], usize)> {
        self.skip_whitespace(true);
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_token_stop(b) {
                break;
            }
            self.bump();
        }
        if self.pos == start {
            if self.at_end() {
                return Err(PaxError::Incomplete);
            }
            return Err(PaxError::MalformedNumber { offset: start });
        }
        Ok((&self.buf[start..self.pos], start))
    }

    /// Consume the rest of the current line up to and including the
    /// linefeed; returns the content with any trailing CR removed.
    pub(crate) fn line_text(&mut self) -> Result<&'a [u8]> {
        let rest = self.remaining();
        let eol = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or(PaxError::Incomplete)?;
        let mut text = &rest[..eol];
        if text.last() == Some(&b'\r') {
            text = &text[..text.len() - 1];
        }
        self.pos += eol + 1;
        Ok(text)
    }

    /// Classify the line under the cursor, skipping leading whitespace.
    pub fn classify_line(&mut self) -> LineType {
        self.skip_whitespace(true);
        match self.peek() {
            None => LineType::Unknown,
            Some(b'#') => {
                if self.peek_at(1) == Some(b'#') {
                    LineType::Metadata
                } else {
                    LineType::Comment
                }
            }
            Some(_) => {
                if self.starts_with_ci(PAX_TAG) {
                    LineType::Tag
                } else if self.starts_with_ci(BPV_TAG) {
                    LineType::BytesPerValue
                } else if self.starts_with_ci(VPE_TAG) {
                    LineType::ValuesPerElement
                } else if self.starts_with_ci(DATALEN_TAG) {
                    LineType::DataLength
                } else if self.starts_with_ci(DIM1_TAG) {
                    LineType::Dimension(0)
                } else if self.starts_with_ci(DIM2_TAG) {
                    LineType::Dimension(1)
                } else {
                    LineType::Unknown
                }
            }
        }
    }

    pub fn read_u64(&mut self, skip: Skip) -> Result<u64> {
        if skip.delimiter() {
            self.skip_delimiter(skip.linefeed())?;
        }
        let (tok, off) = self.token()?;
        let val = parse_u64_token(tok).ok_or(PaxError::MalformedNumber { offset: off })?;
        self.finish_token(skip.linefeed());
        Ok(val)
    }

    pub fn read_u32(&mut self, skip: Skip) -> Result<u32> {
        if skip.delimiter() {
            self.skip_delimiter(skip.linefeed())?;
        }
        let (tok, off) = self.token()?;
        let val = parse_u64_token(tok)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or(PaxError::MalformedNumber { offset: off })?;
        self.finish_token(skip.linefeed());
        Ok(val)
    }

    pub fn read_i64(&mut self, skip: Skip) -> Result<i64> {
        if skip.delimiter() {
            self.skip_delimiter(skip.linefeed())?;
        }
        let (tok, off) = self.token()?;
        let val = parse_i64_token(tok).ok_or(PaxError::MalformedNumber { offset: off })?;
        self.finish_token(skip.linefeed());
        Ok(val)
    }

    pub fn read_f64(&mut self, skip: Skip) -> Result<f64> {
        if skip.delimiter() {
            self.skip_delimiter(skip.linefeed())?;
        }
        let (tok, off) = self.token()?;
        let val = parse_f64_token(tok).ok_or(PaxError::MalformedNumber { offset: off })?;
        self.finish_token(skip.linefeed());
        Ok(val)
    }

    pub fn read_f32(&mut self, skip: Skip) -> Result<f32> {
        if skip.delimiter() {
            self.skip_delimiter(skip.linefeed())?;
        }
        let (tok, off) = self.token()?;
        let val = parse_f32_token(tok).ok_or(PaxError::MalformedNumber { offset: off })?;
        self.finish_token(skip.linefeed());
        Ok(val)
    }
}

fn token_str(tok: &[u8]) -> Option<&str> {
    std::str::from_utf8(tok).ok()
}

fn split_sign(text: &str) -> (bool, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (false, rest)
    } else {
        (false, text)
    }
}

fn strip_hex_prefix(text: &str) -> Option<&str> {
    text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
}

/// Unsigned integer token; accepts a `0x` hex prefix like the legacy
/// `strtoul(_, _, 0)` did.
fn parse_u64_token(tok: &[u8]) -> Option<u64> {
    let text = token_str(tok)?;
    match strip_hex_prefix(text) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn parse_i64_token(tok: &[u8]) -> Option<i64> {
    let text = token_str(tok)?;
    let (neg, rest) = split_sign(text);
    match strip_hex_prefix(rest) {
        Some(hex) => {
            let mag = u64::from_str_radix(hex, 16).ok()?;
            let val = i64::try_from(mag).ok()?;
            Some(if neg { -val } else { val })
        }
        None => text.parse().ok(),
    }
}

/// Float token; hex integer text is accepted and converted, matching the
/// legacy `strtod` behavior relied on by existing files.
fn parse_f64_token(tok: &[u8]) -> Option<f64> {
    let text = token_str(tok)?;
    let (neg, rest) = split_sign(text);
    if let Some(hex) = strip_hex_prefix(rest) {
        let mag = u64::from_str_radix(hex, 16).ok()? as f64;
        return Some(if neg { -mag } else { mag });
    }
    text.parse().ok()
}

fn parse_f32_token(tok: &[u8]) -> Option<f32> {
    let text = token_str(tok)?;
    let (neg, rest) = split_sign(text);
    if let Some(hex) = strip_hex_prefix(rest) {
        let mag = u64::from_str_radix(hex, 16).ok()? as f32;
        return Some(if neg { -mag } else { mag });
    }
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_lines() {
        let mut cur = Cursor::new(b"# a comment\n");
        assert_eq!(cur.classify_line(), LineType::Comment);

        let mut cur = Cursor::new(b"## [float] pi = 3\n");
        assert_eq!(cur.classify_line(), LineType::Metadata);

        let mut cur = Cursor::new(b"PAX109 : v1.00 : PAX_FLOAT\n");
        assert_eq!(cur.classify_line(), LineType::Tag);

        let mut cur = Cursor::new(b"  bytes_per_value : 4\n");
        assert_eq!(cur.classify_line(), LineType::BytesPerValue);

        let mut cur = Cursor::new(b"Values_Per_Element : 1\n");
        assert_eq!(cur.classify_line(), LineType::ValuesPerElement);

        let mut cur = Cursor::new(b"ELEMENTS_IN_SEQUENTIAL_DIMENSION : 2\n");
        assert_eq!(cur.classify_line(), LineType::Dimension(0));

        let mut cur = Cursor::new(b"elements_in_strided_dimension : 2\n");
        assert_eq!(cur.classify_line(), LineType::Dimension(1));

        let mut cur = Cursor::new(b"DATA_LENGTH : 16\n");
        assert_eq!(cur.classify_line(), LineType::DataLength);

        let mut cur = Cursor::new(b"GARBAGE : 1\n");
        assert_eq!(cur.classify_line(), LineType::Unknown);
    }

    #[test]
    fn test_read_structural_value() {
        let mut cur = Cursor::new(b"BYTES_PER_VALUE : 4\nVALUES");
        assert_eq!(cur.classify_line(), LineType::BytesPerValue);
        assert_eq!(cur.read_u32(Skip::ALL).unwrap(), 4);
        // the skip policy consumed the linefeed; next line is ready
        assert!(cur.starts_with_ci("VALUES"));
    }

    #[test]
    fn test_read_float_stops_at_newline() {
        let mut cur = Cursor::new(b" 3.1416\nnext");
        assert_eq!(cur.read_f32(Skip::NOTHING).unwrap(), 3.1416);
        assert_eq!(cur.remaining(), b"\nnext");
    }

    #[test]
    fn test_read_values_across_lines() {
        // wrapped array rows: leading whitespace of a token may include LF
        let mut cur = Cursor::new(b" 1 2\n 3 4\n");
        let mut vals = Vec::new();
        for _ in 0..4 {
            vals.push(cur.read_i64(Skip::NOTHING).unwrap());
        }
        assert_eq!(vals, [1, 2, 3, 4]);
    }

    #[test]
    fn test_hex_tokens() {
        let mut cur = Cursor::new(b"0xFB29C8B3 ");
        assert_eq!(cur.read_f64(Skip::NOTHING).unwrap(), 4213819571.0);

        let mut cur = Cursor::new(b"0x10 ");
        assert_eq!(cur.read_u64(Skip::NOTHING).unwrap(), 16);

        let mut cur = Cursor::new(b"-0x10 ");
        assert_eq!(cur.read_i64(Skip::NOTHING).unwrap(), -16);
    }

    #[test]
    fn test_malformed_number() {
        let mut cur = Cursor::new(b"abc def\n");
        assert!(matches!(
            cur.read_f64(Skip::NOTHING),
            Err(PaxError::MalformedNumber { .. })
        ));
    }

    #[test]
    fn test_empty_token_at_end_is_incomplete() {
        let mut cur = Cursor::new(b"   ");
        assert!(matches!(cur.read_u32(Skip::NOTHING), Err(PaxError::Incomplete)));
    }

    #[test]
    fn test_out_of_range_is_malformed() {
        let mut cur = Cursor::new(b"4294967296 ");
        assert!(matches!(
            cur.read_u32(Skip::NOTHING),
            Err(PaxError::MalformedNumber { .. })
        ));
    }

    #[test]
    fn test_line_text_trims_cr() {
        let mut cur = Cursor::new(b"hello world\r\nrest");
        assert_eq!(cur.line_text().unwrap(), b"hello world");
        assert_eq!(cur.remaining(), b"rest");
    }

    #[test]
    fn test_skip_delimiter_requires_same_line() {
        let mut cur = Cursor::new(b"TAG 4\n");
        assert!(matches!(
            cur.skip_delimiter(false),
            Err(PaxError::MalformedNumber { .. })
        ));
    }

    #[test]
    fn test_skip_to_next_line() {
        let mut cur = Cursor::new(b"abc\ndef");
        cur.skip_to_next_line().unwrap();
        assert_eq!(cur.remaining(), b"def");
        assert!(matches!(cur.skip_to_next_line(), Err(PaxError::Incomplete)));
        assert!(cur.at_end());
    }
}
