// src/header/parser.rs
use log::{debug, warn};

use crate::cursor::{Cursor, LineType, Skip, BPV_TAG, DATALEN_TAG, DIM1_TAG, DIM2_TAG, PAX_TAG, VPE_TAG};
use crate::error::{ParseWarning, PaxError, Result};
use crate::header::RasterHeader;
use crate::metadata::{
    comment_name, MetaArray, MetaLocation, MetaScalar, MetaStore, MetaType, MetaValue,
    DIM_INDEX_TAGS,
};
use crate::types::{RasterType, PAX_FORMAT_VERSION};

/// Everything a successful header parse produces.
#[derive(Debug)]
pub struct ParsedHeader {
    pub header: RasterHeader,
    pub meta: MetaStore,
    pub warnings: Vec<ParseWarning>,
    /// Bytes consumed up to and including the DATA_LENGTH line's newline.
    pub header_len: usize,
}

/// Header parsing state machine.
///
/// Reads one line at a time off a [`Cursor`], dispatching on
/// [`LineType`]. Comments and metadata land in the store at whichever
/// bucket the most recent structural tag established. Unknown lines are
/// skipped without error for forward compatibility; running out of bytes
/// before `DATA_LENGTH` yields [`PaxError::Incomplete`] so chunked callers
/// can retry with more input.
pub struct HeaderParser<'a> {
    cur: Cursor<'a>,
    meta: MetaStore,
    warnings: Vec<ParseWarning>,
    loc: MetaLocation,
}

/// Occurrence counters for the required structural tags; each must end up
/// at exactly one.
#[derive(Default)]
struct TagCounts {
    bpv: u32,
    vpe: u32,
    dim0: u32,
    dim1: u32,
    datalen: u32,
}

impl TagCounts {
    fn validate(&self) -> Result<()> {
        let checks = [
            (BPV_TAG, self.bpv),
            (VPE_TAG, self.vpe),
            (DIM1_TAG, self.dim0),
            (DIM2_TAG, self.dim1),
            (DATALEN_TAG, self.datalen),
        ];
        for (tag, count) in checks {
            if count != 1 {
                return Err(PaxError::TagCount { tag, count });
            }
        }
        Ok(())
    }
}

impl<'a> HeaderParser<'a> {
    /// Parse a complete header from the start of `buf`.
    pub fn parse(buf: &'a [u8]) -> Result<ParsedHeader> {
        let mut parser = HeaderParser {
            cur: Cursor::new(buf),
            meta: MetaStore::new(),
            warnings: Vec::new(),
            loc: MetaLocation::AfterTag,
        };
        parser.run()
    }

    /// Parse a header from a partial buffer, considering only complete
    /// lines. A truncated header reports [`PaxError::Incomplete`]; callers
    /// append more bytes and retry.
    pub fn preview(buf: &'a [u8]) -> Result<ParsedHeader> {
        let end = buf
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|i| i + 1)
            .ok_or(PaxError::Incomplete)?;
        HeaderParser::parse(&buf[..end])
    }

    /// Read only the tag line: the declared type id and format version.
    pub fn preview_type(buf: &[u8]) -> Result<(RasterType, f32)> {
        let mut cur = Cursor::new(buf);
        parse_tag_line(&mut cur)
    }

    fn run(mut self) -> Result<ParsedHeader> {
        let (raster_type, version) = parse_tag_line(&mut self.cur)?;

        let mut counts = TagCounts::default();
        let mut bpv = 0u32;
        let mut vpe = 0u32;
        let mut sequential = 0u32;
        let mut strided = 0u32;
        let data_length;

        loop {
            if self.cur.at_end() {
                return Err(PaxError::Incomplete);
            }
            match self.cur.classify_line() {
                LineType::Tag => {
                    // a second PAX tag inside one header is a structural
                    // duplicate, not the start of metadata
                    return Err(PaxError::TagCount {
                        tag: PAX_TAG,
                        count: 2,
                    });
                }
                LineType::BytesPerValue => {
                    bpv = self.cur.read_u32(Skip::ALL)?;
                    counts.bpv += 1;
                    self.loc = MetaLocation::AfterBpv;
                }
                LineType::ValuesPerElement => {
                    vpe = self.cur.read_u32(Skip::ALL)?;
                    counts.vpe += 1;
                    self.loc = MetaLocation::AfterVpe;
                }
                LineType::Dimension(0) => {
                    sequential = self.cur.read_u32(Skip::ALL)?;
                    counts.dim0 += 1;
                    self.loc = MetaLocation::AfterSequential;
                }
                LineType::Dimension(_) => {
                    strided = self.cur.read_u32(Skip::ALL)?;
                    counts.dim1 += 1;
                    self.loc = MetaLocation::End;
                }
                LineType::DataLength => {
                    // the header ends exactly after this line's newline; a
                    // trailing-whitespace skip here would eat payload bytes
                    data_length = self.cur.read_u64(Skip::DELIMITER)?;
                    self.cur.skip_to_next_line()?;
                    counts.datalen += 1;
                    break;
                }
                LineType::Comment => self.read_comment()?,
                LineType::Metadata => self.read_named_meta()?,
                LineType::Unknown => {
                    if self.cur.at_end() {
                        return Err(PaxError::Incomplete);
                    }
                    // deliberate forward compatibility: the line (and any
                    // continuation lines) is skipped without error
                    self.cur.skip_to_next_line()?;
                }
            }
        }

        counts.validate()?;

        let header = RasterHeader {
            raster_type,
            version,
            bytes_per_value: bpv,
            values_per_element: vpe,
            sequential,
            strided,
            data_length,
        };
        header.validate()?;

        debug!(
            "parsed {} header: {}x{} elements, {} payload bytes, {} metadata entries",
            raster_type.wire_name(),
            sequential,
            strided,
            data_length,
            self.meta.len()
        );

        Ok(ParsedHeader {
            header,
            meta: self.meta,
            warnings: self.warnings,
            header_len: self.cur.offset(),
        })
    }

    /// A `#` line: trailing text stored verbatim under a generated name.
    fn read_comment(&mut self) -> Result<()> {
        self.cur.advance(1);
        let raw = self.cur.line_text()?;
        let (text, stripped) = strip_leading_space(raw);
        let text = String::from_utf8_lossy(text);

        let index = self.meta.next_index(self.loc);
        let name = comment_name(self.loc, index);
        self.meta
            .insert(name, self.loc, index, MetaValue::comment(&text, stripped));
        Ok(())
    }

    /// A `##` line: bracketed type tag, name, optional dimension clauses,
    /// delimiter, then one scalar or `product(dims)` values.
    fn read_named_meta(&mut self) -> Result<()> {
        self.cur.advance(2);
        self.cur.skip_expected(b'[', false);

        let tag_offset = self.cur.offset();
        let tag_raw = self.cur.take_until_stop();
        let tag = String::from_utf8_lossy(tag_raw).into_owned();
        let Some(meta_type) = MetaType::from_tag(&tag) else {
            // unknown type tags are skipped, not fatal
            warn!(
                "skipping metadata line: {}",
                PaxError::UnknownMetadataType { tag: tag.clone() }
            );
            self.warnings.push(ParseWarning::UnknownMetadataType {
                tag,
                offset: tag_offset,
            });
            return self.cur.skip_to_next_line();
        };
        self.cur.skip_expected(b']', false);

        let name_raw = self.cur.take_until_stop();
        let name = String::from_utf8_lossy(name_raw).into_owned();
        self.cur.skip_whitespace(false);

        // optional bracketed array shape: [ first = n second = m ... ]
        let mut dims: Vec<u32> = Vec::new();
        if self.cur.peek() == Some(b'[') {
            self.cur.advance(1);
            self.cur.skip_whitespace(false);
            for tag in DIM_INDEX_TAGS {
                if !self.cur.starts_with_ci(tag) {
                    break;
                }
                dims.push(self.cur.read_u32(Skip::DELIMITER)?);
            }
            self.cur.skip_expected(b']', false);
        }
        let count: usize = dims.iter().map(|&d| d as usize).product::<usize>().max(1);

        self.cur.seek_past_delimiter()?;

        let value = match meta_type {
            MetaType::String => {
                let raw = self.cur.line_text()?;
                let (text, stripped) = strip_leading_space(raw);
                // line_text consumed the terminating newline already
                return self.store(name, MetaValue::string(&String::from_utf8_lossy(text), stripped));
            }
            MetaType::Float => self.read_values(&dims, count, |p| p.cur.read_f32(Skip::NOTHING))?,
            MetaType::Double => self.read_values(&dims, count, |p| p.cur.read_f64(Skip::NOTHING))?,
            MetaType::Int64 => self.read_values(&dims, count, |p| p.next_signed::<i64>())?,
            MetaType::Int32 => self.read_values(&dims, count, |p| p.next_signed::<i32>())?,
            MetaType::Int16 => self.read_values(&dims, count, |p| p.next_signed::<i16>())?,
            MetaType::Int8 => self.read_values(&dims, count, |p| p.next_signed::<i8>())?,
            MetaType::Uint64 => self.read_values(&dims, count, |p| p.next_unsigned::<u64>())?,
            MetaType::Uint32 => self.read_values(&dims, count, |p| p.next_unsigned::<u32>())?,
            MetaType::Uint16 => self.read_values(&dims, count, |p| p.next_unsigned::<u16>())?,
            MetaType::Uint8 => self.read_values(&dims, count, |p| p.next_unsigned::<u8>())?,
            MetaType::Comment => unreachable!("comments have no bracketed type tag"),
        };
        self.cur.skip_to_next_line()?;
        self.store(name, value)
    }

    fn store(&mut self, name: String, value: MetaValue) -> Result<()> {
        let index = self.meta.next_index(self.loc);
        self.meta.insert(name, self.loc, index, value);
        Ok(())
    }

    fn read_values<T: MetaScalar>(
        &mut self,
        dims: &[u32],
        count: usize,
        mut next: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<MetaValue> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(next(self)?);
        }
        Ok(T::wrap(MetaArray::from_parts(dims, values)?))
    }

    /// Signed integer narrowed to the declared width; out-of-range text is
    /// malformed, not silently truncated.
    fn next_signed<T: TryFrom<i64>>(&mut self) -> Result<T> {
        let offset = self.cur.offset();
        let wide = self.cur.read_i64(Skip::NOTHING)?;
        T::try_from(wide).map_err(|_| PaxError::MalformedNumber { offset })
    }

    fn next_unsigned<T: TryFrom<u64>>(&mut self) -> Result<T> {
        let offset = self.cur.offset();
        let wide = self.cur.read_u64(Skip::NOTHING)?;
        T::try_from(wide).map_err(|_| PaxError::MalformedNumber { offset })
    }
}

/// Strip the single leading space legacy writers put before text payloads,
/// remembering whether it was there so the writer can reproduce it.
fn strip_leading_space(raw: &[u8]) -> (&[u8], bool) {
    match raw.first() {
        Some(b' ') => (&raw[1..], true),
        _ => (raw, false),
    }
}

/// Parse the tag line: `PAX<id> : v<version> : <name>`. The trailing type
/// name is informational and not verified, as in the legacy reader. The
/// version clause is optional (files predating it carry none).
fn parse_tag_line(cur: &mut Cursor<'_>) -> Result<(RasterType, f32)> {
    cur.skip_whitespace(true);
    if !cur.starts_with_ci(PAX_TAG) {
        return Err(PaxError::InvalidTag {
            found: preview_text(cur.remaining()),
        });
    }
    cur.advance(PAX_TAG.len());

    let id_offset = cur.offset();
    let id = match cur.read_i64(Skip::NOTHING) {
        Ok(wide) => {
            i32::try_from(wide).map_err(|_| PaxError::MalformedNumber { offset: id_offset })?
        }
        Err(PaxError::Incomplete) => return Err(PaxError::Incomplete),
        Err(_) => {
            return Err(PaxError::InvalidTag {
                found: preview_text(cur.remaining()),
            })
        }
    };
    let raster_type = RasterType::from_id(id).ok_or_else(|| PaxError::InvalidTag {
        found: format!("PAX{id}"),
    })?;

    let mut version = PAX_FORMAT_VERSION;
    let mark = cur.position();
    match cur.skip_delimiter(false) {
        Ok(()) => {
            if matches!(cur.peek(), Some(b'v') | Some(b'V')) {
                cur.advance(1);
                cur.skip_whitespace(false);
                version = cur.read_f32(Skip::NOTHING)?;
            }
        }
        Err(PaxError::MalformedNumber { .. }) => {
            // bare `PAX<id>` line without delimiter or version
            cur.set_position(mark);
        }
        Err(other) => return Err(other),
    }
    cur.skip_to_next_line()?;

    Ok((raster_type, version))
}

/// A short printable excerpt for tag errors.
fn preview_text(rest: &[u8]) -> String {
    let head = &rest[..rest.len().min(32)];
    let text = String::from_utf8_lossy(head);
    match text.find('\n') {
        Some(eol) => text[..eol].to_string(),
        None => text.into_owned(),
    }
}
