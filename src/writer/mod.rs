// src/writer/mod.rs
use std::fmt::Display;

use bytes::{BufMut, Bytes, BytesMut};
use log::debug;

use crate::cursor::{BPV_TAG, DATALEN_TAG, DIM1_TAG, DIM2_TAG, PAX_TAG, VPE_TAG};
use crate::metadata::{MetaArray, MetaEntry, MetaLocation, MetaValue, DIM_INDEX_TAGS};
use crate::raster::RasterFile;

/// Values per row before a multi-dimensional array wraps.
const MAX_ROW_VALUES: usize = 16;
/// Values per sub-row group within a wrapped row.
const MAX_SUBROW_VALUES: usize = 8;

/// Render a raster into the canonical byte layout: tag line, metadata
/// buckets interleaved with the structural tags, DATA_LENGTH, then the raw
/// payload. This is the parser's exact inverse for every value the store
/// can hold.
pub(crate) fn render(raster: &RasterFile) -> Bytes {
    let header = render_header(raster);
    let payload = raster.payload();

    let mut out = BytesMut::with_capacity(header.len() + payload.len());
    out.put_slice(header.as_bytes());
    out.put_slice(payload);

    debug!(
        "rendered {} header bytes and {} payload bytes",
        header.len(),
        payload.len()
    );

    out.freeze()
}

fn render_header(raster: &RasterFile) -> String {
    let header = raster.header();
    let ty = header.raster_type;
    let groups = raster.meta().grouped_by_location();
    let mut out = String::new();

    out.push_str(&format!(
        "{}{} : v{:.2} : {}\n",
        PAX_TAG,
        ty.id(),
        header.version,
        ty.wire_name()
    ));
    write_bucket(&mut out, &groups[MetaLocation::AfterTag.index()]);

    out.push_str(&format!("{} : {}\n", BPV_TAG, header.bytes_per_value));
    write_bucket(&mut out, &groups[MetaLocation::AfterBpv.index()]);

    out.push_str(&format!("{} : {}\n", VPE_TAG, header.values_per_element));
    write_bucket(&mut out, &groups[MetaLocation::AfterVpe.index()]);

    out.push_str(&format!("{} : {}\n", DIM1_TAG, header.sequential));
    write_bucket(&mut out, &groups[MetaLocation::AfterSequential.index()]);

    out.push_str(&format!("{} : {}\n", DIM2_TAG, header.strided));
    write_bucket(&mut out, &groups[MetaLocation::End.index()]);

    out.push_str(&format!("{} : {}\n", DATALEN_TAG, header.data_length));

    out
}

fn write_bucket(out: &mut String, entries: &[&MetaEntry]) {
    for entry in entries {
        write_entry(out, entry);
    }
}

fn write_entry(out: &mut String, entry: &MetaEntry) {
    match &entry.value {
        MetaValue::Comment { text, stripped } => {
            out.push('#');
            if *stripped {
                out.push(' ');
            }
            out.push_str(text);
            out.push('\n');
        }
        MetaValue::Str { text, stripped } => {
            out.push_str(&format!("## {:<11}{}", "[string]", entry.name));
            out.push_str(if *stripped { " = " } else { " =" });
            out.push_str(text);
            out.push('\n');
        }
        MetaValue::Float(array) => write_numeric(out, entry, array),
        MetaValue::Double(array) => write_numeric(out, entry, array),
        MetaValue::Int64(array) => write_numeric(out, entry, array),
        MetaValue::Uint64(array) => write_numeric(out, entry, array),
        MetaValue::Int32(array) => write_numeric(out, entry, array),
        MetaValue::Uint32(array) => write_numeric(out, entry, array),
        MetaValue::Int16(array) => write_numeric(out, entry, array),
        MetaValue::Uint16(array) => write_numeric(out, entry, array),
        MetaValue::Int8(array) => write_numeric(out, entry, array),
        MetaValue::Uint8(array) => write_numeric(out, entry, array),
    }
}

/// Numeric entries: `## [type]      name [ first = n ... ] = v0 v1 ...`.
///
/// Values use the shortest text that re-parses to the identical value, so
/// floats and doubles survive a write/read cycle bit-for-bit. Arrays with
/// more than one dimension wrap onto indented rows; within a row, values
/// group by sub-row with a widened gap.
fn write_numeric<T: Display + Copy>(out: &mut String, entry: &MetaEntry, array: &MetaArray<T>) {
    let tag = format!("[{}]", entry.value.meta_type().tag());
    out.push_str(&format!("## {:<11}{}", tag, entry.name));

    if !array.is_scalar() {
        out.push_str(" [");
        for (axis, dim) in array.dims().iter().enumerate() {
            out.push_str(&format!(" {} = {}", DIM_INDEX_TAGS[axis], dim));
        }
        out.push_str(" ]");
    }
    out.push_str(" =");

    let wrap = array.dims().len() > 1;
    let (row_len, subrow_len) = row_lengths(array.dims());
    for (i, value) in array.values().iter().enumerate() {
        if wrap && i % row_len == 0 {
            out.push_str("\n ");
        } else if wrap && subrow_len > 1 && i % subrow_len == 0 {
            out.push(' ');
        }
        out.push_str(&format!(" {value}"));
    }
    out.push('\n');
}

/// Row width for wrapped arrays: the product of leading dimensions, capped
/// at the first value reaching the row limit; the sub-row width is the
/// largest leading-dimension product under the sub-row limit.
fn row_lengths(dims: &[u32]) -> (usize, usize) {
    let mut row = 1usize;
    let mut subrow = 1usize;
    for &dim in dims {
        if row >= MAX_ROW_VALUES {
            break;
        }
        row *= dim as usize;
        if subrow * (dim as usize) < MAX_SUBROW_VALUES {
            subrow *= dim as usize;
        }
    }
    (row.max(1), subrow.max(1))
}
