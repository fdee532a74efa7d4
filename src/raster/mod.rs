// src/raster/mod.rs
use std::io::Read;
use std::path::Path;

use bytemuck::Pod;
use bytes::{Bytes, BytesMut};
use log::debug;

use crate::error::{ParseWarning, PaxError, Result};
use crate::header::{HeaderParser, RasterHeader};
use crate::metadata::{
    comment_name, MetaArray, MetaLocation, MetaScalar, MetaStore, MetaType, MetaValue,
};
use crate::types::{RasterType, PAX_FORMAT_VERSION};
use crate::writer;

/// How many bytes of a file to read when only the tag line is wanted.
const PREVIEW_CHUNK: usize = 4096;

/// A PAX raster: one typed 2-D payload plus its metadata.
///
/// The payload is stored column-major: the sequential ("x") dimension is
/// fast, the strided ("y") dimension is slow. A `RasterFile` exclusively
/// owns its payload and metadata store; importing replaces both wholesale.
///
/// # Example
///
/// ```
/// use pax_rs::{RasterFile, RasterType};
///
/// # fn main() -> pax_rs::Result<()> {
/// let mut raster = RasterFile::with_data(RasterType::Float, 2, 2, &[1.0f32, 2.0, 3.0, 4.0])?;
/// raster.add_meta("gain", 0.5f32);
///
/// let bytes = raster.export_bytes();
/// let back = RasterFile::from_bytes(&bytes)?;
/// assert_eq!(back.element::<f32>(1, 0)?, 2.0);
/// assert_eq!(back.get_meta::<f32>("gain")?, 0.5);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RasterFile {
    raster_type: RasterType,
    version: f32,
    sequential: u32,
    strided: u32,
    meta: MetaStore,
    data: BytesMut,
    current_loc: MetaLocation,
    warnings: Vec<ParseWarning>,
    imported_len: usize,
}

impl RasterFile {
    /// Create a zero-filled raster of the given type and dimensions.
    pub fn new(raster_type: RasterType, sequential: u32, strided: u32) -> Result<RasterFile> {
        let element_size = raster_type.element_size();
        if element_size == 0 {
            return Err(PaxError::InvalidType(raster_type.id()));
        }
        let len = element_size * sequential as usize * strided as usize;
        Ok(RasterFile {
            raster_type,
            version: PAX_FORMAT_VERSION,
            sequential,
            strided,
            meta: MetaStore::new(),
            data: BytesMut::zeroed(len),
            current_loc: MetaLocation::End,
            warnings: Vec::new(),
            imported_len: 0,
        })
    }

    /// Create a raster initialized from a typed element slice.
    pub fn with_data<T: Pod>(
        raster_type: RasterType,
        sequential: u32,
        strided: u32,
        data: &[T],
    ) -> Result<RasterFile> {
        let mut raster = RasterFile::new(raster_type, sequential, strided)?;
        raster.check_element_type::<T>()?;
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if bytes.len() != raster.data.len() {
            return Err(PaxError::BufferTooShort {
                expected: raster.data.len(),
                available: bytes.len(),
            });
        }
        raster.data.copy_from_slice(bytes);
        Ok(raster)
    }

    /// A payload-free raster carrying only metadata (`PAX_META_ONLY`).
    pub fn meta_only() -> RasterFile {
        RasterFile {
            raster_type: RasterType::MetaOnly,
            version: PAX_FORMAT_VERSION,
            sequential: 0,
            strided: 0,
            meta: MetaStore::new(),
            data: BytesMut::new(),
            current_loc: MetaLocation::End,
            warnings: Vec::new(),
            imported_len: 0,
        }
    }

    /// Parse one raster from the front of `buf`.
    pub fn from_bytes(buf: &[u8]) -> Result<RasterFile> {
        let mut raster = RasterFile::meta_only();
        raster.import(buf)?;
        Ok(raster)
    }

    pub fn raster_type(&self) -> RasterType {
        self.raster_type
    }

    pub fn version(&self) -> f32 {
        self.version
    }

    /// Element count of the fast ("x") dimension.
    pub fn sequential(&self) -> u32 {
        self.sequential
    }

    /// Element count of the slow ("y") dimension.
    pub fn strided(&self) -> u32 {
        self.strided
    }

    pub fn element_count(&self) -> u64 {
        self.sequential as u64 * self.strided as u64
    }

    /// The raw payload, column-major, native-endian.
    pub fn payload(&self) -> &[u8] {
        &self.data
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn meta(&self) -> &MetaStore {
        &self.meta
    }

    /// Recoverable diagnostics from the most recent import.
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// Header + payload bytes consumed by the most recent import.
    pub fn imported_len(&self) -> usize {
        self.imported_len
    }

    /// The structural header this raster serializes to.
    pub fn header(&self) -> RasterHeader {
        let ty = self.raster_type;
        let mut header = RasterHeader {
            raster_type: ty,
            version: self.version,
            bytes_per_value: ty.bytes_per_value(),
            values_per_element: ty.values_per_element(),
            sequential: self.sequential,
            strided: self.strided,
            data_length: 0,
        };
        header.data_length = header.expected_data_length();
        header
    }

    fn check_element_type<T: Pod>(&self) -> Result<()> {
        let element_size = self.raster_type.element_size();
        if std::mem::size_of::<T>() != element_size {
            return Err(PaxError::TypeMismatch {
                expected: format!(
                    "{}-byte element ({})",
                    element_size,
                    self.raster_type.wire_name()
                ),
                found: format!(
                    "{}-byte {}",
                    std::mem::size_of::<T>(),
                    std::any::type_name::<T>()
                ),
            });
        }
        Ok(())
    }

    fn element_offset(&self, x: u32, y: u32) -> Result<usize> {
        if x >= self.sequential {
            return Err(PaxError::IndexOutOfBounds {
                index: x as u64,
                bound: self.sequential as u64,
                axis: "sequential dimension",
            });
        }
        if y >= self.strided {
            return Err(PaxError::IndexOutOfBounds {
                index: y as u64,
                bound: self.strided as u64,
                axis: "strided dimension",
            });
        }
        let index = x as usize + y as usize * self.sequential as usize;
        Ok(index * self.raster_type.element_size())
    }

    /// Read the element at `(x, y)`: `x` indexes the fast dimension. The
    /// requested Rust type must match the element footprint exactly; an
    /// out-of-range coordinate is an error, never a stale reference.
    pub fn element<T: Pod>(&self, x: u32, y: u32) -> Result<T> {
        self.check_element_type::<T>()?;
        let offset = self.element_offset(x, y)?;
        let size = std::mem::size_of::<T>();
        Ok(bytemuck::pod_read_unaligned(&self.data[offset..offset + size]))
    }

    /// Row/column access: exactly [`RasterFile::element`] transposed.
    pub fn element_rc<T: Pod>(&self, row: u32, col: u32) -> Result<T> {
        self.element(col, row)
    }

    pub fn set_element<T: Pod>(&mut self, x: u32, y: u32, value: T) -> Result<()> {
        self.check_element_type::<T>()?;
        let offset = self.element_offset(x, y)?;
        let size = std::mem::size_of::<T>();
        self.data[offset..offset + size].copy_from_slice(bytemuck::bytes_of(&value));
        Ok(())
    }

    pub fn set_element_rc<T: Pod>(&mut self, row: u32, col: u32, value: T) -> Result<()> {
        self.set_element(col, row, value)
    }

    /// Add a comment at the current default bucket.
    pub fn add_comment(&mut self, text: &str) {
        self.add_comment_at(self.current_loc, text);
    }

    /// Add a comment at an explicit bucket, which becomes the new default.
    pub fn add_comment_at(&mut self, location: MetaLocation, text: &str) {
        let index = self.meta.next_index(location);
        let name = comment_name(location, index);
        // an empty comment renders as a bare '#' with no trailing space
        let stripped = !text.is_empty();
        self.meta
            .insert(name, location, index, MetaValue::comment(text, stripped));
        self.current_loc = location;
    }

    /// Add or replace named metadata at the current default bucket.
    ///
    /// Names are unique; re-adding a name replaces value AND type, and the
    /// entry moves to the position being inserted at. True positional
    /// insertion is deliberately unsupported.
    pub fn add_meta(&mut self, name: impl Into<String>, value: impl Into<MetaValue>) {
        self.add_meta_at(self.current_loc, name, value);
    }

    /// Add or replace named metadata at an explicit bucket, which becomes
    /// the new default.
    pub fn add_meta_at(
        &mut self,
        location: MetaLocation,
        name: impl Into<String>,
        value: impl Into<MetaValue>,
    ) {
        let index = self.meta.next_index(location);
        self.meta.insert(name.into(), location, index, value.into());
        self.current_loc = location;
    }

    /// Add or replace an N-dimensional metadata array (up to 4 dims,
    /// values flattened first-dimension-fastest).
    pub fn add_meta_array<T: MetaScalar>(
        &mut self,
        name: impl Into<String>,
        dims: &[u32],
        values: impl IntoIterator<Item = T>,
    ) -> Result<()> {
        let value = T::wrap(MetaArray::from_parts(dims, values)?);
        self.add_meta(name, value);
        Ok(())
    }

    /// Typed scalar metadata read-back. Reading under the wrong declared
    /// type or reading an array as a scalar is a [`PaxError::TypeMismatch`].
    pub fn get_meta<T: MetaScalar>(&self, name: &str) -> Result<T> {
        let array = self.get_meta_array::<T>(name)?;
        array.as_scalar().ok_or_else(|| PaxError::TypeMismatch {
            expected: "scalar".to_string(),
            found: "array".to_string(),
        })
    }

    /// Typed metadata array element read-back.
    pub fn get_meta_at<T: MetaScalar>(&self, name: &str, indices: &[u32]) -> Result<T> {
        self.get_meta_array::<T>(name)?.get(indices)
    }

    /// The whole typed array behind a metadata name.
    pub fn get_meta_array<T: MetaScalar>(&self, name: &str) -> Result<&MetaArray<T>> {
        let entry = self
            .meta
            .get(name)
            .ok_or_else(|| PaxError::NotFound(name.to_string()))?;
        T::as_array(&entry.value).ok_or_else(|| PaxError::TypeMismatch {
            expected: T::META_TYPE.label().to_string(),
            found: entry.value.meta_type().label().to_string(),
        })
    }

    /// String or comment text read-back.
    pub fn get_meta_str(&self, name: &str) -> Result<&str> {
        let entry = self
            .meta
            .get(name)
            .ok_or_else(|| PaxError::NotFound(name.to_string()))?;
        entry.value.text().ok_or_else(|| PaxError::TypeMismatch {
            expected: MetaType::String.label().to_string(),
            found: entry.value.meta_type().label().to_string(),
        })
    }

    /// Declared type of a metadata entry, if present.
    pub fn meta_type_of(&self, name: &str) -> Option<MetaType> {
        self.meta.get(name).map(|entry| entry.value.meta_type())
    }

    /// Parse one raster from the front of `buf`, replacing this raster's
    /// state. Returns the total header + payload bytes consumed so callers
    /// can walk concatenated multi-raster streams. No partial state
    /// survives a failed import.
    pub fn import(&mut self, buf: &[u8]) -> Result<usize> {
        let parsed = HeaderParser::parse(buf)?;

        let expected = parsed.header.data_length as usize;
        let available = buf.len() - parsed.header_len;
        if available < expected {
            return Err(PaxError::BufferTooShort {
                expected,
                available,
            });
        }
        let payload = &buf[parsed.header_len..parsed.header_len + expected];

        self.raster_type = parsed.header.raster_type;
        self.version = parsed.header.version;
        self.sequential = parsed.header.sequential;
        self.strided = parsed.header.strided;
        self.meta = parsed.meta;
        self.data = BytesMut::from(payload);
        self.current_loc = MetaLocation::End;
        self.warnings = parsed.warnings;
        self.imported_len = parsed.header_len + expected;

        debug!(
            "imported {} raster: {} header bytes + {} payload bytes",
            self.raster_type.wire_name(),
            parsed.header_len,
            expected
        );

        Ok(self.imported_len)
    }

    /// Split a concatenated stream into its rasters. Each block
    /// self-describes, so no type list is needed up front.
    pub fn import_all(buf: &[u8]) -> Result<Vec<RasterFile>> {
        let mut rasters = Vec::new();
        let mut pos = 0;
        while pos < buf.len() {
            let mut raster = RasterFile::meta_only();
            pos += raster.import(&buf[pos..])?;
            rasters.push(raster);
        }
        Ok(rasters)
    }

    /// Serialize to the canonical byte layout: header, then raw payload.
    pub fn export_bytes(&self) -> Bytes {
        writer::render(self)
    }

    /// Identify the raster type from the tag line alone.
    pub fn preview_type(buf: &[u8]) -> Result<RasterType> {
        HeaderParser::preview_type(buf).map(|(raster_type, _)| raster_type)
    }

    /// Parse only the header from a possibly partial buffer. Returns
    /// [`PaxError::Incomplete`] until enough bytes have arrived.
    pub fn preview_header(buf: &[u8]) -> Result<RasterHeader> {
        HeaderParser::preview(buf).map(|parsed| parsed.header)
    }

    /// Read and parse a whole PAX file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<RasterFile> {
        let buf = std::fs::read(path)?;
        RasterFile::from_bytes(&buf)
    }

    /// Write the serialized raster to a file.
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.export_bytes())?;
        Ok(())
    }

    /// Identify a file's raster type reading only its first chunk.
    pub fn preview_type_of_path(path: impl AsRef<Path>) -> Result<RasterType> {
        let file = std::fs::File::open(path)?;
        let mut head = Vec::with_capacity(PREVIEW_CHUNK);
        file.take(PREVIEW_CHUNK as u64).read_to_end(&mut head)?;
        RasterFile::preview_type(&head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Float3;

    #[test]
    fn test_new_is_zero_filled() {
        let raster = RasterFile::new(RasterType::Double, 3, 2).unwrap();
        assert_eq!(raster.payload().len(), 48);
        assert_eq!(raster.element::<f64>(2, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_column_major_indexing() {
        let raster =
            RasterFile::with_data(RasterType::Uchar, 2, 2, &[10u8, 11, 12, 13]).unwrap();
        assert_eq!(raster.element::<u8>(0, 0).unwrap(), 10);
        assert_eq!(raster.element::<u8>(1, 0).unwrap(), 11);
        assert_eq!(raster.element::<u8>(0, 1).unwrap(), 12);
        // row/col is the x/y transpose
        assert_eq!(raster.element_rc::<u8>(1, 0).unwrap(), 12);
        assert_eq!(raster.element_rc::<u8>(1, 1).unwrap(), 13);
    }

    #[test]
    fn test_bounds_are_checked() {
        let raster = RasterFile::new(RasterType::Float, 2, 2).unwrap();
        assert!(matches!(
            raster.element::<f32>(2, 0),
            Err(PaxError::IndexOutOfBounds { axis: "sequential dimension", .. })
        ));
        assert!(matches!(
            raster.element::<f32>(0, 5),
            Err(PaxError::IndexOutOfBounds { axis: "strided dimension", .. })
        ));
    }

    #[test]
    fn test_element_type_is_checked() {
        let raster = RasterFile::new(RasterType::Float, 2, 2).unwrap();
        assert!(matches!(
            raster.element::<f64>(0, 0),
            Err(PaxError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_set_element() {
        let mut raster = RasterFile::new(RasterType::Int, 2, 2).unwrap();
        raster.set_element(1, 1, -7i32).unwrap();
        assert_eq!(raster.element::<i32>(1, 1).unwrap(), -7);
        assert_eq!(raster.element::<i32>(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_float3_elements() {
        let mut raster = RasterFile::new(RasterType::Float3, 2, 1).unwrap();
        raster
            .set_element(1, 0, Float3::new(1.0, 2.0, 3.0))
            .unwrap();
        assert_eq!(raster.element::<Float3>(1, 0).unwrap().z, 3.0);
    }

    #[test]
    fn test_zero_footprint_type_rejected() {
        assert!(matches!(
            RasterFile::new(RasterType::MetaOnly, 2, 2),
            Err(PaxError::InvalidType(199))
        ));
    }

    #[test]
    fn test_wrong_data_length_rejected() {
        assert!(RasterFile::with_data(RasterType::Float, 2, 2, &[1.0f32; 3]).is_err());
    }

    #[test]
    fn test_typed_meta_overwrite_changes_type() {
        let mut raster = RasterFile::meta_only();
        raster.add_meta("pi", 3.1416f32);
        assert_eq!(raster.get_meta::<f32>("pi").unwrap(), 3.1416);

        raster.add_meta("pi", 3.14159265358979f64);
        assert_eq!(raster.meta_type_of("pi"), Some(MetaType::Double));
        assert!(matches!(
            raster.get_meta::<f32>("pi"),
            Err(PaxError::TypeMismatch { .. })
        ));
        assert_eq!(raster.get_meta::<f64>("pi").unwrap(), 3.14159265358979);
    }

    #[test]
    fn test_meta_array_access() {
        let mut raster = RasterFile::meta_only();
        raster
            .add_meta_array("grid", &[2, 2], [1i32, 2, 3, 4])
            .unwrap();
        assert_eq!(raster.get_meta_at::<i32>("grid", &[0, 1]).unwrap(), 3);
        assert!(matches!(
            raster.get_meta::<i32>("grid"),
            Err(PaxError::TypeMismatch { .. })
        ));
        assert!(matches!(
            raster.get_meta_at::<i32>("grid", &[0, 2]),
            Err(PaxError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_missing_meta_is_not_found() {
        let raster = RasterFile::meta_only();
        assert!(matches!(
            raster.get_meta::<f64>("nope"),
            Err(PaxError::NotFound(_))
        ));
    }
}
