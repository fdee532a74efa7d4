// src/header/mod.rs
mod parser;

pub use parser::{HeaderParser, ParsedHeader};

use crate::cursor::{BPV_TAG, VPE_TAG};
use crate::error::{PaxError, Result};
use crate::types::RasterType;

/// The structural fields of a PAX header.
///
/// Invariant on any accepted header:
/// `data_length == bytes_per_value * values_per_element * sequential * strided`,
/// and bpv/vpe agree with the type table for `raster_type`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterHeader {
    pub raster_type: RasterType,
    pub version: f32,
    pub bytes_per_value: u32,
    pub values_per_element: u32,
    /// Element count of the fast ("x") dimension.
    pub sequential: u32,
    /// Element count of the slow ("y") dimension.
    pub strided: u32,
    pub data_length: u64,
}

impl RasterHeader {
    /// Payload length implied by the type layout and dimensions.
    pub fn expected_data_length(&self) -> u64 {
        self.bytes_per_value as u64
            * self.values_per_element as u64
            * self.sequential as u64
            * self.strided as u64
    }

    /// Number of elements in the raster.
    pub fn element_count(&self) -> u64 {
        self.sequential as u64 * self.strided as u64
    }

    /// Consistency checks run after the full header has been consumed.
    pub fn validate(&self) -> Result<()> {
        let ty = self.raster_type;
        if self.bytes_per_value != ty.bytes_per_value() {
            return Err(PaxError::FieldMismatch {
                field: BPV_TAG,
                found: self.bytes_per_value as u64,
                expected: ty.bytes_per_value() as u64,
            });
        }
        if self.values_per_element != ty.values_per_element() {
            return Err(PaxError::FieldMismatch {
                field: VPE_TAG,
                found: self.values_per_element as u64,
                expected: ty.values_per_element() as u64,
            });
        }
        if self.data_length != self.expected_data_length() {
            return Err(PaxError::DataLengthMismatch {
                found: self.data_length,
                expected: self.expected_data_length(),
            });
        }
        Ok(())
    }
}
