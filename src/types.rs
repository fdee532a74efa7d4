// src/types.rs
use bytemuck::{Pod, Zeroable};

use crate::error::{PaxError, Result};

/// The PAX format version this library reads and writes.
pub const PAX_FORMAT_VERSION: f32 = 1.00;

/// One row of the raster type table.
///
/// The table is the single source of truth for per-type layout data; the
/// parser, writer and container all consult it through [`RasterType`] and
/// never carry their own copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub id: i32,
    pub bytes_per_value: u32,
    pub values_per_element: u32,
    pub name: &'static str,
}

/// PAX raster element type enumeration.
///
/// Ids, sizes and wire names follow the legacy type table. Ids with a zero
/// element footprint other than `MetaOnly`, and the netpbm passthrough ids,
/// are not representable and are rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RasterType {
    MagU8 = 0,
    MagPhaseU16 = 1,
    ComplexU16 = 2,
    ComplexU32 = 3,
    ComplexU64 = 4,
    MagI8 = 5,
    MagPhaseI16 = 6,
    ComplexI16 = 7,
    ComplexI32 = 8,
    ComplexI64 = 9,
    ComplexF32 = 10,
    ComplexF64 = 11,
    MagPhaseU8 = 12,
    MagPhaseI8 = 13,
    RgbU8 = 14,
    HsvU8 = 15,
    Char = 100,
    Uchar = 101,
    Short = 102,
    Ushort = 103,
    Int = 104,
    Uint = 105,
    Long = 106,
    Ulong = 107,
    Half = 108,
    Float = 109,
    Double = 110,
    Quadruple = 111,
    MetaOnly = 199,
    Float3 = 200,
}

macro_rules! type_table {
    ($( ($variant:ident, $id:literal, $bpv:literal, $vpe:literal, $name:literal) ),+ $(,)?) => {
        static TYPE_TABLE: &[(RasterType, TypeDescriptor)] = &[
            $(
                (RasterType::$variant, TypeDescriptor {
                    id: $id,
                    bytes_per_value: $bpv,
                    values_per_element: $vpe,
                    name: $name,
                }),
            )+
        ];
    };
}

type_table![
    (MagU8, 0, 1, 1, "PAX_SF_MAG_UCHAR"),
    (MagPhaseU16, 1, 2, 2, "PAX_SF_MAG_PHASE_USHORT"),
    (ComplexU16, 2, 2, 2, "PAX_SF_COMPLEX_USHORT"),
    (ComplexU32, 3, 4, 2, "PAX_SF_COMPLEX_UINT"),
    (ComplexU64, 4, 8, 2, "PAX_SF_COMPLEX_ULONG"),
    (MagI8, 5, 1, 1, "PAX_SF_MAG_CHAR"),
    (MagPhaseI16, 6, 2, 2, "PAX_SF_MAG_PHASE_SHORT"),
    (ComplexI16, 7, 2, 2, "PAX_SF_COMPLEX_SHORT"),
    (ComplexI32, 8, 4, 2, "PAX_SF_COMPLEX_INT"),
    (ComplexI64, 9, 8, 2, "PAX_SF_COMPLEX_LONG"),
    (ComplexF32, 10, 4, 2, "PAX_SF_COMPLEX_SINGLE"),
    (ComplexF64, 11, 8, 2, "PAX_SF_COMPLEX_DOUBLE"),
    (MagPhaseU8, 12, 1, 2, "PAX_SF_MAG_PHASE_UCHAR"),
    (MagPhaseI8, 13, 1, 2, "PAX_SF_MAG_PHASE_CHAR"),
    (RgbU8, 14, 1, 3, "PAX_SF_RGB_UCHAR"),
    (HsvU8, 15, 1, 3, "PAX_SF_HSV_UCHAR"),
    (Char, 100, 1, 1, "PAX_CHAR"),
    (Uchar, 101, 1, 1, "PAX_UCHAR"),
    (Short, 102, 2, 1, "PAX_SHORT"),
    (Ushort, 103, 2, 1, "PAX_USHORT"),
    (Int, 104, 4, 1, "PAX_INT"),
    (Uint, 105, 4, 1, "PAX_UINT"),
    (Long, 106, 8, 1, "PAX_LONG"),
    (Ulong, 107, 8, 1, "PAX_ULONG"),
    (Half, 108, 2, 1, "PAX_HALF"),
    (Float, 109, 4, 1, "PAX_FLOAT"),
    (Double, 110, 8, 1, "PAX_DOUBLE"),
    (Quadruple, 111, 16, 1, "PAX_QUADRUPLE"),
    (MetaOnly, 199, 0, 0, "PAX_META_ONLY"),
    (Float3, 200, 4, 3, "PAX_FLOAT3"),
];

impl RasterType {
    /// Look up a raster type by its numeric id from a tag line.
    pub fn from_id(id: i32) -> Option<RasterType> {
        TYPE_TABLE
            .iter()
            .find(|(_, desc)| desc.id == id)
            .map(|(ty, _)| *ty)
    }

    /// The table row for this type.
    pub fn descriptor(self) -> &'static TypeDescriptor {
        &TYPE_TABLE
            .iter()
            .find(|(ty, _)| *ty == self)
            .expect("every RasterType variant has a table row")
            .1
    }

    /// Numeric id as written in the tag line.
    pub fn id(self) -> i32 {
        self.descriptor().id
    }

    /// Bytes per value for this type.
    pub fn bytes_per_value(self) -> u32 {
        self.descriptor().bytes_per_value
    }

    /// Values per element for this type.
    pub fn values_per_element(self) -> u32 {
        self.descriptor().values_per_element
    }

    /// Total byte footprint of one element (bpv * vpe).
    pub fn element_size(self) -> usize {
        let desc = self.descriptor();
        desc.bytes_per_value as usize * desc.values_per_element as usize
    }

    /// Canonical type name as written in the tag line.
    pub fn wire_name(self) -> &'static str {
        self.descriptor().name
    }

    /// A meta-only raster carries no payload at all.
    pub fn is_meta_only(self) -> bool {
        self == RasterType::MetaOnly
    }

    /// Like [`RasterType::from_id`] but returns a typed error for the parser.
    pub(crate) fn try_from_id(id: i32) -> Result<RasterType> {
        RasterType::from_id(id).ok_or(PaxError::InvalidType(id))
    }
}

/// Element type for `PAX_FLOAT3` rasters: three packed floats per element.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Float3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Float3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Float3 { x, y, z }
    }
}
