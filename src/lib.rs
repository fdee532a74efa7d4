// src/lib.rs
//! # pax-rs
//!
//! A Rust library for reading and writing PAX (Portable Arbitrary map
//! eXtended) files: a self-describing format pairing a human-readable text
//! header (comments, typed metadata, dimension tags) with a trailing binary
//! raster payload. The design is based on the pam format from netpbm.
//!
//! ## Features
//!
//! - **Round-trip exact**: every written value is recovered bit-for-bit
//!   (floats/doubles) or value-for-value (integers) after a write/read cycle
//! - **Strongly typed**: a fixed raster type table plus eleven metadata
//!   types, all checked at access time
//! - **Deterministic parsing**: malformed input is rejected with a typed
//!   error; no silently-wrong values, no global status state
//! - **Streaming friendly**: header preview over partial buffers, and
//!   concatenated multi-raster streams via consumed-length accounting
//!
//! ## Quick Start
//!
//! ### Building and exporting a raster
//!
//! ```rust
//! use pax_rs::*;
//!
//! fn main() -> Result<()> {
//!     let data = [158.98166f32, 171.61903, 160.06989, 148.83504];
//!     let mut raster = RasterFile::with_data(RasterType::Float, 2, 2, &data)?;
//!
//!     raster.add_comment("two-by-two sample");
//!     raster.add_meta("pi", 3.1416f32);
//!
//!     let bytes = raster.export_bytes();
//!     assert!(bytes.starts_with(b"PAX109 : v1.00 : PAX_FLOAT\n"));
//!     Ok(())
//! }
//! ```
//!
//! ### Importing
//!
//! ```rust
//! use pax_rs::*;
//!
//! fn main() -> Result<()> {
//!     # let bytes = {
//!     #     let mut r = RasterFile::with_data(RasterType::Float, 2, 2,
//!     #         &[158.98166f32, 171.61903, 160.06989, 148.83504])?;
//!     #     r.add_meta("pi", 3.1416f32);
//!     #     r.export_bytes()
//!     # };
//!     // identify the type without parsing the whole header
//!     assert_eq!(RasterFile::preview_type(&bytes)?, RasterType::Float);
//!
//!     let raster = RasterFile::from_bytes(&bytes)?;
//!     assert_eq!(raster.element::<f32>(0, 0)?, 158.98166);
//!     assert_eq!(raster.get_meta::<f32>("pi")?, 3.1416);
//!     Ok(())
//! }
//! ```
//!
//! ### Files
//!
//! ```rust,no_run
//! use pax_rs::*;
//!
//! fn main() -> Result<()> {
//!     let raster = RasterFile::from_path("input.pax")?;
//!     raster.write_to_path("copy.pax")?;
//!     Ok(())
//! }
//! ```

// Modules
pub mod cursor;
pub mod error;
pub mod header;
pub mod metadata;
pub mod raster;
pub mod types;

mod writer;

// Re-export commonly used types at the crate root for convenience
pub use error::{ParseWarning, PaxError, Result};

// Type exports
pub use types::{Float3, RasterType, TypeDescriptor, PAX_FORMAT_VERSION};

// Metadata exports
pub use metadata::{MetaArray, MetaLocation, MetaScalar, MetaStore, MetaType, MetaValue};

// Header exports
pub use header::{HeaderParser, RasterHeader};

// Raster exports
pub use raster::RasterFile;

// Prelude module for glob imports
pub mod prelude {
    //! Convenient imports for common use cases.
    //!
    //! ```rust
    //! use pax_rs::prelude::*;
    //! ```

    pub use crate::error::{PaxError, Result};
    pub use crate::metadata::{MetaLocation, MetaType, MetaValue};
    pub use crate::raster::RasterFile;
    pub use crate::types::{Float3, RasterType};
}

/// The library version
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");
