//! A library for decoding ICO image files.
//!
//! An ICO file holds a directory of one or more embedded images, each
//! stored either as a legacy device-independent bitmap (an XOR color layer
//! plus an AND transparency mask) or as an embedded PNG stream.  This crate
//! parses the directory, validates that each entry's data sits at its
//! declared file offset, and composites every entry into an RGBA
//! [`IconImage`], in directory order.
//!
//! ```no_run
//! let images = icodec::read_file("app.ico").unwrap();
//! for image in &images {
//!     println!("{}x{}", image.width(), image.height());
//! }
//! ```
//!
//! Decoding is all-or-nothing: the first entry that fails aborts the whole
//! decode with a [`DecodeError`] naming the failing entry's index.

#![warn(missing_docs)]

#[macro_use]
mod macros;

mod bmp;
mod decoder;
mod error;
mod icondir;
mod image;
mod stream;

pub use crate::bmp::InfoHeader;
pub use crate::decoder::{read, read_ext, read_file, read_file_ext, IcoImage};
pub use crate::error::DecodeError;
pub use crate::icondir::{IconDir, IconDirEntry};
pub use crate::image::IconImage;

//===========================================================================//
