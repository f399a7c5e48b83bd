use std::io;
use thiserror::Error;

//===========================================================================//

/// An error produced while decoding ICO data.
///
/// A failure while decoding any single entry aborts the whole decode; there
/// is no partial result list.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The stream position at the start of an entry's image data did not
    /// match the offset declared in its directory entry.
    #[error(
        "cannot read image #{index} starting at unexpected file offset \
         (expected {expected}, but stream is at {actual})"
    )]
    OffsetMismatch {
        /// The index of the entry in the icon directory.
        index: usize,
        /// The offset declared by the directory entry.
        expected: u32,
        /// The actual stream position.
        actual: u64,
    },

    /// The entry's data started with neither a BITMAPINFOHEADER size nor a
    /// PNG signature.
    #[error("unrecognized icon format for image #{0}")]
    UnrecognizedFormat(usize),

    /// The stream ended before all required bytes could be read or skipped.
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,

    /// A header or pixel data field held a value that cannot be decoded.
    #[error("invalid image data: {0}")]
    Invalid(String),

    /// Embedded PNG data could not be decoded.
    #[error("malformed PNG data: {0}")]
    Png(#[from] png::DecodingError),

    /// Decoding the entry at the given index failed.
    #[error("failed to read image #{index}")]
    Entry {
        /// The index of the entry in the icon directory.
        index: usize,
        /// The underlying failure.
        source: Box<DecodeError>,
    },

    /// An I/O error from the underlying stream.
    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for DecodeError {
    fn from(error: io::Error) -> DecodeError {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::UnexpectedEndOfInput
        } else {
            DecodeError::Io(error)
        }
    }
}

//===========================================================================//


//===========================================================================//
