use crate::bmp::{self, ColorEntry, InfoHeader, Raster};
use crate::error::DecodeError;
use crate::icondir::{IconDir, IconDirEntry};
use crate::image::IconImage;
use crate::stream::CountingReader;
use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

//===========================================================================//

// The PNG signature, split as two little-endian u32 halves for comparison
// against the 4-byte discriminator at the start of each entry's data.
const PNG_SIGNATURE: [u8; 8] =
    [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
const PNG_MAGIC_LE: u32 = 0x474e5089;
const PNG_MAGIC2_LE: u32 = 0x0a1a0a0d;

// The fixed palette used to decode the AND transparency mask: bit 0 marks
// an opaque pixel, bit 1 a transparent one.
const AND_PALETTE: [ColorEntry; 2] = [
    ColorEntry { red: 255, green: 255, blue: 255, alpha: 255 },
    ColorEntry { red: 0, green: 0, blue: 0, alpha: 0 },
];

//===========================================================================//

/// One decoded entry of an ICO file, together with its metadata.
pub struct IcoImage {
    image: IconImage,
    info_header: Option<InfoHeader>,
    entry: IconDirEntry,
    png_compressed: bool,
    index: usize,
}

impl IcoImage {
    /// Returns the decoded RGBA image.
    pub fn image(&self) -> &IconImage {
        &self.image
    }

    /// Consumes the record and returns just the decoded image.
    pub fn into_image(self) -> IconImage {
        self.image
    }

    /// Returns the BMP info header the image was decoded from, or `None` if
    /// the entry was PNG-encoded.
    pub fn info_header(&self) -> Option<&InfoHeader> {
        self.info_header.as_ref()
    }

    /// Returns the directory entry this image was decoded from.
    pub fn entry(&self) -> &IconDirEntry {
        &self.entry
    }

    /// Returns true if the entry was stored as an embedded PNG rather than
    /// as a legacy bitmap.
    pub fn is_png_compressed(&self) -> bool {
        self.png_compressed
    }

    /// Returns the entry's position in the icon directory (0-based).
    pub fn index(&self) -> usize {
        self.index
    }
}

//===========================================================================//

/// Reads and decodes ICO data from the given stream.  The returned list of
/// images is in the order in which they appear in the directory, which is
/// not necessarily ascending data-offset order.
///
/// Decoding is atomic: a failure on any entry aborts the whole decode and
/// no partial list is returned.
pub fn read<R: Read>(reader: R) -> Result<Vec<IconImage>, DecodeError> {
    Ok(read_ext(reader)?.into_iter().map(IcoImage::into_image).collect())
}

/// Reads and decodes ICO data from the given stream, together with all
/// metadata.  See [`read`] for ordering and failure semantics.
pub fn read_ext<R: Read>(reader: R) -> Result<Vec<IcoImage>, DecodeError> {
    let mut reader = CountingReader::new(reader);
    let icondir = IconDir::read(&mut reader)?;
    let num_entries = icondir.entries().len();
    debug!(
        "icon directory: resource type {}, {} entries",
        icondir.resource_type(),
        num_entries
    );
    let mut images = Vec::with_capacity(num_entries);
    for (index, entry) in icondir.entries().iter().enumerate() {
        // Every entry declares an absolute offset for its image data, and
        // the stream must already be positioned there.
        let actual = reader.bytes_read();
        if actual != entry.data_offset() as u64 {
            return Err(DecodeError::OffsetMismatch {
                index,
                expected: entry.data_offset(),
                actual,
            });
        }
        let is_last = index + 1 == num_entries;
        let image = decode_entry(&mut reader, entry, index, is_last)
            .map_err(|source| DecodeError::Entry {
                index,
                source: Box::new(source),
            })?;
        images.push(image);
    }
    Ok(images)
}

/// Reads and decodes the ICO file at the given path.  Convenience for
/// calling [`read`] on a buffered file stream.
pub fn read_file<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<IconImage>, DecodeError> {
    read(BufReader::new(File::open(path)?))
}

/// Reads and decodes the ICO file at the given path, together with all
/// metadata.  Convenience for calling [`read_ext`] on a buffered file
/// stream.
pub fn read_file_ext<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<IcoImage>, DecodeError> {
    read_ext(BufReader::new(File::open(path)?))
}

//===========================================================================//

fn decode_entry<R: Read>(
    reader: &mut CountingReader<R>,
    entry: &IconDirEntry,
    index: usize,
    is_last: bool,
) -> Result<IcoImage, DecodeError> {
    let info = reader.read_u32::<LittleEndian>()?;
    debug!(
        "image #{} @ {}: info = {:#010x}",
        index,
        reader.bytes_read(),
        info
    );
    if info == bmp::INFO_HEADER_SIZE {
        decode_bmp_entry(reader, entry, index, is_last)
    } else if info == PNG_MAGIC_LE {
        decode_png_entry(reader, entry, index)
    } else {
        Err(DecodeError::UnrecognizedFormat(index))
    }
}

fn decode_bmp_entry<R: Read>(
    reader: &mut CountingReader<R>,
    entry: &IconDirEntry,
    index: usize,
    is_last: bool,
) -> Result<IcoImage, DecodeError> {
    let info_header = bmp::read_info_header(reader, bmp::INFO_HEADER_SIZE)?;
    if info_header.height % 2 != 0 {
        // The height field counts the XOR color rows and the AND mask rows
        // stacked in one bitmap.
        invalid_data!(
            "invalid combined height in BMP header \
             (was {}, but must be divisible by 2)",
            info_header.height
        );
    }
    let xor_header = info_header.xor_header();
    let xor = bmp::decode_raster(&xor_header, reader, None)?;

    let image = if info_header.bit_count == 32 {
        // The XOR layer already carries per-pixel alpha, so the AND mask is
        // dead weight; skip over the byte region it occupies.
        let pixel_data_size =
            4 * (xor_header.width as u64) * (xor_header.height as u64);
        let skip = (entry.data_size() as u64)
            .checked_sub(info_header.size as u64)
            .and_then(|n| n.checked_sub(pixel_data_size))
            .ok_or(DecodeError::UnexpectedEndOfInput)?;
        let skipped = reader.skip(skip)?;
        if skipped < skip {
            // A short AND mask is common in malformed files in the wild;
            // tolerate it only when no further entry needs the stream
            // position to be exact.
            if !is_last {
                return Err(DecodeError::UnexpectedEndOfInput);
            }
            debug!(
                "image #{}: skipped only {} of {} AND mask bytes \
                 at the last entry",
                index, skipped, skip
            );
        }
        merge_direct_alpha(&xor)
    } else {
        let and_header = info_header.and_header();
        let and = bmp::decode_raster(&and_header, reader, Some(&AND_PALETTE))?;
        merge_and_mask(&xor, &and)
    };
    Ok(IcoImage {
        image,
        info_header: Some(info_header),
        entry: entry.clone(),
        png_compressed: false,
        index,
    })
}

fn decode_png_entry<R: Read>(
    reader: &mut CountingReader<R>,
    entry: &IconDirEntry,
    index: usize,
) -> Result<IcoImage, DecodeError> {
    let magic2 = reader.read_u32::<LittleEndian>()?;
    if magic2 != PNG_MAGIC2_LE {
        return Err(DecodeError::UnrecognizedFormat(index));
    }
    // The declared entry size counts the 8 signature bytes consumed above.
    // Rebuild a standalone PNG stream by prepending the signature to the
    // remaining payload.
    let payload_size = entry
        .data_size()
        .checked_sub(PNG_SIGNATURE.len() as u32)
        .ok_or(DecodeError::UnexpectedEndOfInput)?
        as usize;
    let mut png_data = Vec::with_capacity(PNG_SIGNATURE.len() + payload_size);
    png_data.extend_from_slice(&PNG_SIGNATURE);
    png_data.resize(PNG_SIGNATURE.len() + payload_size, 0);
    reader.read_exact(&mut png_data[PNG_SIGNATURE.len()..])?;
    let image = IconImage::read_png(png_data.as_slice())?;
    Ok(IcoImage {
        image,
        info_header: None,
        entry: entry.clone(),
        png_compressed: true,
        index,
    })
}

//===========================================================================//

/// Builds the output image for a 32-bpp entry, whose XOR raster already
/// carries the alpha plane.
fn merge_direct_alpha(xor: &Raster) -> IconImage {
    debug_assert!(xor.has_alpha());
    let mut rgba = Vec::with_capacity(xor.pixels().len() * 4);
    for &pixel in xor.pixels() {
        rgba.push((pixel >> 16) as u8);
        rgba.push((pixel >> 8) as u8);
        rgba.push(pixel as u8);
        rgba.push((pixel >> 24) as u8);
    }
    IconImage::from_rgba_data(xor.width(), xor.height(), rgba)
}

/// Builds the output image for a sub-32-bpp entry: RGB channels from the
/// XOR color raster, alpha from the decoded AND mask.  The mask raster's
/// packed sample is used directly as the alpha value, so its 2-entry
/// palette folds transparency into the numeric pixel value.
fn merge_and_mask(xor: &Raster, and: &Raster) -> IconImage {
    debug_assert_eq!(xor.width(), and.width());
    debug_assert_eq!(xor.height(), and.height());
    let mut rgba = Vec::with_capacity(xor.pixels().len() * 4);
    for (&color, &mask) in xor.pixels().iter().zip(and.pixels()) {
        rgba.push((color >> 16) as u8);
        rgba.push((color >> 8) as u8);
        rgba.push(color as u8);
        rgba.push(mask as u8);
    }
    IconImage::from_rgba_data(xor.width(), xor.height(), rgba)
}

//===========================================================================//


//===========================================================================//
