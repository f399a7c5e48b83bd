use crate::error::DecodeError;
use byteorder::{LittleEndian, ReadBytesExt};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::io::Read;

//===========================================================================//

// The size of a BITMAPINFOHEADER struct, in bytes.
pub(crate) const INFO_HEADER_SIZE: u32 = 40;

// BI_RGB; the only compression mode that appears inside ICO entries.
const COMPRESSION_RGB: u32 = 0;

//===========================================================================//

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum BmpDepth {
    One,
    Four,
    Eight,
    Sixteen,
    TwentyFour,
    ThirtyTwo,
}

impl BmpDepth {
    fn from_bit_count(bit_count: u16) -> Option<BmpDepth> {
        match bit_count {
            1 => Some(BmpDepth::One),
            4 => Some(BmpDepth::Four),
            8 => Some(BmpDepth::Eight),
            16 => Some(BmpDepth::Sixteen),
            24 => Some(BmpDepth::TwentyFour),
            32 => Some(BmpDepth::ThirtyTwo),
            _ => None,
        }
    }
}

//===========================================================================//

/// A parsed BITMAPINFOHEADER, as found at the start of a non-PNG ICO entry.
///
/// For ICO entries the `height` field holds the combined height of the XOR
/// color rows and the AND mask rows stacked in one bitmap, so it is double
/// the height of the decoded image.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct InfoHeader {
    /// The declared header size, in bytes (always 40 here).
    pub size: u32,
    /// The bitmap width, in pixels.
    pub width: u32,
    /// The on-disk bitmap height, in pixels (XOR rows plus AND rows).
    pub height: u32,
    /// The number of color planes.
    pub planes: u16,
    /// The number of bits per pixel.
    pub bit_count: u16,
    /// The compression mode (only BI_RGB, i.e. 0, is supported).
    pub compression: u32,
    /// The declared size of the pixel data, in bytes (may be zero).
    pub image_size: u32,
    /// Horizontal resolution, in pixels per meter.
    pub x_pels_per_meter: i32,
    /// Vertical resolution, in pixels per meter.
    pub y_pels_per_meter: i32,
    /// The number of color table entries used.
    pub colors_used: u32,
    /// The number of color table entries that are important.
    pub colors_important: u32,
    /// The effective color table size: `colors_used` if nonzero, otherwise
    /// `2^bit_count` for indexed depths, otherwise zero.
    pub num_colors: u32,
}

impl InfoHeader {
    /// Derives the header describing the XOR color layer: same layout, but
    /// with the combined on-disk height halved.
    pub(crate) fn xor_header(&self) -> InfoHeader {
        let mut header = self.clone();
        header.height = self.height / 2;
        header
    }

    /// Derives the header describing the AND transparency mask: halved
    /// height, forced to 1 bit per pixel with a 2-entry palette.
    pub(crate) fn and_header(&self) -> InfoHeader {
        let mut header = self.clone();
        header.height = self.height / 2;
        header.bit_count = 1;
        header.num_colors = 2;
        header
    }
}

/// Reads the remainder of a BITMAPINFOHEADER whose 4-byte size field has
/// already been consumed from the stream.
pub(crate) fn read_info_header<R: Read>(
    reader: &mut R,
    size: u32,
) -> Result<InfoHeader, DecodeError> {
    if size != INFO_HEADER_SIZE {
        invalid_data!(
            "invalid BMP info header size (was {}, must be {})",
            size,
            INFO_HEADER_SIZE
        );
    }
    let width = reader.read_i32::<LittleEndian>()?;
    if width < 1 {
        invalid_data!("invalid BMP width ({})", width);
    }
    let height = reader.read_i32::<LittleEndian>()?;
    if height < 1 {
        invalid_data!("invalid BMP height ({})", height);
    }
    let planes = reader.read_u16::<LittleEndian>()?;
    let bit_count = reader.read_u16::<LittleEndian>()?;
    let compression = reader.read_u32::<LittleEndian>()?;
    let image_size = reader.read_u32::<LittleEndian>()?;
    let x_pels_per_meter = reader.read_i32::<LittleEndian>()?;
    let y_pels_per_meter = reader.read_i32::<LittleEndian>()?;
    let colors_used = reader.read_u32::<LittleEndian>()?;
    let colors_important = reader.read_u32::<LittleEndian>()?;
    let num_colors = if bit_count <= 8 {
        if colors_used != 0 {
            colors_used
        } else {
            1u32 << bit_count
        }
    } else {
        0
    };
    Ok(InfoHeader {
        size,
        width: width as u32,
        height: height as u32,
        planes,
        bit_count,
        compression,
        image_size,
        x_pels_per_meter,
        y_pels_per_meter,
        colors_used,
        colors_important,
        num_colors,
    })
}

//===========================================================================//

/// One color table entry for an indexed raster decode.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ColorEntry {
    pub(crate) red: u8,
    pub(crate) green: u8,
    pub(crate) blue: u8,
    pub(crate) alpha: u8,
}

impl ColorEntry {
    fn packed(&self) -> u32 {
        pack_argb(self.alpha, self.red, self.green, self.blue)
    }
}

fn pack_argb(alpha: u8, red: u8, green: u8, blue: u8) -> u32 {
    ((alpha as u32) << 24)
        | ((red as u32) << 16)
        | ((green as u32) << 8)
        | (blue as u32)
}

//===========================================================================//

/// A decoded pixel plane: packed `0xAARRGGBB` samples in row-major order
/// from top to bottom.
pub(crate) struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    has_alpha: bool,
}

impl Raster {
    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Returns true if the raster carries its own alpha plane (only the
    /// case for 32-bpp input).
    pub(crate) fn has_alpha(&self) -> bool {
        self.has_alpha
    }
}

//===========================================================================//

/// Decodes BI_RGB pixel data for the given header into a raster, reading
/// rows bottom-up from the stream (each padded to a multiple of four bytes)
/// and storing them top-down.
///
/// For indexed depths the color table is read from the stream, unless
/// `palette` is provided, in which case no table bytes are consumed; this
/// is how the AND mask is decoded, since it has no on-disk color table.
pub(crate) fn decode_raster<R: Read>(
    header: &InfoHeader,
    reader: &mut R,
    palette: Option<&[ColorEntry]>,
) -> Result<Raster, DecodeError> {
    let depth = match BmpDepth::from_bit_count(header.bit_count) {
        Some(depth) => depth,
        None => {
            invalid_data!(
                "unsupported BMP bits-per-pixel ({})",
                header.bit_count
            );
        }
    };
    if header.compression != COMPRESSION_RGB {
        invalid_data!("unsupported BMP compression ({})", header.compression);
    }
    let width = header.width as usize;
    let height = header.height as usize;
    let num_pixels = match width.checked_mul(height) {
        Some(num) => num,
        None => invalid_data!("width * height is too large"),
    };

    let table: Vec<u32> = match palette {
        Some(entries) => entries.iter().map(ColorEntry::packed).collect(),
        None => {
            if header.num_colors > (1u32 << header.bit_count.min(8)) {
                invalid_data!(
                    "invalid BMP color table size ({} entries at {} bpp)",
                    header.num_colors,
                    header.bit_count
                );
            }
            let mut table = Vec::with_capacity(header.num_colors as usize);
            for _ in 0..header.num_colors {
                let blue = reader.read_u8()?;
                let green = reader.read_u8()?;
                let red = reader.read_u8()?;
                let _reserved = reader.read_u8()?;
                table.push(pack_argb(u8::MAX, red, green, blue));
            }
            table
        }
    };

    // Rows are stored bottom-up, each padded to a multiple of four bytes.
    let row_size = (width * (header.bit_count as usize) + 31) / 32 * 4;
    let mut row_buf = vec![0u8; row_size];
    let mut pixels = vec![0u32; num_pixels];
    for row in 0..height {
        reader.read_exact(&mut row_buf)?;
        let start = (height - row - 1) * width;
        let dest = &mut pixels[start..start + width];
        match depth {
            BmpDepth::One => {
                for (x, pixel) in dest.iter_mut().enumerate() {
                    let index = (row_buf[x / 8] >> (7 - x % 8)) & 0x1;
                    *pixel = table_color(&table, index as usize)?;
                }
            }
            BmpDepth::Four => {
                for (x, pixel) in dest.iter_mut().enumerate() {
                    let index =
                        (row_buf[x / 2] >> (4 * (1 - x % 2))) & 0xf;
                    *pixel = table_color(&table, index as usize)?;
                }
            }
            BmpDepth::Eight => {
                for (x, pixel) in dest.iter_mut().enumerate() {
                    *pixel = table_color(&table, row_buf[x] as usize)?;
                }
            }
            BmpDepth::Sixteen => {
                // X1R5G5B5, with each channel scaled up to 8 bits.
                for (x, pixel) in dest.iter_mut().enumerate() {
                    let color = u16::from_le_bytes([
                        row_buf[2 * x],
                        row_buf[2 * x + 1],
                    ]);
                    let red = (color >> 10) & 0x1f;
                    let green = (color >> 5) & 0x1f;
                    let blue = color & 0x1f;
                    *pixel = pack_argb(
                        u8::MAX,
                        ((red * 255 + 15) / 31) as u8,
                        ((green * 255 + 15) / 31) as u8,
                        ((blue * 255 + 15) / 31) as u8,
                    );
                }
            }
            BmpDepth::TwentyFour => {
                for (x, pixel) in dest.iter_mut().enumerate() {
                    let blue = row_buf[3 * x];
                    let green = row_buf[3 * x + 1];
                    let red = row_buf[3 * x + 2];
                    *pixel = pack_argb(u8::MAX, red, green, blue);
                }
            }
            BmpDepth::ThirtyTwo => {
                for (x, pixel) in dest.iter_mut().enumerate() {
                    let blue = row_buf[4 * x];
                    let green = row_buf[4 * x + 1];
                    let red = row_buf[4 * x + 2];
                    let alpha = row_buf[4 * x + 3];
                    *pixel = pack_argb(alpha, red, green, blue);
                }
            }
        }
    }
    Ok(Raster {
        width: header.width,
        height: header.height,
        pixels,
        has_alpha: depth == BmpDepth::ThirtyTwo,
    })
}

fn table_color(table: &[u32], index: usize) -> Result<u32, DecodeError> {
    match table.get(index) {
        Some(&color) => Ok(color),
        None => invalid_data!(
            "color index out of range (was {}, but table has {} entries)",
            index,
            table.len()
        ),
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{
        decode_raster, read_info_header, ColorEntry, DecodeError, InfoHeader,
        INFO_HEADER_SIZE,
    };

    fn info_header_bytes(
        width: i32,
        height: i32,
        bit_count: u16,
        colors_used: u32,
    ) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // planes
        bytes.extend_from_slice(&bit_count.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 16]); // compression..ppm fields
        bytes.extend_from_slice(&colors_used.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes()); // colors important
        bytes
    }

    fn read_header(bytes: &[u8]) -> InfoHeader {
        read_info_header(&mut &bytes[..], INFO_HEADER_SIZE).unwrap()
    }

    #[test]
    fn read_header_fields() {
        let header = read_header(&info_header_bytes(5, 6, 4, 0));
        assert_eq!(header.width, 5);
        assert_eq!(header.height, 6);
        assert_eq!(header.planes, 1);
        assert_eq!(header.bit_count, 4);
        assert_eq!(header.num_colors, 16);
    }

    #[test]
    fn colors_used_overrides_palette_size() {
        let header = read_header(&info_header_bytes(5, 6, 8, 7));
        assert_eq!(header.num_colors, 7);
    }

    #[test]
    fn high_depths_have_no_palette() {
        let header = read_header(&info_header_bytes(5, 6, 32, 0));
        assert_eq!(header.num_colors, 0);
    }

    #[test]
    fn declared_size_must_be_40() {
        let bytes = info_header_bytes(5, 6, 8, 0);
        let result = read_info_header(&mut &bytes[..], 124);
        assert!(matches!(result, Err(DecodeError::Invalid(_))));
    }

    #[test]
    fn mask_header_forces_monochrome_layout() {
        let header = read_header(&info_header_bytes(4, 8, 8, 0));
        let xor = header.xor_header();
        assert_eq!(xor.height, 4);
        assert_eq!(xor.bit_count, 8);
        let and = header.and_header();
        assert_eq!(and.height, 4);
        assert_eq!(and.bit_count, 1);
        assert_eq!(and.num_colors, 2);
    }

    #[test]
    fn decode_24bpp_rows_are_flipped() {
        let header = read_header(&info_header_bytes(1, 2, 24, 0));
        // Bottom row red, top row blue, each row padded to 4 bytes.
        let data: &[u8] = b"\x00\x00\xff\x00\xff\x00\x00\x00";
        let raster = decode_raster(&header, &mut &data[..], None).unwrap();
        assert!(!raster.has_alpha());
        assert_eq!(raster.pixels(), &[0xff0000ff, 0xffff0000]);
    }

    #[test]
    fn decode_16bpp_scales_channels_to_8_bits() {
        let header = read_header(&info_header_bytes(2, 2, 16, 0));
        // X1R5G5B5 samples: bottom row blue (0x001f) and white (0x7fff),
        // top row red (0x7c00) and green (0x03e0).
        let data: &[u8] = b"\x1f\x00\xff\x7f\x00\x7c\xe0\x03";
        let raster = decode_raster(&header, &mut &data[..], None).unwrap();
        assert!(!raster.has_alpha());
        assert_eq!(
            raster.pixels(),
            &[0xffff0000, 0xff00ff00, 0xff0000ff, 0xffffffff]
        );
    }

    #[test]
    fn decode_1bpp_with_caller_palette_reads_no_table() {
        let header = read_header(&info_header_bytes(2, 2, 1, 0));
        let palette = [
            ColorEntry { red: 255, green: 255, blue: 255, alpha: 255 },
            ColorEntry { red: 0, green: 0, blue: 0, alpha: 0 },
        ];
        // Two rows of bits only; a stream-read table would hit EOF here.
        let data: &[u8] = b"\x40\x00\x00\x00\x80\x00\x00\x00";
        let raster =
            decode_raster(&header, &mut &data[..], Some(&palette)).unwrap();
        // Top row comes from the second stored row (0x80 = pixel 0 set).
        assert_eq!(
            raster.pixels(),
            &[0x00000000, 0xffffffff, 0xffffffff, 0x00000000]
        );
    }

    #[test]
    fn decode_8bpp_reads_table_from_stream() {
        let header = read_header(&info_header_bytes(2, 1, 8, 2));
        let data: &[u8] = b"\
            \x00\x00\xff\x00\
            \xff\xff\x00\x00\
            \x01\x00\x00\x00";
        let raster = decode_raster(&header, &mut &data[..], None).unwrap();
        assert_eq!(raster.pixels(), &[0xff00ffff, 0xffff0000]);
    }

    #[test]
    fn out_of_range_color_index_fails() {
        let header = read_header(&info_header_bytes(1, 1, 8, 2));
        let data: &[u8] = b"\
            \x00\x00\x00\x00\
            \xff\xff\xff\x00\
            \x05\x00\x00\x00";
        let result = decode_raster(&header, &mut &data[..], None);
        assert!(matches!(result, Err(DecodeError::Invalid(_))));
    }

    #[test]
    fn unsupported_bit_count_fails() {
        let header = read_header(&info_header_bytes(1, 2, 8, 0));
        let mut bad = header;
        bad.bit_count = 2;
        let data: &[u8] = b"";
        let result = decode_raster(&bad, &mut &data[..], None);
        assert!(matches!(result, Err(DecodeError::Invalid(_))));
    }
}

//===========================================================================//
