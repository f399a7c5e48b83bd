use crate::error::DecodeError;
use byteorder::{LittleEndian, ReadBytesExt};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::io::Read;

//===========================================================================//

/// The parsed directory of an ICO file: the 6-byte ICONDIR header followed
/// by one fixed-size ICONDIRENTRY record per embedded image.
///
/// Entries are kept in file order, which is also the order in which their
/// image data is decoded and returned.  They are never re-sorted by data
/// offset, even when offset order differs from directory order.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct IconDir {
    reserved: u16,
    resource_type: u16,
    entries: Vec<IconDirEntry>,
}

impl IconDir {
    /// Reads an ICONDIR header and its directory entries.  This consumes
    /// exactly `6 + 16 * count` bytes and performs no validation on the
    /// `reserved` or resource type fields; unrecognized type codes are
    /// accepted as-is.
    pub fn read<R: Read>(mut reader: R) -> Result<IconDir, DecodeError> {
        let reserved = reader.read_u16::<LittleEndian>()?;
        let resource_type = reader.read_u16::<LittleEndian>()?;
        let num_entries = reader.read_u16::<LittleEndian>()? as usize;
        let mut entries = Vec::<IconDirEntry>::with_capacity(num_entries);
        for _ in 0..num_entries {
            entries.push(IconDirEntry::read(&mut reader)?);
        }
        Ok(IconDir { reserved, resource_type, entries })
    }

    /// Returns the header's reserved field, unvalidated.
    pub fn reserved(&self) -> u16 {
        self.reserved
    }

    /// Returns the resource type code (1 for icons, 2 for cursors, but any
    /// value is accepted).
    pub fn resource_type(&self) -> u16 {
        self.resource_type
    }

    /// Returns the directory entries, in file order.
    pub fn entries(&self) -> &[IconDirEntry] {
        &self.entries
    }
}

//===========================================================================//

/// One 16-byte ICONDIRENTRY record, stored with its raw on-disk field
/// values.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct IconDirEntry {
    width: u8,
    height: u8,
    num_colors: u8,
    reserved: u8,
    color_planes: u16,
    bits_per_pixel: u16,
    data_size: u32,
    data_offset: u32,
}

impl IconDirEntry {
    fn read<R: Read>(reader: &mut R) -> Result<IconDirEntry, DecodeError> {
        let width = reader.read_u8()?;
        let height = reader.read_u8()?;
        let num_colors = reader.read_u8()?;
        let reserved = reader.read_u8()?;
        let color_planes = reader.read_u16::<LittleEndian>()?;
        let bits_per_pixel = reader.read_u16::<LittleEndian>()?;
        let data_size = reader.read_u32::<LittleEndian>()?;
        let data_offset = reader.read_u32::<LittleEndian>()?;
        Ok(IconDirEntry {
            width,
            height,
            num_colors,
            reserved,
            color_planes,
            bits_per_pixel,
            data_size,
            data_offset,
        })
    }

    /// Returns the width of the image, in pixels.  The directory stores
    /// this in a single byte, with zero meaning 256.
    pub fn width(&self) -> u32 {
        if self.width == 0 {
            256
        } else {
            self.width as u32
        }
    }

    /// Returns the height of the image, in pixels.  The directory stores
    /// this in a single byte, with zero meaning 256.
    pub fn height(&self) -> u32 {
        if self.height == 0 {
            256
        } else {
            self.height as u32
        }
    }

    /// Returns the number of colors in the image's palette, or zero if no
    /// palette is used.
    pub fn num_colors(&self) -> u8 {
        self.num_colors
    }

    /// Returns the entry's reserved field, unvalidated.
    pub fn reserved(&self) -> u8 {
        self.reserved
    }

    /// Returns the color planes field.
    pub fn color_planes(&self) -> u16 {
        self.color_planes
    }

    /// Returns the bits-per-pixel (color depth) field.
    pub fn bits_per_pixel(&self) -> u16 {
        self.bits_per_pixel
    }

    /// Returns the size of the entry's image data, in bytes.
    pub fn data_size(&self) -> u32 {
        self.data_size
    }

    /// Returns the absolute file offset at which the entry's image data
    /// starts.
    pub fn data_offset(&self) -> u32 {
        self.data_offset
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::IconDir;

    #[test]
    fn read_empty_icon_dir() {
        let input = b"\x00\x00\x01\x00\x00\x00";
        let icondir = IconDir::read(input.as_slice()).unwrap();
        assert_eq!(icondir.resource_type(), 1);
        assert_eq!(icondir.entries().len(), 0);
    }

    #[test]
    fn unrecognized_type_code_is_accepted() {
        let input = b"\x07\x00\x09\x00\x00\x00";
        let icondir = IconDir::read(input.as_slice()).unwrap();
        assert_eq!(icondir.reserved(), 7);
        assert_eq!(icondir.resource_type(), 9);
        assert_eq!(icondir.entries().len(), 0);
    }

    #[test]
    fn read_entry_fields() {
        let input: &[u8] = b"\x00\x00\x01\x00\x01\x00\
            \x10\x20\x02\x03\x01\x00\x04\x00\
            \x40\x00\x00\x00\x16\x00\x00\x00";
        let icondir = IconDir::read(input).unwrap();
        assert_eq!(icondir.entries().len(), 1);
        let entry = &icondir.entries()[0];
        assert_eq!(entry.width(), 16);
        assert_eq!(entry.height(), 32);
        assert_eq!(entry.num_colors(), 2);
        assert_eq!(entry.reserved(), 3);
        assert_eq!(entry.color_planes(), 1);
        assert_eq!(entry.bits_per_pixel(), 4);
        assert_eq!(entry.data_size(), 64);
        assert_eq!(entry.data_offset(), 22);
    }

    #[test]
    fn zero_width_and_height_bytes_mean_256() {
        let input: &[u8] = b"\x00\x00\x01\x00\x01\x00\
            \x00\x00\x00\x00\x01\x00\x20\x00\
            \x00\x00\x01\x00\x16\x00\x00\x00";
        let icondir = IconDir::read(input).unwrap();
        let entry = &icondir.entries()[0];
        assert_eq!(entry.width(), 256);
        assert_eq!(entry.height(), 256);
    }
}

//===========================================================================//
