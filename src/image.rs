use crate::error::DecodeError;
use std::io::Read;

//===========================================================================//

// Size limits for images in an ICO file:
const MIN_WIDTH: u32 = 1;
const MIN_HEIGHT: u32 = 1;

//===========================================================================//

/// A decoded, fully-composited RGBA image.
#[derive(Clone)]
pub struct IconImage {
    width: u32,
    height: u32,
    rgba_data: Vec<u8>,
}

impl IconImage {
    /// Creates a new image with the given dimensions and RGBA data.  The
    /// `width` and `height` must be nonzero, and `rgba_data` must have `4 *
    /// width * height` bytes and be in row-major order from top to bottom.
    /// Panics if the dimensions are out of range or if `rgba_data` is the
    /// wrong length.
    pub fn from_rgba_data(
        width: u32,
        height: u32,
        rgba_data: Vec<u8>,
    ) -> IconImage {
        if width < MIN_WIDTH {
            panic!(
                "Invalid width (was {}, but must be at least {})",
                width, MIN_WIDTH
            );
        }
        if height < MIN_HEIGHT {
            panic!(
                "Invalid height (was {}, but must be at least {})",
                height, MIN_HEIGHT
            );
        }
        let expected_data_len = (width as u64) * (height as u64) * 4;
        if (rgba_data.len() as u64) != expected_data_len {
            panic!(
                "Invalid data length (was {}, but must be {} for {}x{} image)",
                rgba_data.len(),
                expected_data_len,
                width,
                height
            );
        }
        IconImage { width, height, rgba_data }
    }

    /// Decodes an image from a standalone PNG stream.  Returns an error if
    /// the PNG data is malformed or can't be decoded.
    pub fn read_png<R: Read>(reader: R) -> Result<IconImage, DecodeError> {
        let decoder = png::Decoder::new(reader);
        let mut png_reader = decoder.read_info()?;
        validate_png_info(png_reader.info())?;
        let mut buffer = vec![0u8; png_reader.output_buffer_size()];
        png_reader.next_frame(&mut buffer)?;
        let rgba_data = match png_reader.info().color_type {
            png::ColorType::Rgba => buffer,
            png::ColorType::Rgb => {
                let num_pixels = buffer.len() / 3;
                let mut rgba = Vec::with_capacity(num_pixels * 4);
                for i in 0..num_pixels {
                    rgba.extend_from_slice(&buffer[(3 * i)..][..3]);
                    rgba.push(u8::MAX);
                }
                rgba
            }
            png::ColorType::GrayscaleAlpha => {
                let num_pixels = buffer.len() / 2;
                let mut rgba = Vec::with_capacity(num_pixels * 4);
                for i in 0..num_pixels {
                    let gray = buffer[2 * i];
                    let alpha = buffer[2 * i + 1];
                    rgba.push(gray);
                    rgba.push(gray);
                    rgba.push(gray);
                    rgba.push(alpha);
                }
                rgba
            }
            png::ColorType::Grayscale => {
                let mut rgba = Vec::with_capacity(buffer.len() * 4);
                for value in buffer.into_iter() {
                    rgba.push(value);
                    rgba.push(value);
                    rgba.push(value);
                    rgba.push(u8::MAX);
                }
                rgba
            }
            png::ColorType::Indexed => {
                // TODO: Implement ColorType::Indexed conversion
                invalid_data!(
                    "unsupported PNG color type: {:?}",
                    png_reader.info().color_type
                );
            }
        };
        Ok(IconImage::from_rgba_data(
            png_reader.info().width,
            png_reader.info().height,
            rgba_data,
        ))
    }

    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the RGBA data for this image, in row-major order from top to
    /// bottom.
    pub fn rgba_data(&self) -> &[u8] {
        &self.rgba_data
    }

    /// Consumes the image and returns its RGBA data.
    pub fn into_rgba_data(self) -> Vec<u8> {
        self.rgba_data
    }
}

fn validate_png_info(info: &png::Info) -> Result<(), DecodeError> {
    if info.width < MIN_WIDTH {
        invalid_data!(
            "invalid PNG width (was {}, but must be at least {})",
            info.width,
            MIN_WIDTH
        );
    }
    if info.height < MIN_HEIGHT {
        invalid_data!(
            "invalid PNG height (was {}, but must be at least {})",
            info.height,
            MIN_HEIGHT
        );
    }
    if info.bit_depth != png::BitDepth::Eight {
        // TODO: Support other bit depths.
        invalid_data!("unsupported PNG bit depth: {:?}", info.bit_depth);
    }
    Ok(())
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::IconImage;

    // A 2x2 8-bit grayscale PNG.
    const GRAY_PNG: &[u8] = b"\
        \x89\x50\x4e\x47\x0d\x0a\x1a\x0a\x00\x00\x00\x0d\x49\x48\x44\x52\
        \x00\x00\x00\x02\x00\x00\x00\x02\x08\x00\x00\x00\x00\x57\xdd\x52\
        \xf8\x00\x00\x00\x0e\x49\x44\x41\x54\x78\x9c\x63\xb4\x77\x60\xdc\
        \xef\x00\x00\x04\x08\x01\x81\x86\x2e\xc9\x8d\x00\x00\x00\x00\x49\
        \x45\x4e\x44\xae\x42\x60\x82";

    // A 2x1 8-bit RGB PNG with pixels (255,0,0) and (0,128,255).
    const RGB_PNG: &[u8] = b"\
        \x89\x50\x4e\x47\x0d\x0a\x1a\x0a\x00\x00\x00\x0d\x49\x48\x44\x52\
        \x00\x00\x00\x02\x00\x00\x00\x01\x08\x02\x00\x00\x00\x7b\x40\xe8\
        \xdd\x00\x00\x00\x0f\x49\x44\x41\x54\x78\xda\x63\xf8\xcf\xc0\xc0\
        \xd0\xf0\x1f\x00\x08\x00\x02\x7f\x25\x3e\xfc\x09\x00\x00\x00\x00\
        \x49\x45\x4e\x44\xae\x42\x60\x82";

    // A 2x1 8-bit grayscale+alpha PNG with samples (0x40,0x80) and
    // (0xff,0x00).
    const GRAY_ALPHA_PNG: &[u8] = b"\
        \x89\x50\x4e\x47\x0d\x0a\x1a\x0a\x00\x00\x00\x0d\x49\x48\x44\x52\
        \x00\x00\x00\x02\x00\x00\x00\x01\x08\x04\x00\x00\x00\x5e\x2b\xb7\
        \x01\x00\x00\x00\x0d\x49\x44\x41\x54\x78\xda\x63\x70\x68\xf8\xcf\
        \x00\x00\x04\x83\x01\xc0\x34\xfa\x4b\x61\x00\x00\x00\x00\x49\x45\
        \x4e\x44\xae\x42\x60\x82";

    #[test]
    fn decode_grayscale_png() {
        let image = IconImage::read_png(GRAY_PNG).unwrap();
        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 2);
        let rgba: &[u8] = b"\
            \x3f\x3f\x3f\xff\x7f\x7f\x7f\xff\
            \xbf\xbf\xbf\xff\xff\xff\xff\xff";
        assert_eq!(image.rgba_data(), rgba);
    }

    #[test]
    fn decode_rgb_png_gets_opaque_alpha() {
        let image = IconImage::read_png(RGB_PNG).unwrap();
        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 1);
        let rgba: &[u8] = b"\xff\x00\x00\xff\x00\x80\xff\xff";
        assert_eq!(image.rgba_data(), rgba);
    }

    #[test]
    fn decode_grayscale_alpha_png() {
        let image = IconImage::read_png(GRAY_ALPHA_PNG).unwrap();
        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 1);
        let rgba: &[u8] = b"\x40\x40\x40\x80\xff\xff\xff\x00";
        assert_eq!(image.rgba_data(), rgba);
    }

    #[test]
    fn truncated_png_fails() {
        let result = IconImage::read_png(&GRAY_PNG[..20]);
        assert!(result.is_err());
    }

    #[test]
    #[should_panic(expected = "Invalid data length")]
    fn wrong_rgba_length_panics() {
        let _ = IconImage::from_rgba_data(2, 2, vec![0u8; 15]);
    }
}

//===========================================================================//
