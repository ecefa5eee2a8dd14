use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};

use crate::conversion::{EncodedImage, Image, ImageConverter, ImageConverterFeatures, PixelFormat};

/// Encodes uncompressed 8- and 16-bit images as PNG. Only the base level is
/// written.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngImageConverter;

impl ImageConverter for PngImageConverter {
    fn name(&self) -> &str {
        "PngImageConverter"
    }

    fn features(&self) -> ImageConverterFeatures {
        ImageConverterFeatures {
            convert_data: true,
            ..Default::default()
        }
    }

    fn mime_type(&self) -> Option<&str> {
        Some("image/png")
    }

    fn convert(&self, image: &Image) -> Result<EncodedImage, String> {
        let (color_type, pixel_size) = match image.format {
            PixelFormat::R8Unorm => (ColorType::L8, 1),
            PixelFormat::RG8Unorm => (ColorType::La8, 2),
            PixelFormat::RGB8Unorm => (ColorType::Rgb8, 3),
            PixelFormat::RGBA8Unorm => (ColorType::Rgba8, 4),
            PixelFormat::R16Unorm => (ColorType::L16, 2),
            PixelFormat::RGBA16Unorm => (ColorType::Rgba16, 8),
            format => return Err(format!("unsupported pixel format {:?}", format)),
        };

        let [width, height, _] = image.size;
        let data = image.levels.first().map(Vec::as_slice).unwrap_or_default();
        let expected = width as usize * height as usize * pixel_size;
        if data.len() != expected {
            return Err(format!(
                "expected {} bytes of pixel data but got {}",
                expected,
                data.len()
            ));
        }

        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(data, width, height, color_type)
            .map_err(|error| error.to_string())?;

        Ok(EncodedImage {
            bytes,
            mime_type: String::from("image/png"),
        })
    }
}
