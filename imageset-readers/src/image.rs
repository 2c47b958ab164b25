//! Image format detection and RGB decoding
//!
//! [`ImageFormat`] recognises the common image containers from a file
//! extension or from magic bytes. With the `image` feature enabled,
//! [`RgbDecoder`] decodes files into 8-bit RGB buffers and plugs into a
//! dataset as its [`Decode`](imageset_core::Decode) backend.

use std::path::Path;

/// Image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// JPEG format
    Jpeg,
    /// PNG format
    Png,
    /// BMP format
    Bmp,
    /// GIF format
    Gif,
    /// TIFF format
    Tiff,
    /// WebP format
    WebP,
    /// Unknown format
    Unknown,
}

impl ImageFormat {
    /// Detect image format from file extension
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => ImageFormat::Jpeg,
            "png" => ImageFormat::Png,
            "bmp" => ImageFormat::Bmp,
            "gif" => ImageFormat::Gif,
            "tiff" | "tif" => ImageFormat::Tiff,
            "webp" => ImageFormat::WebP,
            _ => ImageFormat::Unknown,
        }
    }

    /// Detect image format from the extension of `path`
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(ImageFormat::Unknown, Self::from_extension)
    }

    /// Detect image format from magic bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => ImageFormat::Jpeg,
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => ImageFormat::Png,
            [b'B', b'M', ..] => ImageFormat::Bmp,
            [b'G', b'I', b'F', b'8', ..] => ImageFormat::Gif,
            [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => ImageFormat::Tiff,
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => ImageFormat::WebP,
            _ => ImageFormat::Unknown,
        }
    }

    /// Whether the format is a known image container
    pub fn is_known(self) -> bool {
        self != ImageFormat::Unknown
    }

    /// The matching format of the `image` crate
    #[cfg(feature = "image")]
    pub fn to_image_format(self) -> Option<image::ImageFormat> {
        match self {
            ImageFormat::Jpeg => Some(image::ImageFormat::Jpeg),
            ImageFormat::Png => Some(image::ImageFormat::Png),
            ImageFormat::Bmp => Some(image::ImageFormat::Bmp),
            ImageFormat::Gif => Some(image::ImageFormat::Gif),
            ImageFormat::Tiff => Some(image::ImageFormat::Tiff),
            ImageFormat::WebP => Some(image::ImageFormat::WebP),
            ImageFormat::Unknown => None,
        }
    }
}

#[cfg(feature = "image")]
pub use self::rgb::RgbDecoder;

#[cfg(feature = "image")]
mod rgb {
    use std::path::Path;

    use image::RgbImage;
    use imageset_core::{BoxError, Decode};
    use tracing::trace;

    use super::ImageFormat;
    use crate::error::{Error, Result};

    /// Decodes image files into 8-bit, 3-channel RGB buffers
    ///
    /// Every image is converted to RGB whatever its stored color type, so
    /// grayscale, palette and alpha images all come out with the same
    /// channel layout.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RgbDecoder {
        strict: bool,
    }

    impl RgbDecoder {
        /// Create a decoder that lets the `image` crate guess the format
        pub fn new() -> Self {
            Self::default()
        }

        /// Only accept files whose magic bytes identify a known image container
        #[must_use]
        pub fn strict(mut self, strict: bool) -> Self {
            self.strict = strict;
            self
        }

        /// Decode the image at `path`
        pub fn decode_file(&self, path: &Path) -> Result<RgbImage> {
            let bytes = std::fs::read(path)?;
            let format = ImageFormat::from_bytes(&bytes);

            let image = match format.to_image_format() {
                Some(format) => image::load_from_memory_with_format(&bytes, format)?,
                None if self.strict => {
                    return Err(Error::Format(format!(
                        "'{}' is not a recognised image file",
                        path.display()
                    )))
                }
                None => image::load_from_memory(&bytes)?,
            };

            trace!(
                path = %path.display(),
                width = image.width(),
                height = image.height(),
                "Decoded image"
            );
            Ok(image.to_rgb8())
        }
    }

    impl Decode for RgbDecoder {
        type Pixels = RgbImage;

        fn decode(&self, path: &Path) -> std::result::Result<RgbImage, BoxError> {
            self.decode_file(path).map_err(Into::into)
        }
    }
}
