//! Texture loading and data structures.
//! RGBA8 only; PNG and JPEG sources.

use std::path::Path;

use crate::error::{AssetError, AssetResult};

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl TextureData {
    pub const BYTES_PER_PIXEL: u32 = 4;

    /// Create a new texture with given dimensions and RGBA8 format.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            (width * height * Self::BYTES_PER_PIXEL) as usize,
            "Data size doesn't match RGBA8 format"
        );
        Self {
            data,
            width,
            height,
        }
    }

    /// Decode an image file into RGBA8.
    pub fn load<P: AsRef<Path>>(path: P) -> AssetResult<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let img = image::open(path).map_err(|source| match source {
            image::ImageError::IoError(source) => AssetError::FileNotFound {
                path: path.to_path_buf(),
                source,
            },
            source => AssetError::Image {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let data = rgba.into_raw();

        log::info!("Loaded texture {}x{} with {} bytes", width, height, data.len());

        Ok(Self::new_rgba8(width, height, data))
    }

    /// Checkerboard used when a material has no usable diffuse texture.
    pub fn create_test_texture(size: u32) -> Self {
        let mut data = Vec::with_capacity((size * size * Self::BYTES_PER_PIXEL) as usize);

        for y in 0..size {
            for x in 0..size {
                let checker = ((x / 8) + (y / 8)) % 2;
                if checker == 0 {
                    data.extend_from_slice(&[255, 255, 255, 255]);
                } else {
                    data.extend_from_slice(&[128, 128, 128, 255]);
                }
            }
        }

        Self::new_rgba8(size, size, data)
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.width * Self::BYTES_PER_PIXEL
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        self.data.len() == (self.bytes_per_row() * self.height) as usize
            && self.width > 0
            && self.height > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkerboard_alternates_every_eight_pixels() {
        let tex = TextureData::create_test_texture(16);
        assert!(tex.is_valid());
        assert_eq!(tex.bytes_per_row(), 64);
        assert_eq!(&tex.data[0..4], &[255, 255, 255, 255]);
        let ninth = 8 * 4;
        assert_eq!(&tex.data[ninth..ninth + 4], &[128, 128, 128, 255]);
    }

    #[test]
    fn missing_image_is_file_not_found() {
        let err = TextureData::load("no/such/texture.png").unwrap_err();
        assert!(matches!(err, AssetError::FileNotFound { .. }));
    }
}
