//! CPU-side pixel buffers
//!
//! `ImageData` is the RGBA8 buffer used for image sources, `getImageData`
//! results and `putImageData` input. Texture caching is keyed by
//! `Arc<ImageData>` pointer identity, not content, so a mutated buffer is
//! never re-uploaded.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ImageDataError {
    #[error("pixel buffer length {len} does not match {width}x{height} RGBA")]
    LengthMismatch { len: usize, width: u32, height: u32 },
}

/// An RGBA8 pixel buffer, row-major, top row first.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl ImageData {
    /// Zero-filled (transparent black) buffer, as `createImageData` returns.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ImageDataError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ImageDataError::LengthMismatch {
                len: data.len(),
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Reverse the row order in place, for sources whose scanlines run
    /// bottom-up.
    pub fn flip_rows(&mut self) {
        let row = self.width as usize * 4;
        if row == 0 {
            return;
        }
        let (h, data) = (self.height as usize, &mut self.data);
        for y in 0..h / 2 {
            let (a, b) = (y * row, (h - 1 - y) * row);
            for i in 0..row {
                data.swap(a + i, b + i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_transparent_black() {
        let img = ImageData::new(2, 2);
        assert_eq!(img.data().len(), 16);
        assert!(img.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_from_rgba_validates_length() {
        assert!(ImageData::from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(ImageData::from_rgba(2, 2, vec![0; 15]).is_err());
    }

    #[test]
    fn test_flip_rows() {
        let mut img = ImageData::from_rgba(
            1,
            3,
            vec![
                1, 1, 1, 1, //
                2, 2, 2, 2, //
                3, 3, 3, 3,
            ],
        )
        .unwrap();
        img.flip_rows();
        assert_eq!(&img.data()[0..4], &[3, 3, 3, 3]);
        assert_eq!(&img.data()[8..12], &[1, 1, 1, 1]);
    }
}
