// Copyright 2020 @TwoCookingMice

use super::constants::{ Float, Vector3f };

use std::ops;
use std::vec::Vec;

/// Row-major linear RGB image.
#[derive(Debug, Clone)]
pub struct Bitmap {
    data: Vec<Vector3f>,
    height: usize,
    width: usize
}

impl ops::Index<(usize, usize)> for Bitmap {
    type Output = Vector3f;

    fn index(&self, index: (usize, usize)) -> &Vector3f {
        &self.data[index.0 + self.width * index.1]
    }
}

impl ops::IndexMut<(usize, usize)> for Bitmap {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Vector3f {
        &mut self.data[index.0 + self.width * index.1]
    }
}

impl Bitmap {
    pub fn new(width: usize, height: usize) -> Self {
        let pixel_number = width * height;
        Self { data: vec!(Vector3f::new(0.0, 0.0, 0.0);
                          pixel_number),
               width: width,
               height: height }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn raw_copy(&self) -> Vec<(Float, Float, Float)> {
        self.data.iter().map(|v| (v.x, v.y, v.z)).collect()
    }
}

/* Test for Bitmap */
#[cfg(test)]
mod tests {
    use super::Bitmap;
    use super::{ Vector3f };

    #[test]
    fn test_bitmap_basic_functions() {
        let mut bitmap = Bitmap::new(256usize, 128usize);
        assert_eq!(bitmap.width(), 256);
        assert_eq!(bitmap.height(), 128);

        bitmap[(5, 6)] = Vector3f::new(1.0, 0.5, 0.6);
        assert_eq!(bitmap[(5, 6)], Vector3f::new(1.0, 0.5, 0.6));
        assert_eq!(bitmap[(2, 6)], Vector3f::zeros());

        let raw = bitmap.raw_copy();
        assert_eq!(raw.len(), 256 * 128);
        assert_eq!(raw[5 + 256 * 6], (1.0, 0.5, 0.6));
    }
}
