// Copyright (c) the yuvhuff Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fmt::Debug;

use tracing::{debug, instrument};

use crate::error::{Error, Result};

mod private {
    pub trait Sealed {}
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DataTypeTag {
    U8,
    F32,
}

pub trait ImageDataType: private::Sealed + Copy + Default + Debug + PartialEq + 'static {
    /// ID of this data type. Different types *must* have different values.
    const DATA_TYPE_ID: DataTypeTag;

    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;

    #[cfg(test)]
    fn random<R: rand::Rng>(rng: &mut R) -> Self;
}

impl private::Sealed for u8 {}
impl ImageDataType for u8 {
    const DATA_TYPE_ID: DataTypeTag = DataTypeTag::U8;

    fn from_f64(value: f64) -> u8 {
        value as u8
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    #[cfg(test)]
    fn random<R: rand::Rng>(rng: &mut R) -> u8 {
        use rand::distributions::{Distribution, Uniform};
        Uniform::new_inclusive(u8::MIN, u8::MAX).sample(rng)
    }
}

impl private::Sealed for f32 {}
impl ImageDataType for f32 {
    const DATA_TYPE_ID: DataTypeTag = DataTypeTag::F32;

    fn from_f64(value: f64) -> f32 {
        value as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    // Analog samples normally live in [0, 1].
    #[cfg(test)]
    fn random<R: rand::Rng>(rng: &mut R) -> f32 {
        use rand::distributions::{Distribution, Uniform};
        Uniform::new(0.0f32, 1.0).sample(rng)
    }
}

/// One plane of samples, stored row-major with no padding.
pub struct Image<T: ImageDataType> {
    size: (usize, usize),
    data: Vec<T>,
}

impl<T: ImageDataType> Debug for Image<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} image of size {}x{}", T::DATA_TYPE_ID, self.size.0, self.size.1)
    }
}

impl<T: ImageDataType> PartialEq for Image<T> {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.data == other.data
    }
}

impl<T: ImageDataType> Image<T> {
    #[instrument(err)]
    pub fn new(size: (usize, usize)) -> Result<Image<T>> {
        let (xsize, ysize) = size;
        // These limits let us not worry about overflows.
        if xsize as u64 >= i64::MAX as u64 / 4 || ysize as u64 >= i64::MAX as u64 / 4 {
            return Err(Error::ImageSizeTooLarge(xsize, ysize));
        }
        if xsize == 0 || ysize == 0 {
            return Err(Error::InvalidImageSize(xsize, ysize));
        }
        let total_size = xsize
            .checked_mul(ysize)
            .ok_or(Error::ImageSizeTooLarge(xsize, ysize))?;
        debug!("trying to allocate image");
        let mut data = vec![];
        data.try_reserve_exact(total_size)?;
        data.resize(total_size, T::default());
        Ok(Image { size, data })
    }

    /// Wraps an existing row-major buffer, which must hold exactly
    /// `size.0 * size.1` samples.
    pub fn from_vec(size: (usize, usize), data: Vec<T>) -> Result<Image<T>> {
        let (xsize, ysize) = size;
        if xsize == 0 || ysize == 0 {
            return Err(Error::InvalidImageSize(xsize, ysize));
        }
        let total_size = xsize
            .checked_mul(ysize)
            .ok_or(Error::ImageSizeTooLarge(xsize, ysize))?;
        if data.len() != total_size {
            return Err(Error::PlaneSizeMismatch(data.len(), xsize, ysize));
        }
        Ok(Image { size, data })
    }

    #[cfg(test)]
    pub fn new_random<R: rand::Rng>(size: (usize, usize), rng: &mut R) -> Result<Image<T>> {
        let mut image = Self::new(size)?;
        image.data.iter_mut().for_each(|x| *x = T::random(rng));
        Ok(image)
    }

    pub fn size(&self) -> (usize, usize) {
        self.size
    }

    pub fn row(&self, row: usize) -> &[T] {
        debug_assert!(row < self.size.1);
        &self.data[row * self.size.0..][..self.size.0]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        debug_assert!(row < self.size.1);
        &mut self.data[row * self.size.0..][..self.size.0]
    }

    /// All samples in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.data.iter().copied()
    }

    pub fn try_clone(&self) -> Result<Image<T>> {
        let mut data = vec![];
        data.try_reserve_exact(self.data.len())?;
        data.extend_from_slice(&self.data);
        Ok(Image {
            size: self.size,
            data,
        })
    }
}

/// Checks that all planes of a triple share one size and returns it.
pub(crate) fn check_plane_sizes<T: ImageDataType>(
    planes: &[Image<T>; 3],
) -> Result<(usize, usize)> {
    let size = planes[0].size();
    for plane in &planes[1..] {
        let (xsize, ysize) = plane.size();
        if (xsize, ysize) != size {
            return Err(Error::PlaneShapeMismatch(size.0, size.1, xsize, ysize));
        }
    }
    Ok(size)
}

#[cfg(test)]
mod test {
    use arbtest::arbitrary::Arbitrary;
    use test_log::test;

    use super::*;

    #[test]
    fn huge_image() {
        assert!(Image::<u8>::new((1 << 28, 1 << 28)).is_err());
    }

    #[test]
    fn zero_size() {
        assert!(Image::<u8>::new((0, 10)).is_err());
        assert!(Image::<f32>::new((10, 0)).is_err());
    }

    #[test]
    fn row_layout() -> Result<()> {
        let mut image = Image::<u8>::new((3, 2))?;
        image.row_mut(0).copy_from_slice(&[1, 2, 3]);
        image.row_mut(1).copy_from_slice(&[4, 5, 6]);
        assert_eq!(image.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(image.row(1)[2], 6);
        Ok(())
    }

    #[test]
    fn from_vec_checks_size() {
        assert!(Image::<u8>::from_vec((2, 2), vec![1, 2, 3]).is_err());
        assert!(Image::<u8>::from_vec((2, 2), vec![1, 2, 3, 4]).is_ok());
    }

    #[test]
    fn try_clone_copies_samples() -> Result<()> {
        let image = Image::<u8>::from_vec((2, 2), vec![9, 8, 7, 6])?;
        assert_eq!(image.try_clone()?, image);
        Ok(())
    }

    #[test]
    fn mismatched_plane_sizes_detected() -> Result<()> {
        let planes = [
            Image::<u8>::new((4, 4))?,
            Image::<u8>::new((4, 4))?,
            Image::<u8>::new((4, 2))?,
        ];
        assert!(check_plane_sizes(&planes).is_err());
        Ok(())
    }

    #[test]
    fn u8_f64_conv() {
        arbtest::arbtest(|u| {
            let t = u8::arbitrary(u)?;
            assert_eq!(t, u8::from_f64(t.to_f64()));
            Ok(())
        });
    }
}
