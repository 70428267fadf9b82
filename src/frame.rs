// Copyright (c) the yuvhuff Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::io::Write;

use crate::{
    error::{Error, Result},
    image::{Image, ImageDataType, check_plane_sizes},
};

/// One image: a luma plane and two chroma planes, either at full resolution
/// (4:4:4) or with chroma halved in both axes (4:2:0).
#[derive(Debug)]
pub struct Frame<T: ImageDataType> {
    planes: [Image<T>; 3],
}

impl<T: ImageDataType> Frame<T> {
    /// Builds a frame from `[y, cb, cr]` planes, validating their sizes.
    pub fn new(planes: [Image<T>; 3]) -> Result<Frame<T>> {
        let (lx, ly) = planes[0].size();
        let (cx, cy) = planes[1].size();
        if planes[2].size() != (cx, cy) {
            let (crx, cry) = planes[2].size();
            return Err(Error::PlaneShapeMismatch(cx, cy, crx, cry));
        }
        let full = (cx, cy) == (lx, ly);
        let half = lx % 2 == 0 && ly % 2 == 0 && (cx, cy) == (lx / 2, ly / 2);
        if !full && !half {
            return Err(Error::ChromaShapeMismatch(lx, ly, cx, cy));
        }
        Ok(Frame { planes })
    }

    pub fn luma(&self) -> &Image<T> {
        &self.planes[0]
    }

    pub fn cb(&self) -> &Image<T> {
        &self.planes[1]
    }

    pub fn cr(&self) -> &Image<T> {
        &self.planes[2]
    }

    pub fn planes(&self) -> &[Image<T>; 3] {
        &self.planes
    }

    pub fn into_planes(self) -> [Image<T>; 3] {
        self.planes
    }

    /// Size of the luma plane.
    pub fn size(&self) -> (usize, usize) {
        self.planes[0].size()
    }

    pub fn is_subsampled(&self) -> bool {
        self.planes[1].size() != self.planes[0].size()
    }
}

impl<T: ImageDataType> PartialEq for Frame<T> {
    fn eq(&self, other: &Self) -> bool {
        self.planes == other.planes
    }
}

impl<T: ImageDataType> std::fmt::Display for Frame<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (xsize, ysize) = self.size();
        write!(
            f,
            "{}x{} {:?} frame ({})",
            xsize,
            ysize,
            T::DATA_TYPE_ID,
            if self.is_subsampled() { "4:2:0" } else { "4:4:4" }
        )
    }
}

impl Frame<u8> {
    /// Writes the raw planar samples: every Y row, then Cb, then Cr, with no
    /// header or padding.
    pub fn write_planar<W: Write>(&self, writer: &mut W) -> Result<()> {
        for plane in &self.planes {
            for y in 0..plane.size().1 {
                writer.write_all(plane.row(y))?;
            }
        }
        Ok(())
    }

    pub fn to_planar_bytes(&self) -> Result<Vec<u8>> {
        let total = self
            .planes
            .iter()
            .map(|plane| plane.size().0 * plane.size().1)
            .sum();
        let mut bytes = vec![];
        bytes.try_reserve_exact(total)?;
        self.write_planar(&mut bytes)?;
        Ok(bytes)
    }
}

/// Splits an interleaved `RGBRGB...` buffer, row-major with the given
/// `(xsize, ysize)`, into three planes.
pub fn planar_from_packed(data: &[u8], size: (usize, usize)) -> Result<[Image<u8>; 3]> {
    let (xsize, ysize) = size;
    let expected = xsize
        .checked_mul(ysize)
        .and_then(|n| n.checked_mul(3))
        .ok_or(Error::ImageSizeTooLarge(xsize, ysize))?;
    if data.len() != expected {
        return Err(Error::PackedSizeMismatch(data.len(), expected));
    }
    let mut planes: [Image<u8>; 3] = array_init::try_array_init(|_| Image::new(size))?;
    for (c, plane) in planes.iter_mut().enumerate() {
        for y in 0..ysize {
            let row = plane.row_mut(y);
            for (x, sample) in row.iter_mut().enumerate() {
                *sample = data[(y * xsize + x) * 3 + c];
            }
        }
    }
    Ok(planes)
}

/// Interleaves three equally sized planes back into a packed `RGBRGB...`
/// buffer.
pub fn packed_from_planar(planes: &[Image<u8>; 3]) -> Result<Vec<u8>> {
    let (xsize, ysize) = check_plane_sizes(planes)?;
    let mut data = vec![];
    data.try_reserve_exact(xsize * ysize * 3)?;
    data.extend((0..ysize).flat_map(|y| {
        (0..xsize).flat_map(move |x| (0..3).map(move |c| planes[c].row(y)[x]))
    }));
    Ok(data)
}
