// Copyright (c) the yuvhuff Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::{
    error::{Error, Result},
    image::{Image, ImageDataType},
};

/// Keeps the even-indexed rows and columns of `plane`, halving both
/// dimensions. Planes with odd dimensions are rejected.
pub fn subsample_420<T: ImageDataType>(plane: &Image<T>) -> Result<Image<T>> {
    let (xsize, ysize) = plane.size();
    if xsize % 2 != 0 || ysize % 2 != 0 {
        return Err(Error::OddDimensions(xsize, ysize));
    }
    let mut out = Image::new((xsize / 2, ysize / 2))?;
    for y in 0..ysize / 2 {
        let src_row = plane.row(2 * y);
        let out_row = out.row_mut(y);
        for (x, sample) in out_row.iter_mut().enumerate() {
            *sample = src_row[2 * x];
        }
    }
    Ok(out)
}

/// Replicates every sample of `plane` into a 2x2 block, doubling both
/// dimensions. Undoes [`subsample_420`] up to the samples it dropped.
pub fn upsample_420<T: ImageDataType>(plane: &Image<T>) -> Result<Image<T>> {
    let (xsize, ysize) = plane.size();
    let mut out = Image::new((xsize * 2, ysize * 2))?;
    for y in 0..ysize {
        let src_row = plane.row(y);
        for dy in 0..2 {
            let out_row = out.row_mut(2 * y + dy);
            for x in 0..xsize {
                out_row[2 * x] = src_row[x];
                out_row[2 * x + 1] = src_row[x];
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;
    use test_log::test;

    use super::*;

    #[test]
    fn subsample_keeps_even_indices() -> Result<()> {
        let mut plane = Image::<u8>::new((4, 2))?;
        plane.row_mut(0).copy_from_slice(&[1, 2, 3, 4]);
        plane.row_mut(1).copy_from_slice(&[5, 6, 7, 8]);
        let half = subsample_420(&plane)?;
        assert_eq!(half.size(), (2, 1));
        assert_eq!(half.row(0), &[1, 3]);
        Ok(())
    }

    #[test]
    fn upsample_replicates_blocks() -> Result<()> {
        let input_size = (250, 200);
        let mut rng = XorShiftRng::seed_from_u64(0);
        let input = Image::<u8>::new_random(input_size, &mut rng)?;
        let output = upsample_420(&input)?;
        assert_eq!(output.size(), (input_size.0 * 2, input_size.1 * 2));
        for y in 0..output.size().1 {
            for x in 0..output.size().0 {
                let i = input.row(y / 2)[x / 2];
                let o = output.row(y)[x];
                assert_eq!(i, o, "mismatch at output position {x}x{y}: {i} vs {o}");
            }
        }
        Ok(())
    }

    #[test]
    fn upsample_then_subsample_is_identity() -> Result<()> {
        let mut rng = XorShiftRng::seed_from_u64(1);
        let input = Image::<f32>::new_random((16, 12), &mut rng)?;
        assert_eq!(subsample_420(&upsample_420(&input)?)?, input);
        Ok(())
    }

    #[test]
    fn odd_dimensions_rejected() -> Result<()> {
        let plane = Image::<f32>::new((5, 4))?;
        assert!(matches!(
            subsample_420(&plane),
            Err(Error::OddDimensions(5, 4))
        ));
        let plane = Image::<f32>::new((4, 5))?;
        assert!(subsample_420(&plane).is_err());
        Ok(())
    }
}
