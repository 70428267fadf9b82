// Copyright (c) the yuvhuff Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use num_derive::FromPrimitive;
use tracing::debug;

use crate::{
    error::{Error, Result},
    image::{Image, ImageDataType, check_plane_sizes},
};

/// How digital samples map to and from analog values.
///
/// Full range spreads the signal over all 256 codes. Limited range keeps the
/// studio-video footroom and headroom: luma in [16, 235] and chroma in
/// [16, 240]. Every conversion here works on gamma-corrected samples, E'
/// rather than E; linear light never enters the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorConfig {
    pub full_range: bool,
}

impl ColorConfig {
    pub fn full() -> ColorConfig {
        ColorConfig { full_range: true }
    }

    pub fn limited() -> ColorConfig {
        ColorConfig { full_range: false }
    }
}

/// Matrix coefficient sets from ITU-T H.273, identified by their code points.
#[derive(Copy, Clone, PartialEq, Eq, Debug, FromPrimitive)]
pub enum MatrixCoefficients {
    Bt709 = 1,
    Bt601 = 6,
    Bt2020 = 9,
}

impl std::fmt::Display for MatrixCoefficients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                MatrixCoefficients::Bt709 => "BT.709",
                MatrixCoefficients::Bt601 => "BT.601",
                MatrixCoefficients::Bt2020 => "BT.2020",
            }
        )
    }
}

impl MatrixCoefficients {
    pub fn from_id(id: u32) -> Result<MatrixCoefficients> {
        num_traits::FromPrimitive::from_u32(id)
            .ok_or_else(|| Error::InvalidEnum(id, "MatrixCoefficients".to_string()))
    }

    /// The (Kr, Kb) luma weights of this coefficient set.
    pub fn kr_kb(self) -> (f32, f32) {
        match self {
            MatrixCoefficients::Bt709 => (0.2126, 0.0722),
            MatrixCoefficients::Bt601 => (0.299, 0.114),
            MatrixCoefficients::Bt2020 => (0.2627, 0.0593),
        }
    }
}

fn map_plane<A, B, F>(plane: &Image<A>, f: F) -> Result<Image<B>>
where
    A: ImageDataType,
    B: ImageDataType,
    F: Fn(A) -> B,
{
    let (xsize, ysize) = plane.size();
    let mut out = Image::new((xsize, ysize))?;
    for y in 0..ysize {
        let src_row = plane.row(y);
        let out_row = out.row_mut(y);
        for (out_sample, &sample) in out_row.iter_mut().zip(src_row) {
            *out_sample = f(sample);
        }
    }
    Ok(out)
}

/// Recovers analog values from digital RGB samples.
pub fn dequantize_rgb(rgb: &[Image<u8>; 3], config: ColorConfig) -> Result<[Image<f32>; 3]> {
    check_plane_sizes(rgb)?;
    let f: fn(u8) -> f32 = if config.full_range {
        |d| d as f32 / 255.0
    } else {
        |d| (d as f32 - 16.0) / 219.0
    };
    array_init::try_array_init(|c| map_plane(&rgb[c], f))
}

/// Quantizes analog RGB back to digital samples, rounding to nearest and
/// clamping to the valid code range.
pub fn quantize_rgb(rgb: &[Image<f32>; 3], config: ColorConfig) -> Result<[Image<u8>; 3]> {
    check_plane_sizes(rgb)?;
    let f: fn(f32) -> u8 = if config.full_range {
        |e| (255.0 * e).round().clamp(0.0, 255.0) as u8
    } else {
        |e| (219.0 * e + 16.0).round().clamp(0.0, 255.0) as u8
    };
    array_init::try_array_init(|c| map_plane(&rgb[c], f))
}

/// Quantizes analog YPbPr planes to digital YCbCr. Chroma is offset to put
/// the zero point at code 128.
pub fn quantize_ycbcr(ypbpr: &[Image<f32>; 3], config: ColorConfig) -> Result<[Image<u8>; 3]> {
    check_plane_sizes(ypbpr)?;
    let (fy, fc): (fn(f32) -> u8, fn(f32) -> u8) = if config.full_range {
        (
            |e| (255.0 * e).round().clamp(0.0, 255.0) as u8,
            |p| (255.0 * p + 128.0).round().clamp(0.0, 255.0) as u8,
        )
    } else {
        (
            |e| (219.0 * e + 16.0).round().clamp(0.0, 255.0) as u8,
            |p| (224.0 * p + 128.0).round().clamp(0.0, 255.0) as u8,
        )
    };
    Ok([
        map_plane(&ypbpr[0], fy)?,
        map_plane(&ypbpr[1], fc)?,
        map_plane(&ypbpr[2], fc)?,
    ])
}

/// Recovers analog YPbPr from digital YCbCr planes.
pub fn dequantize_ycbcr(ycbcr: &[Image<u8>; 3], config: ColorConfig) -> Result<[Image<f32>; 3]> {
    check_plane_sizes(ycbcr)?;
    let (fy, fc): (fn(u8) -> f32, fn(u8) -> f32) = if config.full_range {
        (|d| d as f32 / 255.0, |d| (d as f32 - 128.0) / 255.0)
    } else {
        (|d| (d as f32 - 16.0) / 219.0, |d| (d as f32 - 128.0) / 224.0)
    };
    Ok([
        map_plane(&ycbcr[0], fy)?,
        map_plane(&ycbcr[1], fc)?,
        map_plane(&ycbcr[2], fc)?,
    ])
}

/// Computes YPbPr from analog RGB with the given luma weights. Pb and Pr are
/// scaled so that they stay within [-0.5, 0.5] for in-range input.
pub fn ypbpr_from_rgb(
    rgb: &[Image<f32>; 3],
    matrix: MatrixCoefficients,
) -> Result<[Image<f32>; 3]> {
    let (xsize, ysize) = check_plane_sizes(rgb)?;
    let (kr, kb) = matrix.kr_kb();
    let kg = 1.0 - kr - kb;
    debug!("{matrix} forward conversion of {xsize}x{ysize} planes");
    let mut out_y = Image::new((xsize, ysize))?;
    let mut out_pb = Image::new((xsize, ysize))?;
    let mut out_pr = Image::new((xsize, ysize))?;
    for row in 0..ysize {
        let row_r = rgb[0].row(row);
        let row_g = rgb[1].row(row);
        let row_b = rgb[2].row(row);
        let row_y = out_y.row_mut(row);
        let row_pb = out_pb.row_mut(row);
        let row_pr = out_pr.row_mut(row);
        for idx in 0..xsize {
            let y = kr * row_r[idx] + kg * row_g[idx] + kb * row_b[idx];
            row_y[idx] = y;
            row_pb[idx] = 0.5 * (row_b[idx] - y) / (1.0 - kb);
            row_pr[idx] = 0.5 * (row_r[idx] - y) / (1.0 - kr);
        }
    }
    Ok([out_y, out_pb, out_pr])
}

/// Algebraic inverse of [`ypbpr_from_rgb`].
pub fn rgb_from_ypbpr(
    ypbpr: &[Image<f32>; 3],
    matrix: MatrixCoefficients,
) -> Result<[Image<f32>; 3]> {
    let (xsize, ysize) = check_plane_sizes(ypbpr)?;
    let (kr, kb) = matrix.kr_kb();
    let kg = 1.0 - kr - kb;
    let mut out_r = Image::new((xsize, ysize))?;
    let mut out_g = Image::new((xsize, ysize))?;
    let mut out_b = Image::new((xsize, ysize))?;
    for row in 0..ysize {
        let row_y = ypbpr[0].row(row);
        let row_pb = ypbpr[1].row(row);
        let row_pr = ypbpr[2].row(row);
        let row_r = out_r.row_mut(row);
        let row_g = out_g.row_mut(row);
        let row_b = out_b.row_mut(row);
        for idx in 0..xsize {
            let y = row_y[idx];
            let r = y + 2.0 * (1.0 - kr) * row_pr[idx];
            let b = y + 2.0 * (1.0 - kb) * row_pb[idx];
            row_r[idx] = r;
            row_b[idx] = b;
            row_g[idx] = (y - kr * r - kb * b) / kg;
        }
    }
    Ok([out_r, out_g, out_b])
}

/// Checks that `rgb` actually uses the full digital range. Limited-range
/// material never leaves [16, 235], so a signal confined to it is rejected.
pub fn ensure_full_range(rgb: &[Image<u8>; 3]) -> Result<()> {
    check_plane_sizes(rgb)?;
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    for plane in rgb {
        for sample in plane.iter() {
            min = min.min(sample);
            max = max.max(sample);
        }
    }
    if max > 235 || min < 16 {
        Ok(())
    } else {
        Err(Error::NotFullRange(min, max))
    }
}

#[cfg(test)]
mod test {
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;
    use test_log::test;

    use super::*;
    use crate::util::test::{assert_all_almost_eq, assert_almost_eq};

    fn constant_planes(values: [f32; 3], size: (usize, usize)) -> Result<[Image<f32>; 3]> {
        array_init::try_array_init(|c| {
            Image::from_vec(size, vec![values[c]; size.0 * size.1])
        })
    }

    #[test]
    fn known_code_points() -> Result<()> {
        assert_eq!(MatrixCoefficients::from_id(1)?, MatrixCoefficients::Bt709);
        assert_eq!(MatrixCoefficients::from_id(6)?, MatrixCoefficients::Bt601);
        assert_eq!(MatrixCoefficients::from_id(9)?, MatrixCoefficients::Bt2020);
        assert!(matches!(
            MatrixCoefficients::from_id(2),
            Err(Error::InvalidEnum(2, _))
        ));
        Ok(())
    }

    #[test]
    fn gray_has_no_chroma() -> Result<()> {
        let rgb = constant_planes([0.5, 0.5, 0.5], (4, 2))?;
        for matrix in [
            MatrixCoefficients::Bt709,
            MatrixCoefficients::Bt601,
            MatrixCoefficients::Bt2020,
        ] {
            let [y, pb, pr] = ypbpr_from_rgb(&rgb, matrix)?;
            for row in 0..2 {
                assert_all_almost_eq!(y.row(row), [0.5; 4], 1e-6);
                assert_all_almost_eq!(pb.row(row), [0.0; 4], 1e-6);
                assert_all_almost_eq!(pr.row(row), [0.0; 4], 1e-6);
            }
        }
        Ok(())
    }

    #[test]
    fn primaries_hit_chroma_extremes() -> Result<()> {
        // Pure blue maximizes Pb, pure red maximizes Pr.
        let blue = constant_planes([0.0, 0.0, 1.0], (1, 1))?;
        let [y, pb, pr] = ypbpr_from_rgb(&blue, MatrixCoefficients::Bt601)?;
        assert_almost_eq!(y.row(0)[0], 0.114, 1e-6);
        assert_almost_eq!(pb.row(0)[0], 0.5, 1e-6);
        assert_almost_eq!(pr.row(0)[0], 0.5 * (0.0 - 0.114) / (1.0 - 0.299), 1e-6);

        let red = constant_planes([1.0, 0.0, 0.0], (1, 1))?;
        let [_, _, pr] = ypbpr_from_rgb(&red, MatrixCoefficients::Bt601)?;
        assert_almost_eq!(pr.row(0)[0], 0.5, 1e-6);
        Ok(())
    }

    #[test]
    fn ypbpr_roundtrips() -> Result<()> {
        let mut rng = XorShiftRng::seed_from_u64(2);
        let rgb: [Image<f32>; 3] =
            array_init::try_array_init(|_| Image::new_random((20, 10), &mut rng))?;
        for matrix in [
            MatrixCoefficients::Bt709,
            MatrixCoefficients::Bt601,
            MatrixCoefficients::Bt2020,
        ] {
            let ypbpr = ypbpr_from_rgb(&rgb, matrix)?;
            let back = rgb_from_ypbpr(&ypbpr, matrix)?;
            for c in 0..3 {
                for row in 0..10 {
                    assert_all_almost_eq!(back[c].row(row), rgb[c].row(row), 1e-5);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn quantization_anchors() -> Result<()> {
        let ypbpr = constant_planes([1.0, 0.0, 0.0], (2, 2))?;
        let full = quantize_ycbcr(&ypbpr, ColorConfig::full())?;
        assert_eq!(full[0].row(0), &[255, 255]);
        assert_eq!(full[1].row(0), &[128, 128]);
        assert_eq!(full[2].row(1), &[128, 128]);
        let limited = quantize_ycbcr(&ypbpr, ColorConfig::limited())?;
        assert_eq!(limited[0].row(0), &[235, 235]);
        assert_eq!(limited[1].row(0), &[128, 128]);

        let black = constant_planes([0.0, -0.5, 0.5], (2, 2))?;
        let limited = quantize_ycbcr(&black, ColorConfig::limited())?;
        assert_eq!(limited[0].row(0), &[16, 16]);
        assert_eq!(limited[1].row(0), &[16, 16]);
        assert_eq!(limited[2].row(0), &[240, 240]);
        Ok(())
    }

    #[test]
    fn dequantization_anchors() -> Result<()> {
        let ycbcr = [
            Image::from_vec((3, 1), vec![16u8, 235, 128])?,
            Image::from_vec((3, 1), vec![128u8, 16, 240])?,
            Image::from_vec((3, 1), vec![128u8, 128, 128])?,
        ];
        let [y, pb, _] = dequantize_ycbcr(&ycbcr, ColorConfig::limited())?;
        assert_all_almost_eq!(y.row(0), [0.0, 1.0, 112.0 / 219.0], 1e-6);
        assert_all_almost_eq!(pb.row(0), [0.0, -0.5, 0.5], 1e-6);
        Ok(())
    }

    #[test]
    fn digital_rgb_roundtrips_exactly() -> Result<()> {
        let mut rng = XorShiftRng::seed_from_u64(3);
        let rgb: [Image<u8>; 3] =
            array_init::try_array_init(|_| Image::new_random((16, 16), &mut rng))?;
        let analog = dequantize_rgb(&rgb, ColorConfig::full())?;
        let back = quantize_rgb(&analog, ColorConfig::full())?;
        assert_eq!(back, rgb);
        Ok(())
    }

    #[test]
    fn full_range_check() -> Result<()> {
        let flat: [Image<u8>; 3] =
            array_init::try_array_init(|_| Image::from_vec((2, 2), vec![128; 4]))?;
        assert!(matches!(
            ensure_full_range(&flat),
            Err(Error::NotFullRange(128, 128))
        ));

        let mut bright = flat;
        bright[1].row_mut(1)[1] = 240;
        ensure_full_range(&bright)?;

        let dark: [Image<u8>; 3] =
            array_init::try_array_init(|_| Image::from_vec((2, 2), vec![10, 128, 128, 128]))?;
        ensure_full_range(&dark)?;
        Ok(())
    }

    #[test]
    fn mismatched_planes_rejected() -> Result<()> {
        let rgb = [
            Image::<f32>::new((4, 4))?,
            Image::<f32>::new((4, 4))?,
            Image::<f32>::new((2, 2))?,
        ];
        assert!(ypbpr_from_rgb(&rgb, MatrixCoefficients::Bt601).is_err());
        Ok(())
    }
}
