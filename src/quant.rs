// Copyright (c) the yuvhuff Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use tracing::trace;

use crate::{
    error::{Error, Result},
    image::Image,
};

/// Closed interval of digital sample values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuantRange {
    pub low: u8,
    pub high: u8,
}

impl QuantRange {
    pub fn new(low: u8, high: u8) -> Result<QuantRange> {
        if low > high {
            return Err(Error::InvalidRange(low, high));
        }
        Ok(QuantRange { low, high })
    }

    /// Number of representable values, `high - low + 1`.
    pub fn span(&self) -> u32 {
        self.high as u32 - self.low as u32 + 1
    }
}

/// Maps each sample of `plane` from `src` to `dst` with evenly sized bins.
///
/// `levels` names the number of quantization levels and must equal the span
/// of the narrower of the two ranges. Every input sample must lie within
/// `src`. Calling with `src` and `dst` swapped runs the (lossy) inverse
/// mapping.
pub fn quantize_evenly(
    plane: &Image<u8>,
    levels: u32,
    src: QuantRange,
    dst: QuantRange,
) -> Result<Image<u8>> {
    if src.low > src.high {
        return Err(Error::InvalidRange(src.low, src.high));
    }
    if dst.low > dst.high {
        return Err(Error::InvalidRange(dst.low, dst.high));
    }
    if levels != src.span().min(dst.span()) {
        return Err(Error::InvalidLevelCount(levels));
    }
    trace!("quantizing {plane:?} from {src:?} to {dst:?}");
    let (xsize, ysize) = plane.size();
    let mut out = Image::new((xsize, ysize))?;
    for y in 0..ysize {
        let src_row = plane.row(y);
        let out_row = out.row_mut(y);
        for (out_sample, &sample) in out_row.iter_mut().zip(src_row) {
            if sample < src.low || sample > src.high {
                return Err(Error::SampleOutOfRange(sample, src.low, src.high));
            }
            let scaled = (sample - src.low) as u32 * dst.span() / src.span();
            *out_sample = (dst.low as u32 + scaled).min(dst.high as u32) as u8;
        }
    }
    Ok(out)
}
