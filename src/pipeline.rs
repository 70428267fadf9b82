// Copyright (c) the yuvhuff Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::{
    bit_reader::BitReader,
    bit_vec::BitVec,
    bundle::Bundle,
    color::{self, ColorConfig, MatrixCoefficients},
    error::{Error, Result},
    frame::Frame,
    huffman::HuffmanTree,
    image::Image,
    quant::{self, QuantRange},
    sample,
};

/// Default number of quantization levels.
pub const QUANTIZATION_LEVELS: u32 = 16;

/// Knobs for the full coding chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodecOptions {
    pub matrix: MatrixCoefficients,
    /// Quantization level count; the coded range becomes `[0, levels - 1]`.
    pub levels: u32,
    /// Range the YCbCr samples occupy before quantization.
    pub sample_range: QuantRange,
}

impl CodecOptions {
    pub fn new() -> CodecOptions {
        CodecOptions {
            matrix: MatrixCoefficients::Bt601,
            levels: QUANTIZATION_LEVELS,
            sample_range: QuantRange { low: 16, high: 240 },
        }
    }

    fn coded_range(&self) -> Result<QuantRange> {
        if self.levels == 0 || self.levels > 256 {
            return Err(Error::InvalidLevelCount(self.levels));
        }
        QuantRange::new(0, (self.levels - 1) as u8)
    }
}

impl Default for CodecOptions {
    fn default() -> CodecOptions {
        CodecOptions::new()
    }
}

/// Runs the forward color chain on one full-range digital RGB image: analog
/// RGB, then YPbPr, then limited-range YCbCr with 4:2:0 chroma.
#[instrument(skip_all, err)]
pub fn ycbcr420_from_rgb(rgb: &[Image<u8>; 3], options: &CodecOptions) -> Result<Frame<u8>> {
    color::ensure_full_range(rgb)?;
    let analog = color::dequantize_rgb(rgb, ColorConfig::full())?;
    let ypbpr = color::ypbpr_from_rgb(&analog, options.matrix)?;
    let [y, pb, pr] = color::quantize_ycbcr(&ypbpr, ColorConfig::limited())?;
    let cb = sample::subsample_420(&pb)?;
    let cr = sample::subsample_420(&pr)?;
    let frame = Frame::new([y, cb, cr])?;
    debug!("converted RGB planes into a {frame}");
    Ok(frame)
}

/// Inverse of [`ycbcr420_from_rgb`]: brings chroma back to full resolution
/// and walks the color chain back to full-range digital RGB.
#[instrument(skip_all, err)]
pub fn rgb_from_ycbcr420(frame: &Frame<u8>, options: &CodecOptions) -> Result<[Image<u8>; 3]> {
    let y = frame.luma().try_clone()?;
    let (cb, cr) = if frame.is_subsampled() {
        (
            sample::upsample_420(frame.cb())?,
            sample::upsample_420(frame.cr())?,
        )
    } else {
        (frame.cb().try_clone()?, frame.cr().try_clone()?)
    };
    let ypbpr = color::dequantize_ycbcr(&[y, cb, cr], ColorConfig::limited())?;
    let analog = color::rgb_from_ypbpr(&ypbpr, options.matrix)?;
    color::quantize_rgb(&analog, ColorConfig::full())
}

/// Quantizes every plane of every frame from `sample_range` down to the
/// coded range `[0, levels - 1]`.
pub fn quantize_frames(frames: &[Frame<u8>], options: &CodecOptions) -> Result<Vec<Frame<u8>>> {
    let coded = options.coded_range()?;
    map_frames(frames, |plane| {
        quant::quantize_evenly(plane, options.levels, options.sample_range, coded)
    })
}

/// Inverse of [`quantize_frames`], up to the precision the level count drops.
pub fn dequantize_frames(frames: &[Frame<u8>], options: &CodecOptions) -> Result<Vec<Frame<u8>>> {
    let coded = options.coded_range()?;
    map_frames(frames, |plane| {
        quant::quantize_evenly(plane, options.levels, coded, options.sample_range)
    })
}

fn map_frames<F>(frames: &[Frame<u8>], f: F) -> Result<Vec<Frame<u8>>>
where
    F: Fn(&Image<u8>) -> Result<Image<u8>> + Sync,
{
    let convert = |frame: &Frame<u8>| -> Result<Frame<u8>> {
        let planes = frame.planes();
        Frame::new([f(&planes[0])?, f(&planes[1])?, f(&planes[2])?])
    };
    #[cfg(feature = "parallel")]
    return frames.par_iter().map(convert).collect();
    #[cfg(not(feature = "parallel"))]
    frames.iter().map(convert).collect()
}

/// Counts symbol occurrences over every plane of every frame. Entries are
/// listed in first-occurrence order, scanning planes Y, Cb, Cr row by row
/// and frames in input order.
pub fn collect_frequencies(frames: &[Frame<u8>]) -> Vec<(u64, u8)> {
    let mut counts = [0u64; 256];
    let mut order = vec![];
    for frame in frames {
        for plane in frame.planes() {
            for sample in plane.iter() {
                if counts[sample as usize] == 0 {
                    order.push(sample);
                }
                counts[sample as usize] += 1;
            }
        }
    }
    order
        .into_iter()
        .map(|symbol| (counts[symbol as usize], symbol))
        .collect()
}

/// Entropy-codes `frames` into a self-describing bundle. The coding tree is
/// returned alongside so callers can later check a decode against it.
#[instrument(skip_all, err)]
pub fn encode_frames(frames: &[Frame<u8>]) -> Result<(HuffmanTree, Bundle)> {
    let frequencies = collect_frequencies(frames);
    let tree = HuffmanTree::from_frequencies(&frequencies)?;
    let encode_frame = |frame: &Frame<u8>| -> Result<[BitVec; 3]> {
        array_init::try_array_init(|c| encode_plane(&tree, &frame.planes()[c]))
    };
    #[cfg(feature = "parallel")]
    let coded: Vec<[BitVec; 3]> = frames.par_iter().map(encode_frame).collect::<Result<_>>()?;
    #[cfg(not(feature = "parallel"))]
    let coded: Vec<[BitVec; 3]> = frames.iter().map(encode_frame).collect::<Result<_>>()?;

    let mut payload = BitVec::new();
    let mut bit_lengths = vec![];
    let mut shapes = vec![];
    for (frame, planes) in frames.iter().zip(&coded) {
        let mut lengths = [0u64; 3];
        for (c, bits) in planes.iter().enumerate() {
            lengths[c] = bits.len() as u64;
            payload.extend_from(bits);
        }
        bit_lengths.push(lengths);
        shapes.push(array_init::array_init(|c| {
            let (xsize, ysize) = frame.planes()[c].size();
            (xsize as u64, ysize as u64)
        }));
    }
    debug!(
        "encoded {} frames into {} payload bits with {tree:?}",
        frames.len(),
        payload.len()
    );
    let bundle = Bundle {
        payload: payload.into_bytes(),
        bit_lengths,
        shapes,
        frequencies,
    };
    Ok((tree, bundle))
}

fn encode_plane(tree: &HuffmanTree, plane: &Image<u8>) -> Result<BitVec> {
    let mut bits = BitVec::new();
    for y in 0..plane.size().1 {
        for &sample in plane.row(y) {
            tree.encode_into(sample, &mut bits)?;
        }
    }
    Ok(bits)
}

/// Decodes a bundle back into frames, rebuilding the coding tree from its
/// frequency table. When `expected_tree` is given, the rebuilt tree must
/// match it exactly.
#[instrument(skip_all, err)]
pub fn decode_frames(
    bundle: &Bundle,
    expected_tree: Option<&HuffmanTree>,
) -> Result<(HuffmanTree, Vec<Frame<u8>>)> {
    bundle.validate()?;
    let tree = bundle.tree()?;
    if let Some(expected) = expected_tree {
        if tree != *expected {
            return Err(Error::TreeMismatch);
        }
    }
    // Bit offset of every plane in the payload, frame by frame.
    let mut offsets = vec![];
    let mut start: u64 = 0;
    for lengths in &bundle.bit_lengths {
        let mut frame_offsets = [0u64; 3];
        for (c, &bits) in lengths.iter().enumerate() {
            frame_offsets[c] = start;
            start += bits;
        }
        offsets.push(frame_offsets);
    }
    let decode_frame = |index: usize| -> Result<Frame<u8>> {
        let planes: [Image<u8>; 3] = array_init::try_array_init(|c| {
            decode_plane(
                &tree,
                &bundle.payload,
                offsets[index][c],
                bundle.bit_lengths[index][c],
                bundle.shapes[index][c],
            )
        })?;
        Frame::new(planes)
    };
    #[cfg(feature = "parallel")]
    let frames: Vec<Frame<u8>> = (0..bundle.num_frames())
        .into_par_iter()
        .map(decode_frame)
        .collect::<Result<_>>()?;
    #[cfg(not(feature = "parallel"))]
    let frames: Vec<Frame<u8>> = (0..bundle.num_frames())
        .map(decode_frame)
        .collect::<Result<_>>()?;
    debug!("decoded {} frames", frames.len());
    Ok((tree, frames))
}

fn decode_plane(
    tree: &HuffmanTree,
    payload: &[u8],
    start_bit: u64,
    num_bits: u64,
    shape: (u64, u64),
) -> Result<Image<u8>> {
    let xsize = usize::try_from(shape.0).map_err(|_| Error::ArithmeticOverflow)?;
    let ysize = usize::try_from(shape.1).map_err(|_| Error::ArithmeticOverflow)?;
    let start_bit = usize::try_from(start_bit).map_err(|_| Error::ArithmeticOverflow)?;
    let mut reader = BitReader::new(payload);
    reader.skip_bits(start_bit)?;
    let symbols = tree.decode(&mut reader, num_bits)?;
    Image::from_vec((xsize, ysize), symbols)
}
