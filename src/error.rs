// Copyright (c) the yuvhuff Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::{bit_reader::MAX_BITS_PER_CALL, bundle::BUNDLE_MAGIC};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Read out of bounds")]
    OutOfBounds,
    #[error("Cannot read {0} bits in one call, max is {max}", max = MAX_BITS_PER_CALL)]
    ReadTooManyBits(usize),
    #[error("Bitstream ends in the middle of a code word")]
    TruncatedBitstream,
    #[error("Image size too large: {0}x{1}")]
    ImageSizeTooLarge(usize, usize),
    #[error("Invalid image size: {0}x{1}")]
    InvalidImageSize(usize, usize),
    #[error("Plane data has {0} samples, expected {1}x{2}")]
    PlaneSizeMismatch(usize, usize, usize),
    #[error("Plane sizes differ: {0}x{1} vs {2}x{3}")]
    PlaneShapeMismatch(usize, usize, usize, usize),
    #[error("Chroma planes of {2}x{3} do not fit a {0}x{1} luma plane")]
    ChromaShapeMismatch(usize, usize, usize, usize),
    #[error("Cannot subsample a {0}x{1} plane, dimensions must be even")]
    OddDimensions(usize, usize),
    #[error("Packed buffer has {0} bytes, expected {1}")]
    PackedSizeMismatch(usize, usize),
    #[error("Invalid enum value {0} for {1}")]
    InvalidEnum(u32, String),
    #[error("Samples span [{0}, {1}], which is not full-range RGB")]
    NotFullRange(u8, u8),
    #[error("Invalid quantization range: [{0}, {1}]")]
    InvalidRange(u8, u8),
    #[error("Invalid quantization level count: {0}")]
    InvalidLevelCount(u32),
    #[error("Sample {0} outside the quantization range [{1}, {2}]")]
    SampleOutOfRange(u8, u8, u8),
    #[error("Cannot build a Huffman tree from an empty frequency table")]
    EmptyFrequencyTable,
    #[error("Symbol {0} appears twice in the frequency table")]
    DuplicateSymbol(u8),
    #[error("Symbol {0} has no code in the Huffman tree")]
    UnknownSymbol(u8),
    #[error("Decoding tree does not match the expected tree")]
    TreeMismatch,
    #[error("Invalid bundle signature {0:02x?}, expected {magic:02x?}", magic = BUNDLE_MAGIC)]
    InvalidSignature([u8; 4]),
    #[error("Bundle field {0} is missing")]
    MissingField(&'static str),
    #[error("Bundle symbol {0} does not fit a byte")]
    SymbolTooLarge(u64),
    #[error("Bundle metadata disagrees on frame count: {0} bit lengths, {1} shapes")]
    FrameCountMismatch(usize, usize),
    #[error("Bundle records {0} bits but the payload holds {1}")]
    PayloadTooShort(u64, u64),
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
    #[error("Out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
