// Copyright (c) the yuvhuff Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fmt::Debug;

/// Append-only bit buffer, the writing counterpart of
/// [`BitReader`](crate::bit_reader::BitReader).
///
/// Bits are packed LSB-first within each byte, so the first bit pushed is the
/// first bit a `BitReader` over [`as_bytes`](BitVec::as_bytes) returns.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BitVec {
    bytes: Vec<u8>,
    len: usize,
}

impl Debug for BitVec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BitVec[")?;
        for index in 0..self.len {
            write!(f, "{}", self.bit(index) as u8)?;
        }
        write!(f, "]")
    }
}

impl BitVec {
    pub fn new() -> BitVec {
        BitVec::default()
    }

    /// Number of bits pushed so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends a single bit.
    /// ```
    /// # use yuvhuff::bit_vec::BitVec;
    /// let mut bits = BitVec::new();
    /// bits.push(true);
    /// bits.push(false);
    /// bits.push(true);
    /// bits.push(true);
    /// assert_eq!(bits.len(), 4);
    /// assert_eq!(bits.as_bytes(), [0b1101]);
    /// ```
    pub fn push(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            self.bytes[self.len / 8] |= 1 << (self.len % 8);
        }
        self.len += 1;
    }

    /// Appends all bits of `other`.
    pub fn extend_from(&mut self, other: &BitVec) {
        for index in 0..other.len {
            self.push(other.bit(index));
        }
    }

    /// Returns the bit at `index`.
    pub fn bit(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        self.bytes[index / 8] & (1 << (index % 8)) != 0
    }

    /// The packed bytes, with unused high bits of the last byte set to zero.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
