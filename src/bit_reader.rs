// Copyright (c) the yuvhuff Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fmt::Debug;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Reads bits from a sequence of bytes, LSB-first within each byte.
#[derive(Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_buf: u64,
    bits_in_buf: usize,
    total_bits_read: usize,
}

/// Maximum number of bits `peek` and `read` can handle in one call.
pub const MAX_BITS_PER_CALL: usize = 56;

impl<'a> BitReader<'a> {
    /// Constructs a BitReader over a given range of data.
    pub fn new(data: &[u8]) -> BitReader {
        BitReader {
            data,
            bit_buf: 0,
            bits_in_buf: 0,
            total_bits_read: 0,
        }
    }

    /// Reads `num` bits from the buffer without consuming them.
    pub fn peek(&mut self, num: usize) -> Result<u64> {
        if num > MAX_BITS_PER_CALL {
            return Err(Error::ReadTooManyBits(num));
        }
        self.refill();
        if self.bits_in_buf < num {
            return Err(Error::OutOfBounds);
        }
        Ok(self.bit_buf & ((1u64 << num) - 1))
    }

    /// Advances by `num` bits. Similar to `skip_bits`, but the bits must
    /// already be in the buffer.
    pub fn consume(&mut self, num: usize) -> Result<()> {
        if self.bits_in_buf < num {
            return Err(Error::OutOfBounds);
        }
        self.bit_buf >>= num;
        self.bits_in_buf -= num;
        self.total_bits_read += num;
        Ok(())
    }

    /// Reads `num` bits from the buffer.
    /// ```
    /// # use yuvhuff::bit_reader::BitReader;
    /// let mut br = BitReader::new(&[0b0100_0001, 0xff]);
    /// assert_eq!(br.read(4)?, 1);
    /// assert_eq!(br.read(4)?, 4);
    /// assert_eq!(br.read(8)?, 0xff);
    /// assert_eq!(br.total_bits_read(), 16);
    /// assert!(br.read(1).is_err());
    /// # Ok::<(), yuvhuff::error::Error>(())
    /// ```
    pub fn read(&mut self, num: usize) -> Result<u64> {
        let ret = self.peek(num)?;
        self.consume(num)?;
        Ok(ret)
    }

    /// Returns the total number of bits that have been read or skipped.
    pub fn total_bits_read(&self) -> usize {
        self.total_bits_read
    }

    /// Returns the number of bits that can still be read.
    pub fn total_bits_available(&self) -> usize {
        self.bits_in_buf + self.data.len() * 8
    }

    /// Skips `num` bits.
    /// ```
    /// # use yuvhuff::bit_reader::BitReader;
    /// let mut br = BitReader::new(&[0, 0b10]);
    /// br.skip_bits(9)?;
    /// assert_eq!(br.read(1)?, 1);
    /// assert_eq!(br.total_bits_read(), 10);
    /// # Ok::<(), yuvhuff::error::Error>(())
    /// ```
    #[inline(never)]
    pub fn skip_bits(&mut self, mut num: usize) -> Result<()> {
        self.total_bits_read += num;
        if num <= self.bits_in_buf {
            self.bits_in_buf -= num;
            self.bit_buf >>= num;
            return Ok(());
        }
        num -= self.bits_in_buf;
        self.bits_in_buf = 0;
        self.bit_buf = 0;
        if num > self.data.len() * 8 {
            return Err(Error::OutOfBounds);
        }
        self.data = &self.data[num / 8..];
        num %= 8;
        self.refill();
        if num > self.bits_in_buf {
            return Err(Error::OutOfBounds);
        }
        self.bits_in_buf -= num;
        self.bit_buf >>= num;
        Ok(())
    }

    fn refill(&mut self) {
        // Fast path: load 8 bytes at once and top the buffer up to 56+ bits.
        if self.data.len() >= 8 {
            let bits = LittleEndian::read_u64(self.data);
            self.bit_buf |= bits << self.bits_in_buf;
            let read_bytes = (63 - self.bits_in_buf) >> 3;
            self.bits_in_buf |= 56;
            self.data = &self.data[read_bytes..];
            debug_assert!(56 <= self.bits_in_buf && self.bits_in_buf < 64);
        } else {
            self.refill_slow()
        }
    }

    #[inline(never)]
    fn refill_slow(&mut self) {
        while self.bits_in_buf < 56 {
            if self.data.is_empty() {
                return;
            }
            self.bit_buf |= (self.data[0] as u64) << self.bits_in_buf;
            self.bits_in_buf += 8;
            self.data = &self.data[1..];
        }
    }
}

impl Debug for BitReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BitReader {{ {} bits read, {} available }}",
            self.total_bits_read,
            self.total_bits_available()
        )
    }
}
