// Copyright (c) the yuvhuff Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use crate::{
    error::{Error, Result},
    huffman::HuffmanTree,
};

/// Signature at the start of every serialized bundle.
pub const BUNDLE_MAGIC: [u8; 4] = *b"yhb1";

const FIELD_PAYLOAD: &str = "payload";
const FIELD_BIT_LENGTHS: &str = "bit_lengths";
const FIELD_SHAPES: &str = "shapes";
const FIELD_FREQUENCIES: &str = "frequencies";

/// Entropy-coded frames plus everything needed to decode them again.
///
/// All four fields are required: the chained code words of every plane
/// (`payload`), how many bits each plane occupies (`bit_lengths`), each
/// plane's dimensions (`shapes`), and the `(count, symbol)` table the coding
/// tree is rebuilt from (`frequencies`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub payload: Vec<u8>,
    /// Per frame, the bit count of each plane's code words in Y, Cb, Cr
    /// order.
    pub bit_lengths: Vec<[u64; 3]>,
    /// Per frame, each plane's `(xsize, ysize)` in Y, Cb, Cr order.
    pub shapes: Vec<[(u64, u64); 3]>,
    /// `(count, symbol)` pairs in first-occurrence order.
    pub frequencies: Vec<(u64, u8)>,
}

impl Bundle {
    pub fn num_frames(&self) -> usize {
        self.bit_lengths.len()
    }

    /// Rebuilds the Huffman tree from the stored frequency table.
    pub fn tree(&self) -> Result<HuffmanTree> {
        HuffmanTree::from_frequencies(&self.frequencies)
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        if self.bit_lengths.len() != self.shapes.len() {
            return Err(Error::FrameCountMismatch(
                self.bit_lengths.len(),
                self.shapes.len(),
            ));
        }
        let mut total: u64 = 0;
        for lengths in &self.bit_lengths {
            for &bits in lengths {
                total = total.checked_add(bits).ok_or(Error::ArithmeticOverflow)?;
            }
        }
        let available = self.payload.len() as u64 * 8;
        if total > available {
            return Err(Error::PayloadTooShort(total, available));
        }
        Ok(())
    }

    /// Serializes the bundle as a sequence of named, length-prefixed fields.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.validate()?;
        writer.write_all(&BUNDLE_MAGIC)?;
        writer.write_u32::<LittleEndian>(4)?;
        write_field(writer, FIELD_PAYLOAD, &self.payload)?;
        write_field(writer, FIELD_BIT_LENGTHS, &encode_bit_lengths(&self.bit_lengths))?;
        write_field(writer, FIELD_SHAPES, &encode_shapes(&self.shapes))?;
        write_field(writer, FIELD_FREQUENCIES, &encode_frequencies(&self.frequencies))?;
        Ok(())
    }

    /// Reads a bundle back, skipping unknown fields and checking that all
    /// required ones are present.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Bundle> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != BUNDLE_MAGIC {
            return Err(Error::InvalidSignature(magic));
        }
        let num_fields = reader.read_u32::<LittleEndian>()?;
        let mut payload = None;
        let mut bit_lengths = None;
        let mut shapes = None;
        let mut frequencies = None;
        for _ in 0..num_fields {
            let (name, bytes) = read_field(reader)?;
            if name == FIELD_PAYLOAD.as_bytes() {
                payload = Some(bytes);
            } else if name == FIELD_BIT_LENGTHS.as_bytes() {
                bit_lengths = Some(decode_bit_lengths(&bytes)?);
            } else if name == FIELD_SHAPES.as_bytes() {
                shapes = Some(decode_shapes(&bytes)?);
            } else if name == FIELD_FREQUENCIES.as_bytes() {
                frequencies = Some(decode_frequencies(&bytes)?);
            } else {
                debug!("skipping unknown field {:?}", String::from_utf8_lossy(&name));
            }
        }
        let bundle = Bundle {
            payload: payload.ok_or(Error::MissingField(FIELD_PAYLOAD))?,
            bit_lengths: bit_lengths.ok_or(Error::MissingField(FIELD_BIT_LENGTHS))?,
            shapes: shapes.ok_or(Error::MissingField(FIELD_SHAPES))?,
            frequencies: frequencies.ok_or(Error::MissingField(FIELD_FREQUENCIES))?,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        debug!("saving a bundle of {} frames to {:?}", self.num_frames(), path.as_ref());
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Bundle> {
        Bundle::read_from(&mut BufReader::new(File::open(path)?))
    }
}

fn write_field<W: Write>(writer: &mut W, name: &str, bytes: &[u8]) -> Result<()> {
    writer.write_u32::<LittleEndian>(name.len() as u32)?;
    writer.write_all(name.as_bytes())?;
    writer.write_u64::<LittleEndian>(bytes.len() as u64)?;
    writer.write_all(bytes)?;
    Ok(())
}

fn read_field<R: Read>(reader: &mut R) -> Result<(Vec<u8>, Vec<u8>)> {
    let name_len = reader.read_u32::<LittleEndian>()? as usize;
    let name = read_bytes(reader, name_len)?;
    let len = reader.read_u64::<LittleEndian>()?;
    let len = usize::try_from(len).map_err(|_| Error::ArithmeticOverflow)?;
    let bytes = read_bytes(reader, len)?;
    Ok((name, bytes))
}

fn read_bytes<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![];
    bytes.try_reserve_exact(len)?;
    bytes.resize(len, 0);
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn encode_bit_lengths(bit_lengths: &[[u64; 3]]) -> Vec<u8> {
    let mut bytes = vec![];
    bytes.extend_from_slice(&(bit_lengths.len() as u64).to_le_bytes());
    for lengths in bit_lengths {
        for &bits in lengths {
            bytes.extend_from_slice(&bits.to_le_bytes());
        }
    }
    bytes
}

fn decode_bit_lengths(mut bytes: &[u8]) -> Result<Vec<[u64; 3]>> {
    let num_frames = read_count(&mut bytes)?;
    let mut out = vec![];
    out.try_reserve_exact(num_frames)?;
    for _ in 0..num_frames {
        let mut lengths = [0u64; 3];
        for bits in &mut lengths {
            *bits = bytes.read_u64::<LittleEndian>()?;
        }
        out.push(lengths);
    }
    Ok(out)
}

fn encode_shapes(shapes: &[[(u64, u64); 3]]) -> Vec<u8> {
    let mut bytes = vec![];
    bytes.extend_from_slice(&(shapes.len() as u64).to_le_bytes());
    for frame in shapes {
        for &(xsize, ysize) in frame {
            bytes.extend_from_slice(&xsize.to_le_bytes());
            bytes.extend_from_slice(&ysize.to_le_bytes());
        }
    }
    bytes
}

fn decode_shapes(mut bytes: &[u8]) -> Result<Vec<[(u64, u64); 3]>> {
    let num_frames = read_count(&mut bytes)?;
    let mut out = vec![];
    out.try_reserve_exact(num_frames)?;
    for _ in 0..num_frames {
        let mut frame = [(0u64, 0u64); 3];
        for shape in &mut frame {
            shape.0 = bytes.read_u64::<LittleEndian>()?;
            shape.1 = bytes.read_u64::<LittleEndian>()?;
        }
        out.push(frame);
    }
    Ok(out)
}

fn encode_frequencies(frequencies: &[(u64, u8)]) -> Vec<u8> {
    let mut bytes = vec![];
    bytes.extend_from_slice(&(frequencies.len() as u64).to_le_bytes());
    for &(count, symbol) in frequencies {
        bytes.extend_from_slice(&count.to_le_bytes());
        bytes.extend_from_slice(&(symbol as u64).to_le_bytes());
    }
    bytes
}

fn decode_frequencies(mut bytes: &[u8]) -> Result<Vec<(u64, u8)>> {
    let num_entries = read_count(&mut bytes)?;
    let mut out = vec![];
    out.try_reserve_exact(num_entries)?;
    for _ in 0..num_entries {
        let count = bytes.read_u64::<LittleEndian>()?;
        let symbol = bytes.read_u64::<LittleEndian>()?;
        let symbol = u8::try_from(symbol).map_err(|_| Error::SymbolTooLarge(symbol))?;
        out.push((count, symbol));
    }
    Ok(out)
}

fn read_count(bytes: &mut &[u8]) -> Result<usize> {
    let count = bytes.read_u64::<LittleEndian>()?;
    usize::try_from(count).map_err(|_| Error::ArithmeticOverflow)
}

#[cfg(test)]
mod test {
    use test_log::test;

    use super::*;

    fn sample_bundle() -> Bundle {
        Bundle {
            payload: vec![0b1101_0010, 0b0000_0110],
            bit_lengths: vec![[6, 4, 1]],
            shapes: vec![[(2, 2), (1, 1), (1, 1)]],
            frequencies: vec![(4, 128), (2, 35)],
        }
    }

    #[test]
    fn roundtrips_in_memory() -> Result<()> {
        let bundle = sample_bundle();
        let mut bytes = vec![];
        bundle.write_to(&mut bytes)?;
        assert_eq!(&bytes[..4], &BUNDLE_MAGIC);
        let read_back = Bundle::read_from(&mut bytes.as_slice())?;
        assert_eq!(read_back, bundle);
        Ok(())
    }

    #[test]
    fn bad_signature_rejected() -> Result<()> {
        let mut bytes = vec![];
        sample_bundle().write_to(&mut bytes)?;
        bytes[0] = b'x';
        assert!(matches!(
            Bundle::read_from(&mut bytes.as_slice()),
            Err(Error::InvalidSignature(_))
        ));
        Ok(())
    }

    #[test]
    fn missing_field_detected() -> Result<()> {
        let bundle = sample_bundle();
        let mut bytes = vec![];
        bytes.extend_from_slice(&BUNDLE_MAGIC);
        bytes.write_u32::<LittleEndian>(3)?;
        write_field(&mut bytes, FIELD_PAYLOAD, &bundle.payload)?;
        write_field(&mut bytes, FIELD_BIT_LENGTHS, &encode_bit_lengths(&bundle.bit_lengths))?;
        write_field(&mut bytes, FIELD_SHAPES, &encode_shapes(&bundle.shapes))?;
        assert!(matches!(
            Bundle::read_from(&mut bytes.as_slice()),
            Err(Error::MissingField(FIELD_FREQUENCIES))
        ));
        Ok(())
    }

    #[test]
    fn unknown_fields_skipped() -> Result<()> {
        let bundle = sample_bundle();
        let mut bytes = vec![];
        bytes.extend_from_slice(&BUNDLE_MAGIC);
        bytes.write_u32::<LittleEndian>(5)?;
        write_field(&mut bytes, "comment", b"not part of the format")?;
        write_field(&mut bytes, FIELD_PAYLOAD, &bundle.payload)?;
        write_field(&mut bytes, FIELD_BIT_LENGTHS, &encode_bit_lengths(&bundle.bit_lengths))?;
        write_field(&mut bytes, FIELD_SHAPES, &encode_shapes(&bundle.shapes))?;
        write_field(&mut bytes, FIELD_FREQUENCIES, &encode_frequencies(&bundle.frequencies))?;
        assert_eq!(Bundle::read_from(&mut bytes.as_slice())?, bundle);
        Ok(())
    }

    #[test]
    fn oversized_symbol_rejected() {
        let mut bytes = vec![];
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&7u64.to_le_bytes());
        bytes.extend_from_slice(&300u64.to_le_bytes());
        assert!(matches!(
            decode_frequencies(&bytes),
            Err(Error::SymbolTooLarge(300))
        ));
    }

    #[test]
    fn frame_count_mismatch_detected() {
        let mut bundle = sample_bundle();
        bundle.shapes.push([(2, 2), (1, 1), (1, 1)]);
        assert!(matches!(
            bundle.validate(),
            Err(Error::FrameCountMismatch(1, 2))
        ));
        let mut bytes = vec![];
        assert!(bundle.write_to(&mut bytes).is_err());
    }

    #[test]
    fn payload_must_cover_recorded_bits() {
        let mut bundle = sample_bundle();
        bundle.bit_lengths[0] = [100, 0, 0];
        assert!(matches!(
            bundle.validate(),
            Err(Error::PayloadTooShort(100, 16))
        ));
    }

    #[test]
    fn truncated_input_is_an_io_error() -> Result<()> {
        let mut bytes = vec![];
        sample_bundle().write_to(&mut bytes)?;
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            Bundle::read_from(&mut bytes.as_slice()),
            Err(Error::Io(_))
        ));
        Ok(())
    }

    #[test]
    fn saves_and_loads_files() -> Result<()> {
        let bundle = sample_bundle();
        let path = std::env::temp_dir().join(format!("yuvhuff-bundle-{}.yhb", std::process::id()));
        bundle.save(&path)?;
        let loaded = Bundle::load(&path)?;
        std::fs::remove_file(&path)?;
        assert_eq!(loaded, bundle);
        Ok(())
    }

    #[test]
    fn tree_comes_from_the_stored_table() -> Result<()> {
        let bundle = sample_bundle();
        assert_eq!(
            bundle.tree()?,
            HuffmanTree::from_frequencies(&bundle.frequencies)?
        );
        Ok(())
    }
}
