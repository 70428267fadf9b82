// Copyright (c) the yuvhuff Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt::Debug;

use tracing::debug;

use crate::{
    bit_reader::BitReader,
    bit_vec::BitVec,
    error::{Error, Result},
};

const ALPHABET_SIZE: usize = 256;

#[derive(Debug, PartialEq, Eq)]
enum Node {
    Leaf(u8),
    Branch(Box<Node>, Box<Node>),
}

#[derive(Debug, PartialEq, Eq)]
struct HeapEntry {
    weight: u64,
    seq: u64,
    node: Node,
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // Priority is weight first, then creation order. `seq` is unique, so the
    // node itself never takes part in comparisons.
    fn cmp(&self, other: &Self) -> Ordering {
        (self.weight, self.seq).cmp(&(other.weight, other.seq))
    }
}

/// Prefix-free binary code over byte symbols, built by repeatedly merging the
/// two lightest subtrees.
///
/// Ties are broken by creation order: leaves in frequency-table order first,
/// then merged nodes in the order they were formed. Building twice from the
/// same table therefore yields identical trees, and equality ([`PartialEq`])
/// is structural.
pub struct HuffmanTree {
    root: Node,
    codes: Vec<Option<BitVec>>,
}

impl HuffmanTree {
    /// Builds the coding tree for `frequencies`, a `(count, symbol)` table.
    /// ```
    /// # use yuvhuff::huffman::HuffmanTree;
    /// let tree = HuffmanTree::from_frequencies(&[(3, b'a'), (1, b'b'), (1, b'c')])?;
    /// assert_eq!(tree.code(b'a')?.len(), 1);
    /// assert_eq!(tree.code(b'b')?.len(), 2);
    /// # Ok::<(), yuvhuff::error::Error>(())
    /// ```
    pub fn from_frequencies(frequencies: &[(u64, u8)]) -> Result<HuffmanTree> {
        if frequencies.is_empty() {
            return Err(Error::EmptyFrequencyTable);
        }
        let mut seen = [false; ALPHABET_SIZE];
        let mut heap = BinaryHeap::with_capacity(frequencies.len());
        for (seq, &(weight, symbol)) in frequencies.iter().enumerate() {
            if seen[symbol as usize] {
                return Err(Error::DuplicateSymbol(symbol));
            }
            seen[symbol as usize] = true;
            heap.push(Reverse(HeapEntry {
                weight,
                seq: seq as u64,
                node: Node::Leaf(symbol),
            }));
        }
        let mut next_seq = frequencies.len() as u64;
        let root = loop {
            let Some(Reverse(first)) = heap.pop() else {
                return Err(Error::EmptyFrequencyTable);
            };
            let Some(Reverse(second)) = heap.pop() else {
                break first.node;
            };
            heap.push(Reverse(HeapEntry {
                weight: first.weight + second.weight,
                seq: next_seq,
                node: Node::Branch(Box::new(first.node), Box::new(second.node)),
            }));
            next_seq += 1;
        };
        let mut codes = vec![None; ALPHABET_SIZE];
        assign_codes(&root, BitVec::new(), &mut codes);
        let tree = HuffmanTree { root, codes };
        debug!("built {tree:?} from a table of {} entries", frequencies.len());
        Ok(tree)
    }

    /// The code word for `symbol`.
    pub fn code(&self, symbol: u8) -> Result<&BitVec> {
        self.codes[symbol as usize]
            .as_ref()
            .ok_or(Error::UnknownSymbol(symbol))
    }

    /// Appends the code word for `symbol` to `out`.
    pub fn encode_into(&self, symbol: u8, out: &mut BitVec) -> Result<()> {
        out.extend_from(self.code(symbol)?);
        Ok(())
    }

    /// Decodes symbols from `reader` until exactly `num_bits` bits past the
    /// current position have been consumed.
    pub fn decode(&self, reader: &mut BitReader, num_bits: u64) -> Result<Vec<u8>> {
        let end = (reader.total_bits_read() as u64)
            .checked_add(num_bits)
            .ok_or(Error::ArithmeticOverflow)?;
        let mut symbols = vec![];
        while (reader.total_bits_read() as u64) < end {
            symbols.push(self.decode_symbol(reader, end)?);
        }
        Ok(symbols)
    }

    fn decode_symbol(&self, reader: &mut BitReader, end: u64) -> Result<u8> {
        // A lone-leaf tree still consumes one bit per symbol.
        if let Node::Leaf(symbol) = self.root {
            read_code_bit(reader, end)?;
            return Ok(symbol);
        }
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(symbol) => return Ok(*symbol),
                Node::Branch(left, right) => {
                    node = if read_code_bit(reader, end)? == 0 {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

fn assign_codes(node: &Node, prefix: BitVec, codes: &mut [Option<BitVec>]) {
    match node {
        Node::Leaf(symbol) => {
            let code = if prefix.is_empty() {
                // A lone symbol still needs a nonempty code.
                let mut one_bit = BitVec::new();
                one_bit.push(false);
                one_bit
            } else {
                prefix
            };
            codes[*symbol as usize] = Some(code);
        }
        Node::Branch(left, right) => {
            let mut left_prefix = prefix.clone();
            left_prefix.push(false);
            assign_codes(left, left_prefix, codes);
            let mut right_prefix = prefix;
            right_prefix.push(true);
            assign_codes(right, right_prefix, codes);
        }
    }
}

fn read_code_bit(reader: &mut BitReader, end: u64) -> Result<u64> {
    if reader.total_bits_read() as u64 >= end {
        return Err(Error::TruncatedBitstream);
    }
    reader.read(1).map_err(|_| Error::TruncatedBitstream)
}

impl PartialEq for HuffmanTree {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl Eq for HuffmanTree {}

impl Debug for HuffmanTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbols = self.codes.iter().flatten().count();
        let max_bits = self.codes.iter().flatten().map(BitVec::len).max();
        write!(
            f,
            "HuffmanTree {{ symbols: {}, max code bits: {} }}",
            symbols,
            max_bits.unwrap_or(0)
        )
    }
}
