// Copyright (c) the yuvhuff Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

#![deny(unsafe_code)]

pub mod bit_reader;
pub mod bit_vec;
pub mod bundle;
pub mod color;
pub mod error;
pub mod frame;
pub mod huffman;
pub mod image;
pub mod pipeline;
pub mod quant;
pub mod sample;
pub mod util;
