// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Bit Manipulation Utilities
//!
//! This module provides bit-level manipulation functions used for working
//! with hardware registers and bitfields. A field is described by its
//! position (lowest bit) and an in-place mask.

/// Build an in-place mask for a field
///
/// # Arguments
///
/// * `pos` - Position of the lowest bit of the field
/// * `width` - Number of bits in the field (1..=32)
#[inline]
pub const fn field_mask(pos: u32, width: u32) -> u32 {
    if width >= 32 {
        u32::MAX << pos
    } else {
        ((1u32 << width) - 1) << pos
    }
}

/// Extract a field from a register word
#[inline]
pub const fn field_get(word: u32, pos: u32, mask: u32) -> u32 {
    (word & mask) >> pos
}

/// Replace a field in a register word, leaving every other bit untouched
///
/// Bits of `value` that do not fit in the field are discarded.
#[inline]
pub const fn field_set(word: u32, pos: u32, mask: u32, value: u32) -> u32 {
    (word & !mask) | ((value << pos) & mask)
}
