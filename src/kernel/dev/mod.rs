// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Device Drivers

// SimpleAES block cipher accelerator
pub mod simpleaes;

// Re-exports
pub use simpleaes::{SimpleAes, SimpleAesDriver};
