// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Command Line Parsing
//!
//! Boot arguments in `key=value` form, separated by whitespace. Drivers read
//! their tunables from here.
//!
//! # Design
//!
//! - Keys without `=` carry an empty value
//! - The last occurrence of a key wins
//! - Integers accept decimal or `0x` hex
//!
//! # Usage
//!
//! ```rust,ignore
//! let cmdline = Cmdline::new("simpleaes.timeout_ms=250 quiet");
//!
//! let timeout = cmdline.get_u32("simpleaes.timeout_ms", 0);
//! let quiet = cmdline.get_bool("quiet", false);
//! ```

/// A borrowed kernel command line
#[derive(Debug, Clone, Copy)]
pub struct Cmdline<'a> {
    data: &'a str,
}

impl<'a> Cmdline<'a> {
    /// Wrap a command line string
    pub const fn new(data: &'a str) -> Self {
        Self { data }
    }

    /// Iterate over `(key, value)` pairs in order
    pub fn entries(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.data
            .split_ascii_whitespace()
            .map(|arg| arg.split_once('=').unwrap_or((arg, "")))
    }

    /// Get the value of a key
    ///
    /// # Returns
    ///
    /// The value of the last occurrence, or `None` if the key is absent.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.entries().filter(|(k, _)| *k == key).map(|(_, v)| v).last()
    }

    /// Get a boolean value
    ///
    /// A present key is true unless its value is `0`, `false` or `off`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            None => default,
            Some(v) => !matches!(v, "0" | "false" | "off"),
        }
    }

    /// Get a u32 value
    ///
    /// # Arguments
    ///
    /// * `key` - Key to look up
    /// * `default` - Default value if key not found or invalid
    pub fn get_u32(&self, key: &str, default: u32) -> u32 {
        match self.get(key) {
            None | Some("") => default,
            Some(v) => parse_u32(v).unwrap_or(default),
        }
    }
}

fn parse_u32(v: &str) -> Option<u32> {
    match v.strip_prefix("0x").or_else(|| v.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => v.parse().ok(),
    }
}
