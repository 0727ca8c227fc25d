//! Rust version of the szip block-sorting compressor.
//!
//! Version 0.4.0
//!
//! - Compresses a byte stream in blocks: optional record reorder and
//!   incremental differencing, an n-order context sort (with an order-4
//!   fast path and a Burrows-Wheeler fallback at order 0), then run-length
//!   grouping fed into an adaptive range coder.
//! - The archive is self-consistent but intentionally not bit-compatible
//!   with the historical szip 1.x tool.
//!
//! Basic usage to compress a file:
//!
//! ```text
//! $> szip test.bin test.sz
//! ```
//!
//! and to decompress it again:
//!
//! ```text
//! $> szip -d test.sz test.bin
//! ```
//!
//! With no file names, szip filters stdin to stdout.
pub mod blocksort;
pub mod coder;
pub mod container;
pub mod tools;

/// Number of distinct symbols handled by the sorts and the coder.
///
/// The 64-symbol build masks every input byte to its low six bits on the
/// way in (lossy) and forces the top two bits on again on the way out.
#[cfg(not(feature = "alphabet64"))]
pub const ALPHABETSIZE: usize = 256;
#[cfg(feature = "alphabet64")]
pub const ALPHABETSIZE: usize = 64;

/// log2 of [`ALPHABETSIZE`], the shift used to roll 2-byte contexts.
pub const ALPHABETBITS: usize = ALPHABETSIZE.trailing_zeros() as usize;

/// Size of a 2-byte context table.
pub const ORDER2SIZE: usize = ALPHABETSIZE * ALPHABETSIZE;
