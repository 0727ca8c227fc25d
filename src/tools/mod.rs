//! The tools module provides the helper transforms for the szip compressor.
//!
//! szip is a block-oriented approach to compress data.
//!
//! The tools are:
//! - cli: Command line interface for szip.
//! - delta: Incremental differencing (byte-wise difference mod 256) and its inverse.
//! - freq_count: Frequency count over the szip alphabet.
//! - reorder: Record reorder, grouping homologous bytes of fixed-width records.
pub mod cli;
pub mod delta;
pub mod freq_count;
pub mod reorder;
