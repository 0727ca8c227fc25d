//! The coder module is the entropy-coding subsystem of szip.
//!
//! szip codes the sorted block as (symbol, run length) pairs. The
//! rangecoder submodule supplies a carryless range coder working directly
//! on the byte stream; the model submodule keeps the adaptive frequency
//! tables for the two pair alphabets and exposes the encode/decode calls
//! the block pipeline uses.
//!
//! The coded payload carries no explicit length: the decoder's
//! renormalization consumes exactly the bytes the encoder's produced, so
//! after the last run the stream is positioned at the next block directory.
pub mod model;
pub mod rangecoder;
