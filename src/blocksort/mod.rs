//! The blocksort module holds the forward and inverse block sorts of szip.
//!
//! Three variants share one interface:
//! - n-order (order >= 3): sort by the `order` bytes following each
//!   position, taken cyclically. The workhorse.
//! - order-4 fast path: the same ordering for order 4, reached through a
//!   16-bit-context two-pass radix. Inverts through the n-order unsort.
//! - Burrows-Wheeler (order 0): full rotation sort, used when unbounded
//!   context beats a fixed order.
//!
//! All scratch memory lives in a SortContext owned by the driver; buffers
//! grow on demand and are reused across blocks, never shrunk.
pub mod bwt;
pub mod fast_o4;
pub mod sort;
pub mod unsort;

/// Which sort variant a block uses. The order byte in the block header is
/// the on-stream discriminant: 0 selects Burrows-Wheeler, 4 the fast
/// path, anything from 3 up the general sort; 1 and 2 are not sortable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortMode {
    /// Order 0: full rotation sort, reports indexfirst.
    BurrowsWheeler,
    /// Order 4 through the 16-bit-context fast path; inverts as NOrder.
    FastO4,
    /// The general n-order sort.
    NOrder(usize),
}

impl SortMode {
    pub fn from_order(order: usize) -> Option<Self> {
        match order {
            0 => Some(Self::BurrowsWheeler),
            1 | 2 => None,
            4 => Some(Self::FastO4),
            _ => Some(Self::NOrder(order)),
        }
    }
}

/// Reusable scratch buffers for the sorts and unsorts. One per process,
/// owned by the compress/decompress driver and grown lazily.
pub struct SortContext {
    /// Current position permutation, one u32 per block byte.
    ptrs: Vec<u32>,
    /// Permutation from the previous pass; role swaps each pass.
    old_ptrs: Vec<u32>,
    /// 2-byte-context cumulative offsets (ORDER2SIZE entries).
    o2counts: Vec<u32>,
    /// Sorted last-column bytes from the final pass.
    sorted: Vec<u8>,
    /// Context-boundary bitmaps for the unsort, roles flip per pass.
    flags1: Vec<u8>,
    flags2: Vec<u8>,
    /// Successor table for the unsort walk (length + 1 entries).
    table: Vec<u32>,
    /// 16-bit-context counters for the order-4 fast path.
    counters: Vec<u32>,
    /// Per-position high context halves for the order-4 fast path.
    context: Vec<u16>,
    /// Per-position symbols for the order-4 fast path.
    symbols: Vec<u8>,
}

impl SortContext {
    pub fn new() -> Self {
        Self {
            ptrs: Vec::new(),
            old_ptrs: Vec::new(),
            o2counts: Vec::new(),
            sorted: Vec::new(),
            flags1: Vec::new(),
            flags2: Vec::new(),
            table: Vec::new(),
            counters: Vec::new(),
            context: Vec::new(),
            symbols: Vec::new(),
        }
    }

    /// Grow a buffer to len, zeroing the portion the caller will read.
    fn grow_u32(buf: &mut Vec<u32>, len: usize) {
        if buf.len() < len {
            buf.resize(len, 0);
        }
        buf[..len].fill(0);
    }

    fn grow_u8(buf: &mut Vec<u8>, len: usize) {
        if buf.len() < len {
            buf.resize(len, 0);
        }
        buf[..len].fill(0);
    }
}

impl Default for SortContext {
    fn default() -> Self {
        Self::new()
    }
}
