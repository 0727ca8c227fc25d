/*
Record reorder. A stream of fixed-width records compresses better when the
homologous bytes of every record sit next to each other, so the forward
direction de-interleaves: all first bytes, then all second bytes, and so on.

The block length need not be a multiple of the record width. Column k of a
width-w block of length len holds len/w entries, plus one more for the first
len%w columns (the trailing partial record). Laying the columns out back to
back makes the operation a permutation of [0, len) for every len, so the
inverse is always defined.
*/

/// Byte offset where column k starts in the reordered block.
fn column_start(k: usize, len: usize, width: usize) -> usize {
    k * (len / width) + k.min(len % width)
}

/// De-interleave src into dst. Both slices must have the same length.
pub fn reorder(src: &[u8], dst: &mut [u8], width: usize) {
    debug_assert_eq!(src.len(), dst.len());
    let len = src.len();
    let mut out = 0;
    for k in 0..width {
        let mut idx = k;
        while idx < len {
            dst[out] = src[idx];
            out += 1;
            idx += width;
        }
    }
    debug_assert_eq!(out, len);
}

/// Re-interleave src into dst, undoing reorder exactly.
pub fn unreorder(src: &[u8], dst: &mut [u8], width: usize) {
    debug_assert_eq!(src.len(), dst.len());
    let len = src.len();
    for k in 0..width {
        let mut from = column_start(k, len, width);
        let mut idx = k;
        while idx < len {
            dst[idx] = src[from];
            from += 1;
            idx += width;
        }
    }
}
