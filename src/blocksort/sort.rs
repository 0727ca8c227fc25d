use super::SortContext;
use crate::{ALPHABETBITS, ALPHABETSIZE, ORDER2SIZE};

/*
Forward n-order sort. Positions are ordered by the `order` bytes that follow
them, taken cyclically around the block. Rather than comparison-sorting,
the permutation is built by radix passes: an order-2 seed pass buckets every
position by its 2-byte context, then each incremental pass looks one byte
further back and re-buckets, and the final pass emits the last-column byte
per position. indexlast tracks the distinguished position (the one whose
context ends the block) through every pass; the unsort needs it to anchor
its walk.

The caller provides `order` slack bytes past length; the first `order`
bytes are mirrored there once so the passes can read wrapped context
without index arithmetic.
*/

/// Sort block[0..length] in place by n-order context, returning indexlast.
///
/// block must be at least length + order bytes long and length > order.
pub fn sort(ctx: &mut SortContext, block: &mut [u8], length: usize, order: usize) -> usize {
    debug_assert!(order >= 3);
    debug_assert!(length > order);
    debug_assert!(block.len() >= length + order);

    // Mirror the front of the block into the slack for wrapped reads.
    block.copy_within(0..order, length);

    SortContext::grow_u32(&mut ctx.ptrs, length);
    SortContext::grow_u32(&mut ctx.old_ptrs, length);

    let mut counts = [0_u32; ALPHABETSIZE];
    let mut indexlast = sortorder2(ctx, block, length, &mut counts, order);
    for k in (2..=order - 2).rev() {
        indexlast = incsortorder(ctx, block, length, &counts, k, indexlast);
    }
    finishsort(ctx, block, length, &counts, indexlast)
}

/// Seed pass: bucket every position by its 2-byte context and convert the
/// per-symbol and per-context counts to start offsets.
fn sortorder2(
    ctx: &mut SortContext,
    block: &[u8],
    length: usize,
    counts: &mut [u32; ALPHABETSIZE],
    order: usize,
) -> usize {
    SortContext::grow_u32(&mut ctx.o2counts, ORDER2SIZE);
    let SortContext { ptrs, o2counts, .. } = ctx;

    let mut context = (block[length - 1] as usize) << ALPHABETBITS;
    for i in 0..length {
        context = (context >> ALPHABETBITS) | ((block[i] as usize) << ALPHABETBITS);
        counts[block[i] as usize] += 1;
        o2counts[context] += 1;
    }

    // Summing in reverse turns counts into cumulative start offsets.
    let mut sum = length as u32;
    for i in (0..ORDER2SIZE).rev() {
        sum -= o2counts[i];
        o2counts[i] = sum;
    }
    let mut sum = length as u32;
    for i in (0..ALPHABETSIZE).rev() {
        sum -= counts[i];
        counts[i] = sum;
    }

    // The context that ends the block pins indexlast to the back of its
    // bucket; the very last bucket has no successor entry to consult.
    let mut context =
        ((block[length - order] as usize) << ALPHABETBITS) | block[length - order - 1] as usize;
    let indexlast = if context == ORDER2SIZE - 1 {
        length - 1
    } else {
        (o2counts[context + 1] - 1) as usize
    };

    let offset = order - 1;
    for i in 0..offset {
        context =
            (context >> ALPHABETBITS) | ((block[i + length - offset] as usize) << ALPHABETBITS);
        ptrs[o2counts[context] as usize] = (i + length) as u32;
        o2counts[context] += 1;
    }
    for i in offset..length {
        context = (context >> ALPHABETBITS) | ((block[i - offset] as usize) << ALPHABETBITS);
        ptrs[o2counts[context] as usize] = i as u32;
        o2counts[context] += 1;
    }
    indexlast
}

/// One incremental pass: re-bucket every position by the byte `offset`
/// places back, raising the effective context order by one.
fn incsortorder(
    ctx: &mut SortContext,
    block: &[u8],
    length: usize,
    counts: &[u32; ALPHABETSIZE],
    offset: usize,
    indexlast: usize,
) -> usize {
    let mut ct = *counts;
    std::mem::swap(&mut ctx.ptrs, &mut ctx.old_ptrs);
    let SortContext { ptrs, old_ptrs, .. } = ctx;

    let mut ch = 0_usize;
    for &p in old_ptrs[..=indexlast].iter() {
        let pos = p as usize;
        ch = block[pos - offset] as usize;
        ptrs[ct[ch] as usize] = p;
        ct[ch] += 1;
    }
    let new_indexlast = (ct[ch] - 1) as usize;
    for &p in old_ptrs[indexlast + 1..length].iter() {
        let pos = p as usize;
        let ch = block[pos - offset] as usize;
        ptrs[ct[ch] as usize] = p;
        ct[ch] += 1;
    }
    new_indexlast
}

/// Final pass: read the byte before each position in sorted order and emit
/// the last column, writing it back over the block.
fn finishsort(
    ctx: &mut SortContext,
    block: &mut [u8],
    length: usize,
    counts: &[u32; ALPHABETSIZE],
    indexlast: usize,
) -> usize {
    let mut ct = *counts;
    SortContext::grow_u8(&mut ctx.sorted, length);
    let SortContext { ptrs, sorted, .. } = ctx;

    let mut ch = 0_usize;
    for &p in ptrs[..=indexlast].iter() {
        let pos = p as usize;
        ch = block[pos - 1] as usize;
        sorted[ct[ch] as usize] = block[pos];
        ct[ch] += 1;
    }
    let new_indexlast = (ct[ch] - 1) as usize;
    for &p in ptrs[indexlast + 1..length].iter() {
        let pos = p as usize;
        let ch = block[pos - 1] as usize;
        sorted[ct[ch] as usize] = block[pos];
        ct[ch] += 1;
    }
    block[..length].copy_from_slice(&sorted[..length]);
    new_indexlast
}
