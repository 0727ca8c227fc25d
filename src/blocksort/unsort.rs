use std::io::{self, Error, ErrorKind};

use super::SortContext;
use crate::ALPHABETSIZE;

/*
Inverse of the n-order sort. The sorted block plus the per-symbol counts
fix the start offset of every symbol's bucket; what remains is recovering,
for each sorted position, where its successor sits. Context boundaries are
reconstructed bottom-up: a bitmap marks the start of every order-2 context,
then each pass refines it one order higher by marking where a symbol first
appears inside a current context. The final table holds for each position
either a direct successor cursor or, when the symbol already appeared in
the same context, an INDIRECT link to the slot that chains the occurrences.

Walking the table length steps from indexlast emits the original block; a
walk that does not return to indexlast means the input was corrupt.
*/

/// Direct/indirect discriminator in the successor table. Block lengths stay
/// far below 2^31, so the top bit is free.
const INDIRECT: u32 = 1 << 31;

fn setbit(flags: &mut [u8], bit: usize) {
    flags[bit >> 3] |= 1 << (bit & 7);
}

fn getbit(flags: &[u8], bit: usize) -> bool {
    (flags[bit >> 3] >> (bit & 7)) & 1 != 0
}

/// Undo sort, writing the original block into out.
///
/// counts holds the per-symbol occurrence counts of block[0..length]; it is
/// consumed (converted to start offsets in place). Fails with a non-cyclic
/// error when the successor walk does not close.
pub fn unsort(
    ctx: &mut SortContext,
    block: &[u8],
    out: &mut [u8],
    length: usize,
    indexlast: usize,
    counts: &mut [u32; ALPHABETSIZE],
    order: usize,
) -> io::Result<()> {
    debug_assert!(order >= 3);
    debug_assert!(indexlast < length);
    debug_assert!(out.len() >= length);

    // Convert counts to cumulative start offsets.
    let mut sum = length as u32;
    for i in (0..ALPHABETSIZE).rev() {
        sum -= counts[i];
        counts[i] = sum;
    }

    let flaglen = (length + 8) >> 3;
    SortContext::grow_u8(&mut ctx.flags1, flaglen);
    SortContext::grow_u8(&mut ctx.flags2, flaglen);

    makeorder2(&mut ctx.flags1, block, counts);

    // Raise the boundary maps to order-1. Boundaries only ever refine, so
    // the stale bits in the reused buffer are a subset of the new ones and
    // the buffers need no clearing between passes.
    for _ in 2..order - 1 {
        let SortContext { flags1, flags2, .. } = ctx;
        increaseorder(flags1, flags2, block, counts, length);
        std::mem::swap(&mut ctx.flags1, &mut ctx.flags2);
    }

    if ctx.table.len() < length + 1 {
        ctx.table.resize(length + 1, 0);
    }
    maketable(&ctx.flags1, &mut ctx.table, block, counts, length);
    ctx.table[length] = INDIRECT;

    let table = &mut ctx.table;
    let mut j = indexlast;
    for slot in out[..length].iter_mut() {
        let tmp = table[j];
        if tmp & INDIRECT != 0 {
            let link = (tmp & !INDIRECT) as usize;
            j = table[link] as usize;
            table[link] += 1;
        } else {
            table[j] += 1;
            j = tmp as usize;
        }
        *slot = block[j];
    }
    if j != indexlast {
        return Err(Error::new(
            ErrorKind::Other,
            "input file corrupt (sort walk not cyclic)",
        ));
    }
    Ok(())
}

/// Mark the start of every order-2 context in flags.
fn makeorder2(flags: &mut [u8], block: &[u8], counts: &[u32; ALPHABETSIZE]) {
    let mut ct = *counts;
    for i in 0..ALPHABETSIZE {
        setbit(flags, ct[i] as usize);
    }
    let mut j = 0_usize;
    for i in 0..ALPHABETSIZE - 1 {
        while (j as u32) < counts[i + 1] {
            ct[block[j] as usize] += 1;
            j += 1;
        }
        for k in 0..ALPHABETSIZE {
            setbit(flags, ct[k] as usize);
        }
    }
}

/// Derive the next-higher-order boundary map: inside every current context,
/// the first occurrence of each symbol starts a refined context.
fn increaseorder(
    inflags: &[u8],
    outflags: &mut [u8],
    block: &[u8],
    counts: &[u32; ALPHABETSIZE],
    length: usize,
) {
    let mut ct = *counts;
    let mut lastseen = [u32::MAX; ALPHABETSIZE];
    let mut contextstart = 0_u32;

    for i in 0..length {
        if getbit(inflags, i) {
            contextstart = i as u32;
        }
        let ch = block[i] as usize;
        if lastseen[ch] != contextstart {
            lastseen[ch] = contextstart;
            setbit(outflags, ct[ch] as usize);
        }
        ct[ch] += 1;
    }
}

/// Build the successor table: a direct cursor at each symbol's first
/// occurrence within a context, INDIRECT links for the repeats.
fn maketable(
    inflags: &[u8],
    table: &mut [u32],
    block: &[u8],
    counts: &[u32; ALPHABETSIZE],
    length: usize,
) {
    let mut ct = *counts;
    let mut firstseen = [0_u32; ALPHABETSIZE];
    let mut contextstart = 0_u32;

    for i in 0..length {
        if getbit(inflags, i) {
            contextstart = i as u32;
        }
        let ch = block[i] as usize;
        if firstseen[ch] <= contextstart {
            table[i] = ct[ch];
            firstseen[ch] = i as u32 + 1;
        } else {
            table[i] = (firstseen[ch] - 1) | INDIRECT;
        }
        ct[ch] += 1;
    }
}

#[cfg(test)]
mod test {
    use super::super::{fast_o4, sort::sort, SortContext};
    use super::unsort;
    use crate::tools::freq_count::freqs;

    fn sample(len: usize) -> Vec<u8> {
        // Deterministic, moderately repetitive test data.
        let phrase = b"the quick brown fox jumps over the lazy dog. ";
        (0..len)
            .map(|i| phrase[(i + i / 7) % phrase.len()] & (crate::ALPHABETSIZE - 1) as u8)
            .collect()
    }

    fn round_trip(data: &[u8], order: usize) {
        let mut ctx = SortContext::new();
        let length = data.len();
        let mut block = data.to_vec();
        block.resize(length + order + 1, 0);

        let indexlast = sort(&mut ctx, &mut block, length, order);
        assert!(indexlast < length);

        // The multiset of bytes survives the sort.
        assert_eq!(freqs(&block[..length]), freqs(data));

        let mut counts = freqs(&block[..length]);
        let mut out = vec![0; length];
        unsort(
            &mut ctx,
            &block[..length],
            &mut out,
            length,
            indexlast,
            &mut counts,
            order,
        )
        .unwrap();
        assert_eq!(out, data, "order {} len {}", order, length);
    }

    #[test]
    fn sort_round_trips_every_order() {
        for order in [3_usize, 5, 6, 8, 16, 32] {
            for len in [order + 2, 64, 257, 1000, 4096] {
                round_trip(&sample(len), order);
            }
        }
    }

    #[test]
    fn sort_round_trips_uniform_data() {
        let data = vec![0_u8; 200];
        round_trip(&data, 6);
    }

    #[test]
    fn sort_round_trips_two_symbol_data() {
        let data: Vec<u8> = (0..500).map(|i| (i % 2) as u8).collect();
        round_trip(&data, 5);
    }

    #[test]
    fn fast_o4_matches_norder_unsort() {
        // Order-4 blocks are sorted by the fast path but inverted by the
        // generic unsort; the two must agree on the permutation.
        let data = sample(777);
        let length = data.len();

        let mut ctx = SortContext::new();
        let mut block = data.clone();
        block.resize(length + 5, 0);
        let indexlast = fast_o4::sort_o4(&mut ctx, &mut block, length);

        let mut counts = freqs(&block[..length]);
        let mut out = vec![0; length];
        unsort(
            &mut ctx,
            &block[..length],
            &mut out,
            length,
            indexlast,
            &mut counts,
            4,
        )
        .unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn fast_o4_agrees_with_generic_sort() {
        let data = sample(512);
        let length = data.len();

        let mut ctx = SortContext::new();
        let mut b1 = data.clone();
        b1.resize(length + 5, 0);
        let i1 = fast_o4::sort_o4(&mut ctx, &mut b1, length);

        let mut ctx2 = SortContext::new();
        let mut b2 = data;
        b2.resize(length + 5, 0);
        let i2 = sort(&mut ctx2, &mut b2, length, 4);

        assert_eq!(b1[..length], b2[..length]);
        assert_eq!(i1, i2);
    }

    #[test]
    fn corrupt_block_is_not_cyclic() {
        let data = sample(300);
        let length = data.len();
        let mut ctx = SortContext::new();
        let mut block = data.clone();
        block.resize(length + 7, 0);
        let indexlast = sort(&mut ctx, &mut block, length, 6);

        // Lie about the counts: the walk cannot close.
        let mut counts = freqs(&block[..length]);
        let present: Vec<usize> = (0..counts.len()).filter(|&i| counts[i] > 0).collect();
        counts[present[0]] -= 1;
        counts[present[1]] += 1;
        let mut out = vec![0; length];
        let result = unsort(
            &mut ctx,
            &block[..length],
            &mut out,
            length,
            indexlast,
            &mut counts,
            6,
        );
        assert!(result.is_err());
    }
}
