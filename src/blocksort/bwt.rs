use std::io::{self, Error, ErrorKind};

use crate::ALPHABETSIZE;

/*
Order-0 fallback: the Burrows-Wheeler transform in szip's orientation.
Like the n-order sort, positions are keyed by the bytes behind them: the
primary radix is the byte at the position, the comparator then walks
backwards to the start of the block, and a position whose backward context
runs out sorts ahead of any longer match. Each sorted slot emits the byte
following its position; indexfirst is the slot holding the final position,
where the inverse walk starts.

The truncation is what lets the inverse claim the first slot of its bucket
for indexfirst before ranking everyone else in block order: position 0 has
the empty backward context and therefore heads its bucket.
*/

/// Compare the backward contexts of a and b (the bytes before each
/// position, read right to left, stopping at the block start).
fn backward_cmp(block: &[u8], a: usize, b: usize) -> std::cmp::Ordering {
    let n = a.min(b);
    for t in 1..=n {
        match block[a - t].cmp(&block[b - t]) {
            std::cmp::Ordering::Equal => continue,
            other => return other,
        }
    }
    a.cmp(&b)
}

/// Burrows-Wheeler transform of block[0..length] in place, returning
/// indexfirst.
pub fn sort_bw(block: &mut [u8], length: usize) -> usize {
    let mut counts = [0_u32; ALPHABETSIZE];
    for &b in block[..length].iter() {
        counts[b as usize] += 1;
    }
    let mut starts = [0_u32; ALPHABETSIZE];
    for i in 0..ALPHABETSIZE - 1 {
        starts[i + 1] = starts[i] + counts[i];
    }

    // Radix by leading byte, then order each bucket by its suffixes.
    let mut rotations = vec![0_u32; length];
    {
        let mut cursor = starts;
        for (i, &b) in block[..length].iter().enumerate() {
            rotations[cursor[b as usize] as usize] = i as u32;
            cursor[b as usize] += 1;
        }
    }
    let mut indexfirst = 0;
    for i in 0..ALPHABETSIZE {
        if counts[i] == 0 {
            continue;
        }
        let start = starts[i] as usize;
        let end = start + counts[i] as usize;
        let bucket = &mut rotations[start..end];
        bucket.sort_unstable_by(|&a, &b| backward_cmp(&block[..length], a as usize, b as usize));
        if i == block[length - 1] as usize {
            indexfirst = start
                + bucket
                    .iter()
                    .position(|&p| p as usize == length - 1)
                    .expect("last rotation missing from its bucket");
        }
    }

    // Emit the column of successor bytes; the rotation starting at the
    // last position wraps to the block's first byte.
    let mut out = vec![0_u8; length];
    for (slot, &p) in out.iter_mut().zip(rotations.iter()) {
        let p = p as usize;
        *slot = if p == length - 1 {
            block[0]
        } else {
            block[p + 1]
        };
    }
    block[..length].copy_from_slice(&out);
    indexfirst
}

/// Invert sort_bw, writing the original block into out.
///
/// counts holds the per-symbol occurrence counts of block[0..length]; it is
/// consumed (converted to start offsets in place).
pub fn unsort_bw(
    block: &[u8],
    out: &mut [u8],
    length: usize,
    indexfirst: usize,
    counts: &mut [u32; ALPHABETSIZE],
) -> io::Result<()> {
    debug_assert!(indexfirst < length);
    debug_assert!(out.len() >= length);

    let mut sum = length as u32;
    for i in (0..ALPHABETSIZE).rev() {
        sum -= counts[i];
        counts[i] = sum;
    }

    // Transform vector: indexfirst claims its slot first, everyone else
    // follows in block order.
    let mut transvec = vec![0_u32; length];
    transvec[indexfirst] = counts[block[indexfirst] as usize];
    counts[block[indexfirst] as usize] += 1;
    for i in 0..length {
        if i == indexfirst {
            continue;
        }
        transvec[i] = counts[block[i] as usize];
        counts[block[i] as usize] += 1;
    }

    let mut ic = indexfirst;
    for slot in out[..length].iter_mut() {
        *slot = block[ic];
        ic = transvec[ic] as usize;
    }
    if ic != indexfirst {
        return Err(Error::new(
            ErrorKind::Other,
            "input file corrupt (transform walk not cyclic)",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{sort_bw, unsort_bw};
    use crate::tools::freq_count::freqs;

    fn round_trip(data: &[u8]) {
        let length = data.len();
        let mut block = data.to_vec();
        let indexfirst = sort_bw(&mut block, length);
        assert!(indexfirst < length);
        assert_eq!(freqs(&block), freqs(data));

        let mut counts = freqs(&block);
        let mut out = vec![0; length];
        unsort_bw(&block, &mut out, length, indexfirst, &mut counts).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn banana() {
        round_trip(b"banana");
    }

    #[test]
    fn single_byte() {
        round_trip(&[42]);
    }

    #[test]
    fn uniform_block() {
        round_trip(&[7; 64]);
    }

    #[test]
    fn periodic_block() {
        let data: Vec<u8> = (0..300).map(|i| (i % 3) as u8).collect();
        round_trip(&data);
    }

    #[test]
    fn mixed_block() {
        let data: Vec<u8> = (0..2000)
            .map(|i| ((i * 31 + i / 17) % crate::ALPHABETSIZE) as u8)
            .collect();
        round_trip(&data);
    }
}
