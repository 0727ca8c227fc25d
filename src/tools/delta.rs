/*
Incremental differencing, the -i flag. Slowly drifting data (sampled audio,
sensor traces) turns into long runs of small values when each byte is
replaced by its difference to the previous byte mod 256. The first byte is
kept as-is; the inverse is a running prefix sum. Both directions are linear,
in place, and allocation free.
*/

/// Replace every byte after the first with its difference to its predecessor.
pub fn delta_encode(block: &mut [u8]) {
    let mut prev = match block.first() {
        Some(&b) => b,
        None => return,
    };
    for b in block.iter_mut().skip(1) {
        let cur = *b;
        *b = cur.wrapping_sub(prev);
        prev = cur;
    }
}

/// Prefix sum mod 256, undoing delta_encode.
pub fn delta_decode(block: &mut [u8]) {
    let mut acc = match block.first() {
        Some(&b) => b,
        None => return,
    };
    for b in block.iter_mut().skip(1) {
        acc = acc.wrapping_add(*b);
        *b = acc;
    }
}

#[test]
fn delta_simple() {
    let mut data = vec![10, 11, 13, 13, 10, 0];
    delta_encode(&mut data);
    assert_eq!(data, vec![10, 1, 2, 0, 253, 246]);
    delta_decode(&mut data);
    assert_eq!(data, vec![10, 11, 13, 13, 10, 0]);
}

#[test]
fn delta_wraps() {
    let mut data = vec![0xff, 0x00, 0xff];
    delta_encode(&mut data);
    assert_eq!(data, vec![0xff, 0x01, 0xff]);
    delta_decode(&mut data);
    assert_eq!(data, vec![0xff, 0x00, 0xff]);
}
