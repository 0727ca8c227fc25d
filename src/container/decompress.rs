use std::io::{self, Error, ErrorKind, Read, Write};

use log::{debug, error, info};

use crate::blocksort::{bwt, unsort::unsort, SortContext, SortMode};
use crate::coder::model::Decoder;
use crate::container::format::{not_szip, read_block_dir, read_byte_opt, read_u24};
use crate::tools::cli::INCREMENTAL_FLAG;
use crate::tools::delta::delta_decode;
use crate::tools::reorder::unreorder;
use crate::ALPHABETSIZE;

/*
Decode side of the container. Every step the encoder took is undone in
reverse: pairs come out of the coder into the block buffer (rebuilding the
per-symbol counts the unsort needs as a side effect), the matching unsort
restores the pre-sort bytes, then differencing and the record reorder are
inverted. Structural checks run before anything is trusted: the stored
tail, the run budget, indexlast's range, and the cyclic walk.
*/

/// Decompress reader to writer until the stream ends.
pub fn decompress<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    ctx: &mut SortContext,
) -> io::Result<()> {
    let mut buffer: Vec<u8> = Vec::new();
    let mut out: Vec<u8> = Vec::new();
    let mut block_counter = 0_usize;

    while let Some((dirsize, buflen)) = read_block_dir(reader)? {
        block_counter += 1;
        let buflen = buflen as usize;
        if buffer.len() < buflen {
            buffer.resize(buflen, 0);
        }
        info!("Found a valid directory for block {}.", block_counter);

        let kind = read_byte_opt(reader)?.ok_or_else(not_szip)?;
        match kind {
            0 => read_stor_block(reader, writer, dirsize + 1, buflen, &mut buffer)?,
            1 => read_szip_block(reader, writer, ctx, buflen, &mut buffer, &mut out)?,
            _ => return Err(not_szip()),
        }
        debug!("block {} done", block_counter);
    }
    Ok(())
}

/// Kind 0: copy the raw bytes through, then confirm the length tail.
fn read_stor_block<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    dirsize: usize,
    buflen: usize,
    buffer: &mut [u8],
) -> io::Result<()> {
    info!("Reading {} bytes ...", buflen);
    reader.read_exact(&mut buffer[..buflen])?;
    if read_u24(reader)? as usize != dirsize + 3 + buflen {
        return Err(not_szip());
    }
    if cfg!(feature = "alphabet64") {
        for b in buffer[..buflen].iter_mut() {
            *b |= !((crate::ALPHABETSIZE - 1) as u8);
        }
    }
    writer.write_all(&buffer[..buflen])
}

/// Kind 1: decode the pairs, unsort, and invert the pre-transforms.
fn read_szip_block<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    ctx: &mut SortContext,
    buflen: usize,
    buffer: &mut Vec<u8>,
    out: &mut Vec<u8>,
) -> io::Result<()> {
    info!("Decoding {} bytes ", buflen);
    let indexlast = read_u24(reader)? as usize;
    let order = read_byte_opt(reader)?.ok_or_else(not_szip)? as usize;
    let mode = SortMode::from_order(order).ok_or_else(not_szip)?;

    let mut charcount = [0_u32; ALPHABETSIZE];
    let mut dec = Decoder::new(&mut *reader)?;
    let recordsize = dec.recordsize;
    debug!(
        "block parameters: -o{}{}{}",
        order,
        if recordsize & 0x7f != 1 {
            format!(" -r{}", recordsize & 0x7f)
        } else {
            String::new()
        },
        if recordsize & INCREMENTAL_FLAG != 0 {
            " -i"
        } else {
            ""
        }
    );

    // Decode (symbol, run) pairs into the buffer, tallying counts for the
    // unsort. A run larger than what is left means the stream is corrupt.
    let mut bytes_left = buflen;
    let mut pos = 0_usize;
    let mut first = true;
    loop {
        let (ch, run) = dec.decode()?;
        let run = run as usize;
        if run > bytes_left {
            error!("input file corrupt");
            return Err(Error::new(ErrorKind::Other, "input file corrupt"));
        }
        buffer[pos..pos + run].fill(ch);
        pos += run;
        charcount[ch as usize] += run as u32;
        bytes_left -= run;
        if first {
            dec.fix_after_first();
            first = false;
        }
        if bytes_left == 0 {
            break;
        }
    }
    dec.finish();

    if indexlast >= buflen {
        return Err(Error::new(ErrorKind::Other, "input file corrupt"));
    }

    info!("processing ...");
    if out.len() < buflen {
        out.resize(buflen, 0);
    }
    match mode {
        SortMode::BurrowsWheeler => {
            bwt::unsort_bw(&buffer[..buflen], out, buflen, indexlast, &mut charcount)?
        }
        // The fast order-4 path sorts to the same permutation the general
        // sort does, so both invert here.
        SortMode::FastO4 | SortMode::NOrder(_) => unsort(
            ctx,
            &buffer[..buflen],
            out,
            buflen,
            indexlast,
            &mut charcount,
            order,
        )?,
    }

    if recordsize & INCREMENTAL_FLAG != 0 {
        delta_decode(&mut out[..buflen]);
    }
    let width = (recordsize & 0x7f) as usize;
    let final_block = if width > 1 {
        unreorder(&out[..buflen], &mut buffer[..buflen], width);
        &mut buffer[..buflen]
    } else {
        &mut out[..buflen]
    };

    if cfg!(feature = "alphabet64") {
        // Lossy restore: force the two dropped top bits on.
        for b in final_block.iter_mut() {
            *b |= !((crate::ALPHABETSIZE - 1) as u8);
        }
    }
    writer.write_all(final_block)
}

#[cfg(test)]
mod test {
    use super::decompress;
    use crate::blocksort::SortContext;
    use crate::container::compress::compress;
    use crate::tools::cli::{Mode, SzOpts};

    fn opts(order: usize, recordsize: u8, block_size: usize) -> SzOpts {
        SzOpts {
            block_size,
            order,
            recordsize,
            op_mode: Mode::Zip,
            verbosity: 0,
            infile: None,
            outfile: None,
        }
    }

    fn compress_bytes(data: &[u8], opts: &SzOpts) -> Vec<u8> {
        let mut ctx = SortContext::new();
        let mut out = Vec::new();
        compress(&mut &data[..], &mut out, opts, &mut ctx).unwrap();
        out
    }

    fn decompress_bytes(data: &[u8]) -> Vec<u8> {
        let mut ctx = SortContext::new();
        let mut out = Vec::new();
        decompress(&mut &data[..], &mut out, &mut ctx).unwrap();
        out
    }

    fn round_trip(data: &[u8], opts: &SzOpts) -> Vec<u8> {
        let compressed = compress_bytes(data, opts);
        assert_eq!(decompress_bytes(&compressed), data);
        compressed
    }

    #[test]
    fn empty_input_is_a_bare_header() {
        let compressed = compress_bytes(&[], &opts(6, 1, 32768));
        assert_eq!(compressed.len(), 6);
        assert_eq!(decompress_bytes(&compressed), Vec::<u8>::new());
    }

    #[cfg(not(feature = "alphabet64"))]
    mod exact {
        use super::*;

        #[test]
        fn single_byte_is_stored() {
            let compressed = round_trip(b"A", &opts(6, 1, 32768));
            // header(6) + dir(6) + kind byte: stored
            assert_eq!(compressed[12], 0);
            assert_eq!(compressed.len(), 6 + 6 + 1 + 1 + 3);
        }

        #[test]
        fn short_uniform_block() {
            round_trip(&[0_u8; 16], &opts(6, 1, 32768));
        }

        #[test]
        fn counting_block_is_szip_coded() {
            let data: Vec<u8> = (0..64).collect();
            let compressed = round_trip(&data, &opts(6, 1, 32768));
            assert_eq!(compressed[12], 1);
        }

        #[test]
        fn repetitive_text_shrinks() {
            let data: Vec<u8> = b"abcdefgh".iter().copied().cycle().take(10_000).collect();
            let compressed = round_trip(&data, &opts(6, 1, 32768));
            assert!(compressed.len() < data.len());
        }

        #[test]
        fn reorder_and_incremental_block() {
            // Fixed pseudo-random content.
            let mut state = 0x2545_f491_u32;
            let data: Vec<u8> = (0..1024)
                .map(|_| {
                    state = state.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
                    (state >> 24) as u8
                })
                .collect();
            round_trip(&data, &opts(8, 4 | 0x80, 32768));
        }

        #[test]
        fn every_sort_variant_round_trips() {
            let data: Vec<u8> = b"the quick brown fox jumps over the lazy dog. "
                .iter()
                .copied()
                .cycle()
                .take(3000)
                .collect();
            for order in [0_usize, 3, 4, 5, 6, 8, 16, 32] {
                round_trip(&data, &opts(order, 1, 32768));
            }
        }

        #[test]
        fn record_widths_round_trip() {
            let data: Vec<u8> = (0..997).map(|i| (i % 251) as u8).collect();
            for width in [1_u8, 2, 3, 7] {
                for inc in [0_u8, 0x80] {
                    round_trip(&data, &opts(6, width | inc, 32768));
                }
            }
        }

        #[test]
        fn multiple_blocks() {
            let data: Vec<u8> = (0..100_000).map(|i| (i / 3 % 200) as u8).collect();
            // 32 KB blocks force several blocks per stream.
            round_trip(&data, &opts(6, 1, 32768));
        }

        #[test]
        fn concatenated_archives_decode_as_one() {
            let a: Vec<u8> = b"first archive ".iter().copied().cycle().take(500).collect();
            let b: Vec<u8> = b"second archive ".iter().copied().cycle().take(700).collect();
            let mut joined = compress_bytes(&a, &opts(6, 1, 32768));
            joined.extend(compress_bytes(&b, &opts(5, 1, 32768)));

            let mut expected = a;
            expected.extend(b);
            assert_eq!(decompress_bytes(&joined), expected);
        }

        #[test]
        fn compression_is_deterministic() {
            let data: Vec<u8> = (0..5000).map(|i| (i * 7 % 256) as u8).collect();
            let o = opts(6, 3 | 0x80, 32768);
            assert_eq!(compress_bytes(&data, &o), compress_bytes(&data, &o));
        }
    }

    #[test]
    fn stored_tail_mismatch_is_fatal() {
        let mut compressed = compress_bytes(b"A", &opts(6, 1, 32768));
        let tail = compressed.len() - 1;
        compressed[tail] ^= 0xff;
        let mut ctx = SortContext::new();
        let mut out = Vec::new();
        assert!(decompress(&mut &compressed[..], &mut out, &mut ctx).is_err());
    }

    #[test]
    fn unknown_block_kind_is_fatal() {
        let mut compressed = compress_bytes(b"A", &opts(6, 1, 32768));
        // kind byte sits after header and directory
        compressed[12] = 7;
        let mut ctx = SortContext::new();
        let mut out = Vec::new();
        assert!(decompress(&mut &compressed[..], &mut out, &mut ctx).is_err());
    }

    #[test]
    fn truncated_stream_is_fatal() {
        let data: Vec<u8> = (0..64).collect();
        let compressed = compress_bytes(&data, &opts(6, 1, 32768));
        let mut ctx = SortContext::new();
        let mut out = Vec::new();
        assert!(decompress(&mut &compressed[..10], &mut out, &mut ctx).is_err());
    }
}
