use std::io::{self, Read, Write};

use log::{debug, info};

use crate::blocksort::{bwt, fast_o4, sort::sort, SortContext, SortMode};
use crate::coder::model::Encoder;
use crate::container::format::{write_block_dir, write_global_header, write_u24};
use crate::tools::cli::{SzOpts, INCREMENTAL_FLAG};
use crate::tools::delta::delta_encode;
use crate::tools::reorder::reorder;

/*
Encode side of the container. The input is consumed block by block; each
block runs the pipeline in place (reorder, difference, sort) and is then
run-length grouped straight into the statistical coder. Blocks too short
to sort are stored raw with a length tail instead.
*/

/// Read until buf is full or the source is exhausted.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Compress reader to writer, one block at a time.
pub fn compress<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    opts: &SzOpts,
    ctx: &mut SortContext,
) -> io::Result<()> {
    let order = opts.order;
    // One block plus the sort's wraparound slack and the run sentinel.
    let mut buffer = vec![0_u8; opts.block_size + order + 1];
    let mut scratch = Vec::new();

    write_global_header(writer)?;

    loop {
        let buflen = read_full(reader, &mut buffer[..opts.block_size])?;
        if buflen == 0 {
            break;
        }

        if cfg!(feature = "alphabet64") {
            // Lossy: keep the low six bits of every byte.
            for b in buffer[..buflen].iter_mut() {
                *b &= (crate::ALPHABETSIZE - 1) as u8;
            }
        }

        let dirsize = write_block_dir(writer, buflen as u32)?;
        if buflen <= order || buflen <= 5 {
            write_stor_block(writer, dirsize, &buffer[..buflen])?;
        } else {
            write_szip_block(writer, opts, ctx, &mut buffer, buflen, &mut scratch)?;
        }
        debug!("block done");
    }
    Ok(())
}

/// A block too small to win anything: kind 0, raw bytes, length tail.
fn write_stor_block<W: Write>(writer: &mut W, dirsize: usize, block: &[u8]) -> io::Result<()> {
    info!("Storing {} bytes ...", block.len());
    writer.write_all(&[0])?;
    writer.write_all(block)?;
    write_u24(writer, (dirsize + 4 + block.len()) as u32)
}

/// Run one block through the szip pipeline: kind 1, reorder, difference,
/// sort, then run-length pairs into the coder.
fn write_szip_block<W: Write>(
    writer: &mut W,
    opts: &SzOpts,
    ctx: &mut SortContext,
    buffer: &mut [u8],
    buflen: usize,
    scratch: &mut Vec<u8>,
) -> io::Result<()> {
    info!("Processing {} bytes ...", buflen);
    writer.write_all(&[1])?;

    let width = opts.record_width();
    if width > 1 {
        scratch.resize(buflen, 0);
        reorder(&buffer[..buflen], scratch, width);
        buffer[..buflen].copy_from_slice(scratch);
    }
    if opts.recordsize & INCREMENTAL_FLAG != 0 {
        delta_encode(&mut buffer[..buflen]);
    }

    let order = opts.order;
    let mode = SortMode::from_order(order)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "order 1 and 2 cannot sort"))?;
    let indexlast = match mode {
        SortMode::BurrowsWheeler => bwt::sort_bw(buffer, buflen),
        SortMode::FastO4 => fast_o4::sort_o4(ctx, buffer, buflen),
        SortMode::NOrder(n) => sort(ctx, buffer, buflen, n),
    };

    info!("coding ...");
    write_u24(writer, indexlast as u32)?;
    writer.write_all(&[order as u8])?;

    let mut enc = Encoder::new(&mut *writer, opts.recordsize)?;

    // Sentinel so the final run terminates without a length check.
    buffer[buflen] = !buffer[buflen - 1];
    let mut p = 1_usize;
    let ch = buffer[0];
    while buffer[p] == ch {
        p += 1;
    }
    enc.encode(ch, p as u32)?;
    enc.fix_after_first();
    while p < buflen {
        let start = p;
        let ch = buffer[p];
        p += 1;
        while buffer[p] == ch {
            p += 1;
        }
        enc.encode(ch, (p - start) as u32)?;
    }
    enc.finish()?;
    Ok(())
}
