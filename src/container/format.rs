use std::io::{self, Error, ErrorKind, Read, Write};

use log::error;

use crate::tools::cli::{VMAJOR, VMINOR};

/// Global stream magic, "SZ\n\x04".
pub const GLOBAL_MAGIC: [u8; 4] = [0x53, 0x5a, 0x0a, 0x04];
/// Block directory magic, "BH".
pub const BLOCK_MAGIC: [u8; 2] = [0x42, 0x48];
/// Bytes in a block directory: magic, u24 length, filename terminator.
pub const DIRSIZE: usize = 6;

/// The shared "this is not one of ours" failure.
pub fn not_szip() -> Error {
    error!("probably not an szip file; could be szip version prior to 1.10");
    Error::new(ErrorKind::Other, "not an szip file")
}

/// Read one byte, with None meaning a clean end of stream.
pub fn read_byte_opt<R: Read>(reader: &mut R) -> io::Result<Option<u8>> {
    let mut buf = [0_u8; 1];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

fn read_byte<R: Read>(reader: &mut R) -> io::Result<u8> {
    read_byte_opt(reader)?.ok_or_else(not_szip)
}

pub fn write_u24<W: Write>(writer: &mut W, x: u32) -> io::Result<()> {
    writer.write_all(&[(x >> 16) as u8, (x >> 8) as u8, x as u8])
}

pub fn read_u24<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0_u8; 3];
    reader.read_exact(&mut buf)?;
    Ok((buf[0] as u32) << 16 | (buf[1] as u32) << 8 | buf[2] as u32)
}

/// Emit the global header: magic plus the version that introduced this
/// stream format.
pub fn write_global_header<W: Write>(writer: &mut W) -> io::Result<()> {
    writer.write_all(&GLOBAL_MAGIC)?;
    writer.write_all(&[VMAJOR, VMINOR])
}

/// Validate a global header whose leading 0x53 has already been consumed.
fn read_global_header_tail<R: Read>(reader: &mut R) -> io::Result<()> {
    for &expect in GLOBAL_MAGIC[1..].iter() {
        if read_byte(reader)? != expect {
            return Err(not_szip());
        }
    }
    let vmajor = read_byte(reader)?;
    if vmajor == 0 {
        return Err(not_szip());
    }
    let vminor = read_byte(reader)?;
    if vmajor > VMAJOR || (vmajor == VMAJOR && vminor > VMINOR) {
        error!(
            "This file is szip version {}.{}, this program is {}.{}. Please update",
            vmajor, vminor, VMAJOR, VMINOR
        );
        return Err(Error::new(ErrorKind::Other, "stream version too new"));
    }
    if vmajor == 1 && vminor == 10 {
        error!("This file is szip version 1.10ALPHA; that format is not supported");
        return Err(Error::new(ErrorKind::Other, "unsupported 1.10ALPHA stream"));
    }
    Ok(())
}

/// Emit a block directory for a block of buflen bytes, returning the
/// directory size.
pub fn write_block_dir<W: Write>(writer: &mut W, buflen: u32) -> io::Result<usize> {
    writer.write_all(&BLOCK_MAGIC)?;
    write_u24(writer, buflen)?;
    // Empty filename terminates the directory.
    writer.write_all(&[0])?;
    Ok(DIRSIZE)
}

/// Read the next block directory, returning its size and the block length,
/// or None at a clean end of stream. A fresh global header between blocks
/// (a concatenated archive) is accepted and skipped.
pub fn read_block_dir<R: Read>(reader: &mut R) -> io::Result<Option<(usize, u32)>> {
    let mut ch = match read_byte_opt(reader)? {
        None => return Ok(None),
        Some(ch) => ch,
    };
    if ch == GLOBAL_MAGIC[0] {
        read_global_header_tail(reader)?;
        ch = match read_byte_opt(reader)? {
            None => return Ok(None),
            Some(ch) => ch,
        };
    }
    if ch != BLOCK_MAGIC[0] || read_byte(reader)? != BLOCK_MAGIC[1] {
        return Err(not_szip());
    }
    let buflen = read_u24(reader)?;
    if read_byte(reader)? != 0 {
        // A filename field would sit here; this stream format never
        // writes one.
        return Err(not_szip());
    }
    Ok(Some((DIRSIZE, buflen)))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn global_header_is_six_bytes() {
        let mut out = Vec::new();
        write_global_header(&mut out).unwrap();
        assert_eq!(out, vec![0x53, 0x5a, 0x0a, 0x04, VMAJOR, VMINOR]);
    }

    #[test]
    fn block_dir_round_trip() {
        let mut out = Vec::new();
        let dirsize = write_block_dir(&mut out, 0x12345).unwrap();
        assert_eq!(dirsize, DIRSIZE);
        assert_eq!(out.len(), DIRSIZE);

        let mut slice = out.as_slice();
        let (size, buflen) = read_block_dir(&mut slice).unwrap().unwrap();
        assert_eq!(size, DIRSIZE);
        assert_eq!(buflen, 0x12345);
    }

    #[test]
    fn dir_reader_skips_fresh_global_header() {
        let mut out = Vec::new();
        write_global_header(&mut out).unwrap();
        write_block_dir(&mut out, 7).unwrap();

        let mut slice = out.as_slice();
        let (_, buflen) = read_block_dir(&mut slice).unwrap().unwrap();
        assert_eq!(buflen, 7);
    }

    #[test]
    fn dir_reader_accepts_eof() {
        let empty: [u8; 0] = [];
        assert!(read_block_dir(&mut empty.as_slice()).unwrap().is_none());

        let mut header = Vec::new();
        write_global_header(&mut header).unwrap();
        assert!(read_block_dir(&mut header.as_slice()).unwrap().is_none());
    }

    #[test]
    fn dir_reader_rejects_garbage() {
        let garbage = [0x99_u8, 0x42];
        assert!(read_block_dir(&mut garbage.as_slice()).is_err());
    }

    #[test]
    fn newer_stream_version_is_rejected() {
        let stream = [0x53, 0x5a, 0x0a, 0x04, VMAJOR + 1, 0];
        let mut slice = stream.as_slice();
        assert!(read_block_dir(&mut slice).is_err());
    }

    #[test]
    fn u24_round_trip() {
        let mut out = Vec::new();
        write_u24(&mut out, 4_128_768).unwrap();
        assert_eq!(read_u24(&mut out.as_slice()).unwrap(), 4_128_768);
    }
}
