use std::io::{self, Read, Write};

/*
Carryless range coder. A 32-bit (low, range) pair narrows with every coded
symbol; whenever the top byte of low is settled it goes out, and when range
drops below BOTTOM it is clamped so a carry can never ripple into bytes
already written. The decoder runs the identical (low, range) recurrence, so
it reads a byte exactly where the encoder wrote one. The encoder flushes
four bytes at the end, the decoder primes four bytes at the start, which
keeps the byte counts equal on both sides.

Frequencies passed in must satisfy total <= BOTTOM or range/total can
reach zero mid-stream.
*/

const TOP: u32 = 1 << 24;
const BOTTOM: u32 = 1 << 16;

/// Widest slice of uniform bits coded in one step.
const DIRECT_CHUNK: u32 = 12;

/// Range encoder writing coded bytes straight to an io sink.
pub struct RangeEncoder<W> {
    low: u32,
    range: u32,
    sink: W,
}

impl<W: Write> RangeEncoder<W> {
    pub fn new(sink: W) -> Self {
        Self {
            low: 0,
            range: u32::MAX,
            sink,
        }
    }

    /// Narrow the range to the [cum_low, cum_high) slice of total.
    pub fn encode(&mut self, cum_low: u32, cum_high: u32, total: u32) -> io::Result<()> {
        let r = self.range / total;
        self.low = self.low.wrapping_add(cum_low.wrapping_mul(r));
        if cum_high < total {
            self.range = (cum_high - cum_low) * r;
        } else {
            self.range -= cum_low * r;
        }
        self.normalize()
    }

    /// Code `bits` uniform bits of value, high chunk first.
    pub fn encode_direct(&mut self, value: u32, mut bits: u32) -> io::Result<()> {
        while bits > 0 {
            let chunk = bits.min(DIRECT_CHUNK);
            bits -= chunk;
            let v = (value >> bits) & ((1 << chunk) - 1);
            self.encode(v, v + 1, 1 << chunk)?;
        }
        Ok(())
    }

    fn normalize(&mut self) -> io::Result<()> {
        while self.low ^ self.low.wrapping_add(self.range) < TOP || self.range < BOTTOM {
            if self.low ^ self.low.wrapping_add(self.range) >= TOP {
                // Top byte not settled but the range is tiny: clamp so the
                // byte can go out without a later carry reaching it.
                self.range = self.low.wrapping_neg() & (BOTTOM - 1);
            }
            self.sink.write_all(&[(self.low >> 24) as u8])?;
            self.low <<= 8;
            self.range <<= 8;
        }
        Ok(())
    }

    /// Flush the final state and hand the sink back.
    pub fn finish(mut self) -> io::Result<W> {
        for _ in 0..4 {
            self.sink.write_all(&[(self.low >> 24) as u8])?;
            self.low <<= 8;
        }
        Ok(self.sink)
    }
}

/// Range decoder pulling coded bytes from an io source.
pub struct RangeDecoder<R> {
    low: u32,
    range: u32,
    code: u32,
    source: R,
}

impl<R: Read> RangeDecoder<R> {
    pub fn new(source: R) -> io::Result<Self> {
        let mut dec = Self {
            low: 0,
            range: u32::MAX,
            code: 0,
            source,
        };
        for _ in 0..4 {
            dec.code = (dec.code << 8) | dec.read_byte()? as u32;
        }
        Ok(dec)
    }

    /// A truncated stream reads as zero bytes; the structural checks in the
    /// block decoder report the corruption.
    fn read_byte(&mut self) -> io::Result<u8> {
        let mut buf = [0_u8; 1];
        match self.source.read(&mut buf) {
            Ok(0) => Ok(0),
            Ok(_) => Ok(buf[0]),
            Err(e) => Err(e),
        }
    }

    /// Where inside total the pending code sits. Callers map this back to a
    /// symbol, then confirm with decode_update.
    pub fn decode_freq(&self, total: u32) -> u32 {
        let r = self.range / total;
        let value = self.code.wrapping_sub(self.low) / r;
        value.min(total - 1)
    }

    /// Narrow the range exactly as the encoder did for this symbol.
    pub fn decode_update(&mut self, cum_low: u32, cum_high: u32, total: u32) -> io::Result<()> {
        let r = self.range / total;
        self.low = self.low.wrapping_add(cum_low.wrapping_mul(r));
        if cum_high < total {
            self.range = (cum_high - cum_low) * r;
        } else {
            self.range -= cum_low * r;
        }
        self.normalize()
    }

    /// Read back `bits` uniform bits, high chunk first.
    pub fn decode_direct(&mut self, mut bits: u32) -> io::Result<u32> {
        let mut value = 0_u32;
        while bits > 0 {
            let chunk = bits.min(DIRECT_CHUNK);
            bits -= chunk;
            let v = self.decode_freq(1 << chunk);
            self.decode_update(v, v + 1, 1 << chunk)?;
            value = (value << chunk) | v;
        }
        Ok(value)
    }

    fn normalize(&mut self) -> io::Result<()> {
        while self.low ^ self.low.wrapping_add(self.range) < TOP || self.range < BOTTOM {
            if self.low ^ self.low.wrapping_add(self.range) >= TOP {
                self.range = self.low.wrapping_neg() & (BOTTOM - 1);
            }
            self.code = (self.code << 8) | self.read_byte()? as u32;
            self.low <<= 8;
            self.range <<= 8;
        }
        Ok(())
    }

    /// Hand the source back once the caller has decoded its last symbol.
    pub fn into_source(self) -> R {
        self.source
    }
}
