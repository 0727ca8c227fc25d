use std::io::{self, Read, Write};

use crate::coder::rangecoder::{RangeDecoder, RangeEncoder};
use crate::ALPHABETSIZE;

/*
The adaptive model behind the (symbol, run length) pairs. Two frequency
tables drive the range coder: one over the symbol alphabet and one over
run-length bit categories. A run of n identical bytes is coded as its
category (the index of n's top bit) through the category table, followed by
the remaining low bits as uniform direct bits, so short runs cost almost
nothing extra and block-length runs stay bounded.

Both tables start with a small adaptation increment; fix_after_first raises
it to the steady-state value once the first pair is through. The encoder and
decoder drive identical table updates, which is all the coder needs.
*/

/// Bit categories cover run lengths up to 2^24-1, beyond the largest block.
const RUN_CATEGORIES: usize = 24;

/// Keep totals well under the coder's BOTTOM bound.
const MAX_TOTAL: u32 = 1 << 15;

const FRESH_INCREMENT: u32 = 4;
const STEADY_INCREMENT: u32 = 24;

/// Adaptive frequency table over n symbols.
struct FreqTable {
    freq: Vec<u32>,
    cumul: Vec<u32>,
    total: u32,
    increment: u32,
}

impl FreqTable {
    fn new(n: usize) -> Self {
        let mut table = Self {
            freq: vec![1; n],
            cumul: vec![0; n + 1],
            total: n as u32,
            increment: FRESH_INCREMENT,
        };
        table.rebuild_cumulative();
        table
    }

    fn rebuild_cumulative(&mut self) {
        self.cumul[0] = 0;
        for i in 0..self.freq.len() {
            self.cumul[i + 1] = self.cumul[i] + self.freq[i];
        }
        self.total = self.cumul[self.freq.len()];
    }

    fn update(&mut self, symbol: usize) {
        self.freq[symbol] += self.increment;
        if self.total + self.increment >= MAX_TOTAL {
            for f in self.freq.iter_mut() {
                *f = (*f + 1) / 2;
            }
        }
        self.rebuild_cumulative();
    }

    fn range_of(&self, symbol: usize) -> (u32, u32, u32) {
        (self.cumul[symbol], self.cumul[symbol + 1], self.total)
    }

    /// Symbol whose cumulative slice contains value.
    fn find(&self, value: u32) -> usize {
        let mut lo = 0_usize;
        let mut hi = self.freq.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.cumul[mid + 1] <= value {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }
}

/// Category of a run length: index of its highest set bit.
fn run_category(run: u32) -> u32 {
    debug_assert!(run >= 1);
    31 - run.leading_zeros()
}

/// Statistical encoder for one szip block.
pub struct Encoder<W: Write> {
    rc: RangeEncoder<W>,
    symbols: FreqTable,
    runs: FreqTable,
}

impl<W: Write> Encoder<W> {
    /// Prepare a fresh model. The recordsize byte travels uncoded ahead of
    /// the range-coded payload so the decoder can undo the reorder and
    /// differencing stages.
    pub fn new(mut sink: W, recordsize: u8) -> io::Result<Self> {
        sink.write_all(&[recordsize])?;
        Ok(Self {
            rc: RangeEncoder::new(sink),
            symbols: FreqTable::new(ALPHABETSIZE),
            runs: FreqTable::new(RUN_CATEGORIES),
        })
    }

    /// Code one (symbol, run length) pair and update the model.
    pub fn encode(&mut self, symbol: u8, run: u32) -> io::Result<()> {
        let s = symbol as usize;
        let (lo, hi, total) = self.symbols.range_of(s);
        self.rc.encode(lo, hi, total)?;
        self.symbols.update(s);

        let cat = run_category(run);
        let (lo, hi, total) = self.runs.range_of(cat as usize);
        self.rc.encode(lo, hi, total)?;
        self.runs.update(cat as usize);
        self.rc.encode_direct(run - (1 << cat), cat)
    }

    /// One-shot transition from the fresh-block to the steady-state model,
    /// called immediately after the first pair.
    pub fn fix_after_first(&mut self) {
        self.symbols.increment = STEADY_INCREMENT;
        self.runs.increment = STEADY_INCREMENT;
    }

    /// Flush the coder and hand the sink back.
    pub fn finish(self) -> io::Result<W> {
        self.rc.finish()
    }
}

/// Statistical decoder for one szip block.
pub struct Decoder<R: Read> {
    rc: RangeDecoder<R>,
    symbols: FreqTable,
    runs: FreqTable,
    /// Record width and incremental flag recovered from the block.
    pub recordsize: u8,
}

impl<R: Read> Decoder<R> {
    pub fn new(mut source: R) -> io::Result<Self> {
        let mut buf = [0_u8; 1];
        source.read_exact(&mut buf)?;
        Ok(Self {
            rc: RangeDecoder::new(source)?,
            symbols: FreqTable::new(ALPHABETSIZE),
            runs: FreqTable::new(RUN_CATEGORIES),
            recordsize: buf[0],
        })
    }

    /// Decode one (symbol, run length) pair, updating the model the same
    /// way the encoder did.
    pub fn decode(&mut self) -> io::Result<(u8, u32)> {
        let v = self.rc.decode_freq(self.symbols.total);
        let s = self.symbols.find(v);
        let (lo, hi, total) = self.symbols.range_of(s);
        self.rc.decode_update(lo, hi, total)?;
        self.symbols.update(s);

        let v = self.rc.decode_freq(self.runs.total);
        let cat = self.runs.find(v);
        let (lo, hi, total) = self.runs.range_of(cat);
        self.rc.decode_update(lo, hi, total)?;
        self.runs.update(cat);
        let low = self.rc.decode_direct(cat as u32)?;
        Ok((s as u8, (1 << cat as u32) | low))
    }

    pub fn fix_after_first(&mut self) {
        self.symbols.increment = STEADY_INCREMENT;
        self.runs.increment = STEADY_INCREMENT;
    }

    /// Hand the source back; the coded payload is fully consumed.
    pub fn finish(self) -> R {
        self.rc.into_source()
    }
}

#[cfg(test)]
mod test {
    use super::{run_category, Decoder, Encoder};

    #[test]
    fn run_categories() {
        assert_eq!(run_category(1), 0);
        assert_eq!(run_category(2), 1);
        assert_eq!(run_category(3), 1);
        assert_eq!(run_category(4), 2);
        assert_eq!(run_category(255), 7);
        assert_eq!(run_category(4_128_768), 21);
    }

    #[test]
    fn pairs_round_trip() {
        let pairs: Vec<(u8, u32)> = vec![
            (9, 1),
            (33, 700),
            (0, 1),
            ((crate::ALPHABETSIZE - 1) as u8, 3),
            (7, 65536),
            (7, 1),
            (42, 12),
        ];
        let mut enc = Encoder::new(Vec::new(), 0x83).unwrap();
        let mut iter = pairs.iter();
        let &(s, r) = iter.next().unwrap();
        enc.encode(s, r).unwrap();
        enc.fix_after_first();
        for &(s, r) in iter {
            enc.encode(s, r).unwrap();
        }
        let coded = enc.finish().unwrap();

        let mut dec = Decoder::new(coded.as_slice()).unwrap();
        assert_eq!(dec.recordsize, 0x83);
        let mut iter = pairs.iter();
        assert_eq!(dec.decode().unwrap(), *iter.next().unwrap());
        dec.fix_after_first();
        for want in iter {
            assert_eq!(dec.decode().unwrap(), *want);
        }
    }

    #[test]
    fn deterministic() {
        let encode_all = || {
            let mut enc = Encoder::new(Vec::new(), 1).unwrap();
            enc.encode(33, 5).unwrap();
            enc.fix_after_first();
            for i in 0..60_u8 {
                enc.encode(i, 1 + (i as u32 % 9)).unwrap();
            }
            enc.finish().unwrap()
        };
        assert_eq!(encode_all(), encode_all());
    }
}
