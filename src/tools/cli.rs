use std::process::exit;
use std::{fmt::Display, fmt::Formatter};

/// Compress or decompress
#[derive(Debug, PartialEq, Eq)]
pub enum Mode {
    Zip,
    Unzip,
}
impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// High bit of the record size byte marks incremental (differencing) mode.
pub const INCREMENTAL_FLAG: u8 = 0x80;

#[derive(Debug)]
pub struct SzOpts {
    /// Maximum input block size to process during each loop
    pub block_size: usize,
    /// Order of the context sort. 0 selects the Burrows-Wheeler fallback.
    pub order: usize,
    /// Record width in the low 7 bits, incremental flag in the high bit
    pub recordsize: u8,
    /// Compress/Decompress
    pub op_mode: Mode,
    /// Verbosity of user information
    pub verbosity: u8,
    /// Optional name of the file to read. None means stdin.
    pub infile: Option<String>,
    /// Optional name of the file to write. None means stdout.
    pub outfile: Option<String>,
}

impl SzOpts {
    pub fn new() -> Self {
        Self {
            block_size: 32768,
            order: 6,
            recordsize: 1,
            op_mode: Mode::Zip,
            verbosity: 0,
            infile: None,
            outfile: None,
        }
    }

    /// Record width without the incremental flag.
    pub fn record_width(&self) -> usize {
        (self.recordsize & 0x7f) as usize
    }
}

impl Default for SzOpts {
    fn default() -> Self {
        Self::new()
    }
}

pub const VMAJOR: u8 = 1;
pub const VMINOR: u8 = 12;

/// Read the digits at the front of s, erroring out of range values.
fn readnum(s: &mut &str, min: usize, max: usize) -> usize {
    let digits = s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let j = match s[..digits].parse::<usize>() {
        Ok(j) => j,
        Err(_) => usage(),
    };
    *s = &s[digits..];
    if j < min || j > max {
        usage();
    }
    j
}

/// Parse the command line into an SzOpts, setting the log level to match.
pub fn szopts_init() -> SzOpts {
    let mut cli = SzOpts::new();

    for arg in std::env::args().skip(1) {
        if let Some(flags) = arg.strip_prefix('-') {
            if flags.is_empty() {
                usage();
            }
            let mut s = flags;
            while let Some(ch) = s.chars().next() {
                s = &s[ch.len_utf8()..];
                match ch {
                    'o' => {
                        cli.order = readnum(&mut s, 0, 255);
                        if cli.order == 1 || cli.order == 2 {
                            usage();
                        }
                    }
                    'r' => {
                        cli.recordsize =
                            (cli.recordsize & INCREMENTAL_FLAG) | readnum(&mut s, 1, 127) as u8;
                    }
                    'b' => {
                        // Block size in 100kB units, aligned up to a 32kB
                        // boundary and never below 32kB.
                        let requested = 100_000 * readnum(&mut s, 1, 41);
                        cli.block_size = (requested.max(32768) + 0x7fff) & !0x7fff;
                    }
                    'i' => cli.recordsize |= INCREMENTAL_FLAG,
                    'v' => cli.verbosity = readnum(&mut s, 0, 255) as u8,
                    'd' => cli.op_mode = Mode::Unzip,
                    _ => usage(),
                }
            }
        } else if cli.infile.is_none() {
            cli.infile = Some(arg);
        } else if cli.outfile.is_none() {
            cli.outfile = Some(arg);
        } else {
            usage();
        }
    }

    // Set the log level
    log::set_max_level(match cli.verbosity {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    });
    cli
}

/// Prints usage information and exits.
fn usage() -> ! {
    eprintln!("szip {}.{}, a block-sorting file compressor.", VMAJOR, VMINOR);
    eprintln!(
        "
   usage: szip [options] [inputfile [outputfile]]

   option           meaning              default   range
   -d               decompress
   -b<blocksize>    blocksize in 100kB   -b1       1-41
   -o<order>        order of context     -o6       0, 3-255
   -r<recordsize>   recordsize           -r1       1-127
   -i               incremental
   -v<level>        verbosity level      -v0       0-255

   options may be combined into one, like -r3i

   If no file names are given, szip compresses or decompresses
   from standard input to standard output.
   "
    );
    exit(1);
}

#[cfg(test)]
mod test {
    use super::readnum;

    #[test]
    fn readnum_stops_at_letters() {
        let mut s = "3i";
        assert_eq!(readnum(&mut s, 1, 127), 3);
        assert_eq!(s, "i");
    }

    #[test]
    fn readnum_takes_all_digits() {
        let mut s = "41";
        assert_eq!(readnum(&mut s, 1, 41), 41);
        assert_eq!(s, "");
    }
}
