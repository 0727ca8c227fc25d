//Enable more cargo lint tests
#![warn(rust_2018_idioms)]

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};

use log::{info, LevelFilter};
use simplelog::{Config, TermLogger, TerminalMode};

use szip::blocksort::SortContext;
use szip::container::compress::compress;
use szip::container::decompress::decompress;
use szip::tools::cli::{szopts_init, Mode};

fn main() -> Result<(), std::io::Error> {
    // Route all user information through the terminal logger; the CLI
    // parser lowers the level to match -v.
    TermLogger::init(
        LevelFilter::Trace,
        Config::default(),
        TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )
    .unwrap();

    let opts = szopts_init();

    let mut reader: Box<dyn Read> = match &opts.infile {
        Some(name) => {
            info!("szip on {}", name);
            Box::new(BufReader::new(File::open(name)?))
        }
        None => {
            info!("szip on stdin");
            Box::new(io::stdin().lock())
        }
    };
    let mut writer: Box<dyn Write> = match &opts.outfile {
        Some(name) => Box::new(BufWriter::new(File::create(name)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut ctx = SortContext::new();
    match opts.op_mode {
        Mode::Zip => compress(&mut reader, &mut writer, &opts, &mut ctx)?,
        Mode::Unzip => decompress(&mut reader, &mut writer, &mut ctx)?,
    }
    writer.flush()?;

    info!("Done.");
    Ok(())
}
