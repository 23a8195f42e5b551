//! `curvetsv [INPUT]`
//!
//! Decode a calibration curve set in .tcal.zst format and print the
//! lookup tables as tab-separated (module, fine, ns) to standard output,
//! e.g. for plotting the nonlinearity of each module:
//!
//!     curvetsv neuland.tcal.zst > neuland.tsv

use argh::FromArgs;
use anyhow::Result;
use either::{Left, Right};
use std::fs::File;
use std::io::{stdin, stdout, BufReader, Write};

use tcaltools::{de, io, ser};

const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");

#[derive(Debug, FromArgs, Clone)]
/// Decode calibration curves in .tcal.zst format and print them as
/// tab-separated values.
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
    /// with no input or when input is '-', read from standard input
    #[argh(positional)]
    pub input: Vec<String>,
}

fn main() -> Result<()> {
    let args: CliArgs = argh::from_env();
    if args.version {
        let stdout = stdout();
        let mut stdout = stdout.lock();
        writeln!(
            stdout,
            concat!(
                env!("CARGO_BIN_NAME"),
                " ",
                "{}",
            ),
            GIT_VERSION,
        )?;
        return Ok(())
    }

    let inputs = io::inputs(args.input)?;

    let stdout = stdout();
    let stdout = stdout.lock();
    let mut wtr = io::tsv_writer(stdout);

    for i in inputs {
        let set = match i {
            Left(()) => {
                let stdin = stdin();
                let stdin = stdin.lock();
                de::curves(BufReader::new(stdin))?
            },
            Right(path) => {
                let f = File::open(path)?;
                de::curves(BufReader::new(f))?
            },
        };
        ser::curves_tsv(&mut wtr, &set)?;
    }
    wtr.flush()?;
    Ok(())
}
