//! Input handling shared by the command-line tools

use anyhow::{bail, Result};
use either::{Either, Left, Right};
use std::boxed::Box;
use std::fs::{self, File};
use std::io::{stdin, BufReader, Read};

/// Standard input (`Left`) or a file path (`Right`)
pub type Input = Either<(), String>;

/// Collect inputs: no arguments or '-' mean standard input, which may only
/// be given once; everything else must be an existing file.
pub fn inputs(args: Vec<String>) -> Result<Vec<Input>> {
    let mut inputs = Vec::new();
    if args.is_empty() {
        inputs.push(Left(()));
        return Ok(inputs);
    }
    let mut contains_stdin = false;
    for i in args {
        if i == "-" {
            if contains_stdin {
                bail!("cannot specify '-' for stdin twice");
            }
            contains_stdin = true;
            inputs.push(Left(()));
        } else {
            match fs::metadata(&i) {
                Ok(m) => {
                    if m.is_file() {
                        inputs.push(Right(i));
                    } else {
                        bail!("{} is not a file", &i);
                    }
                }
                Err(e) => bail!("{}: {}", &i, e),
            }
        }
    }
    Ok(inputs)
}

/// Headerless tab-separated reader over an input
pub fn tsv_reader(input: &Input) -> Result<csv::Reader<Box<dyn Read + Send>>> {
    let rdr: Box<dyn Read + Send> = match input {
        Left(()) => Box::new(BufReader::new(stdin())),
        Right(path) => Box::new(BufReader::new(File::open(path)?)),
    };
    Ok(csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .from_reader(rdr))
}

/// Headerless tab-separated writer
pub fn tsv_writer<W: std::io::Write>(wtr: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .from_writer(wtr)
}
