//! `checkcfg mydetector.json`
//!
//! Parse and validate `mydetector.json`. No output and an exit code of 0
//! indicates success.

use anyhow::{bail, Result};
use std::env;
use tcaltools::cfg;

fn main() -> Result<()> {
    let args = env::args().collect::<Vec<_>>();
    if args.len() != 2 {
        bail!("usage: checkcfg CONFIG");
    }
    let _cfg = cfg::load(&args[1])?;

    Ok(())
}
