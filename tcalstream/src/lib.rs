pub mod data;
pub mod processor;
pub mod reader;

use argh::FromArgs;
#[derive(Debug, FromArgs, Clone)]
/// Calibrate a stream of raw digitizer hits, optionally refining the
/// calibration curves while the data comes in
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
    /// calibration curves (.tcal.zst), rewritten on every update
    #[argh(option, short = 'c', default = "String::from(\"curves.tcal.zst\")")]
    pub curves: String,
    /// accumulate fine-time statistics and update the curves periodically
    #[argh(switch, short = 'f')]
    pub fill: bool,
    /// events buffered between the reader, processor and writer
    #[argh(option, default = "1024")]
    pub buffer: usize,
    /// detector configuration (JSON)
    #[argh(positional)]
    pub config: String,
    /// with no input or when input is '-', read from standard input
    #[argh(positional)]
    pub input: Vec<String>,
}
