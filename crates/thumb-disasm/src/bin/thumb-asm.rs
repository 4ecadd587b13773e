use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::fs;
use std::path::PathBuf;

use thumb_rs::assemble;
use thumb_rs::program::{to_hex_listing, to_le_bytes};

#[derive(Parser, Debug)]
#[command(author, version, about = "Table-driven Thumb assembler")]
struct Opts {
    /// Input assembly file ('@' starts a comment, 'name:' defines a label)
    #[arg(short, long)]
    input: PathBuf,
    /// Output file
    #[arg(short, long)]
    output: PathBuf,
    #[arg(long, value_enum, default_value_t = OutFormat::Hex)]
    format: OutFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutFormat { Hex, Bin }

fn main() -> Result<()> {
    let opts = Opts::parse();
    let text = fs::read_to_string(&opts.input)?;
    let words = match assemble(&text) {
        Ok(words) => words,
        Err(report) => {
            eprintln!("{report}");
            bail!("{}: {} error(s)", opts.input.display(), report.error_count());
        }
    };
    match opts.format {
        OutFormat::Hex => fs::write(&opts.output, to_hex_listing(&words))?,
        OutFormat::Bin => fs::write(&opts.output, to_le_bytes(&words))?,
    }
    Ok(())
}
