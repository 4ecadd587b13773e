use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use thumb_disasm::{classify_image, list_image, load_image, ImageFormat};

#[derive(Parser, Debug)]
#[command(author, version, about = "Thumb program listing CLI", long_about=None)]
struct Cli {
    /// Input encoding
    #[arg(long, value_enum, default_value_t = ImageFormat::Bin)]
    format: ImageFormat,
    /// Skip N words at the start of the program
    #[arg(long, default_value_t = 0usize)]
    skip: usize,
    /// Limit words loaded (default: to the end after --skip)
    #[arg(long)]
    len: Option<usize>,
    /// Program path
    #[arg(value_name = "FILE")]
    input: String,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Disassemble every word
    List {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<String>,
    },
    /// Show the instruction format of every word, with a summary
    Classify {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let img = load_image(Path::new(&cli.input), cli.format, cli.skip, cli.len)?;

    match cli.cmd {
        Command::List { json, out } => {
            let lines = list_image(&img);
            let mut buf = String::new();
            if json {
                buf = serde_json::to_string_pretty(&lines)?;
                buf.push('\n');
            } else {
                for l in &lines {
                    let _ = write!(buf, "{:04}: {:04X}  {}", l.addr, l.word, l.text);
                    if let Some(t) = l.target {
                        let _ = write!(buf, "    ; -> {t}");
                    }
                    buf.push('\n');
                }
            }
            if let Some(path) = out { std::fs::write(path, buf)?; } else { print!("{buf}"); }
        }
        Command::Classify { json } => {
            let lines = classify_image(&img);
            if json {
                println!("{}", serde_json::to_string_pretty(&lines)?);
                return Ok(());
            }
            let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
            for l in &lines {
                match l.kind {
                    Some(kind) => {
                        let mark = if l.control_flow { '*' } else { ' ' };
                        println!("{:04}: {:04X} {mark}{:>2} {kind:?}", l.addr, l.word, kind.id())
                    }
                    None => println!("{:04}: {:04X}  -- unclassified", l.addr, l.word),
                }
                *counts.entry(l.format.unwrap_or(0)).or_default() += 1;
            }
            println!("Summary ({}, {} words):", img.name, lines.len());
            for (format, n) in counts {
                println!("  format {format:>2} : {n}");
            }
        }
    }

    Ok(())
}
