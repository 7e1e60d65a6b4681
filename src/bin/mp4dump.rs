//! Dump the box tree of an MP4 file as text or JSON.

use anyhow::Context;
use clap::{ArgAction, Parser};
use mp4codec::{DecodeOptions, InfoLevels, Mp4File, default_registry, summarize};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Decode an MP4/ISOBMFF file and dump its box tree")]
struct Args {
    /// MP4/ISOBMFF file path
    path: PathBuf,

    /// Per-box verbosity for the text dump, e.g. "all:1,trun:2"
    #[arg(long, default_value = "all:0")]
    levels: InfoLevels,

    /// Emit a JSON outline of the box tree instead of the text dump
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Keep the boxes decoded before the first failure instead of aborting
    #[arg(long, action = ArgAction::SetTrue)]
    best_effort: bool,

    /// Limit recursion depth of the JSON outline
    #[arg(long)]
    max_depth: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let f = File::open(&args.path).with_context(|| format!("opening {}", args.path.display()))?;
    let options = if args.best_effort {
        DecodeOptions::best_effort()
    } else {
        DecodeOptions::strict()
    };
    let reg = default_registry();
    let file = Mp4File::read_from(&mut BufReader::new(f), &reg, options)
        .with_context(|| format!("decoding {}", args.path.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        let outline = summarize(&file.boxes, 0, args.max_depth);
        serde_json::to_writer_pretty(&mut out, &outline)?;
        writeln!(out)?;
    } else {
        file.info(&mut out, &args.levels)?;
    }

    if let Some(e) = file.error() {
        eprintln!("warning: decoding stopped early: {e}");
    }
    Ok(())
}
