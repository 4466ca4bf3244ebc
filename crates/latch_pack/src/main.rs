//! Engine data packer
//!
//! Appends each input file to a container as one named record:
//!
//! ```text
//! latch-pack -o resources/EngineData.blob -t texture null.png skybox.png
//! ```
//!
//! Exit codes: `0` success, `-1` usage error, `-2` output could not be opened
//! or written, `-3` an input could not be read.

use clap::Parser;
use latch_asset::container::pack;
use std::path::PathBuf;
use std::process;

const EXIT_USAGE: i32 = -1;

#[derive(Parser, Debug)]
#[command(name = "latch-pack", about = "Append files to an engine data container", version)]
struct Cli {
    /// Container to append to, created if missing.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Record type prefix: `-t texture` names `null.png` TEXTURE_NULL_PNG.
    #[arg(short = 't', long = "type")]
    type_tag: Option<String>,

    /// Files to pack, in order.
    inputs: Vec<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if std::env::args_os().len() < 2 {
        eprintln!("usage: latch-pack [-o output] [-t type] inputs...");
        process::exit(EXIT_USAGE);
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version also land here.
            let code = if err.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = err.print();
            process::exit(code);
        }
    };

    match pack(cli.output.as_deref(), cli.type_tag.as_deref(), &cli.inputs) {
        Ok(report) => {
            for record in &report.records {
                println!("{record}");
            }
        }
        Err(err) => {
            tracing::error!("{err}");
            process::exit(err.exit_code());
        }
    }
}
