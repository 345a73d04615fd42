//! blockpress CLI - compress images into GPU block-compressed textures.
//!
//! ```text
//! blockpress compress grass.png grass.ktx --format bptc --threads 8
//! blockpress decompress grass.ktx preview.png
//! blockpress info grass.ktx
//! blockpress config list
//! ```

mod commands;
mod error;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use commands::common::{FormatArg, QualityArg};
use commands::config::ConfigCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "blockpress", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compress a PNG or TGA image into a KTX texture
    Compress {
        /// Source image (.png or .tga)
        input: PathBuf,

        /// Destination texture (.ktx)
        output: PathBuf,

        /// Compression format (defaults to the config file setting)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,

        /// Worker threads (defaults to the config file, then CPU count)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Blocks claimed per pull
        #[arg(long)]
        job_size: Option<usize>,

        /// BPTC encoder speed/quality preset
        #[arg(long, value_enum)]
        bc7_quality: Option<QualityArg>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a KTX texture into a PNG image
    Decompress {
        /// Source texture (.ktx)
        input: PathBuf,

        /// Destination image (.png)
        output: PathBuf,
    },

    /// Show information about a KTX texture
    Info {
        /// Texture to inspect (.ktx)
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// View or change configuration settings
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Compress {
            input,
            output,
            format,
            threads,
            job_size,
            bc7_quality,
            json,
        } => commands::compress::run(commands::compress::CompressArgs {
            input,
            output,
            format,
            threads,
            job_size,
            bc7_quality,
            json,
        }),
        Commands::Decompress { input, output } => commands::decompress::run(&input, &output),
        Commands::Info { input, json } => commands::info::run(&input, json),
        Commands::Config { action } => commands::config::run(action),
    }
}

fn main() {
    let cli = Cli::parse();
    blockpress::logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compress_flags() {
        let cli = Cli::try_parse_from([
            "blockpress",
            "-vv",
            "compress",
            "in.png",
            "out.ktx",
            "--format",
            "dxt5",
            "--threads",
            "3",
            "--job-size",
            "16",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Compress {
                format,
                threads,
                job_size,
                json,
                ..
            } => {
                assert_eq!(format, Some(FormatArg::Dxt5));
                assert_eq!(threads, Some(3));
                assert_eq!(job_size, Some(16));
                assert!(!json);
            }
            other => panic!("Expected compress, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        let result = Cli::try_parse_from(["blockpress", "compress", "a.png", "b.ktx", "-f", "etc2"]);
        assert!(result.is_err());
    }
}
