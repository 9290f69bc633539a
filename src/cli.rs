//! CLI argument parsing

use crate::backend;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else if let Some(kib) = s.strip_suffix('K').or_else(|| s.strip_suffix('k')) {
        kib.parse::<u32>()
            .ok()
            .and_then(|n| n.checked_mul(1024))
            .ok_or_else(|| format!("Invalid size: {}", s))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Default log filter for a `-v` count
pub fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Generate dynamic help text for the backend argument
fn backend_help() -> String {
    format!(
        "Backend to use, overrides the board file [available: {}]",
        backend::backend_names()
    )
}

#[derive(Parser)]
#[command(name = "sst26v")]
#[command(author, version, about = "SST26V serial flash tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Board description (TOML)
    #[arg(short, long, global = true)]
    pub board: Option<PathBuf>,

    #[arg(short, long, global = true, help = backend_help())]
    pub programmer: Option<String>,

    /// Leave block protection untouched during init
    #[arg(long, global = true)]
    pub no_unlock: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read and identify the JEDEC ID
    Id,

    /// Show the STATUS and CONFIGURATION registers
    Status,

    /// Show the block-protection register
    Bpr,

    /// Read flash contents to file
    Read {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start address (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Number of bytes to read (default: to the end of the chip)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,
    },

    /// Write file to flash
    Write {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Start address (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Verify after writing
        #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
        verify: bool,

        /// Don't erase before writing
        #[arg(long)]
        no_erase: bool,
    },

    /// Erase flash
    Erase {
        /// Erase the 4 KiB sector at this address
        #[arg(long, value_parser = parse_hex_u32, conflicts_with_all = ["block", "chip", "start"])]
        sector: Option<u32>,

        /// Erase the block containing this address
        #[arg(long, value_parser = parse_hex_u32, conflicts_with_all = ["chip", "start"])]
        block: Option<u32>,

        /// Erase the whole chip
        #[arg(long, conflicts_with = "start")]
        chip: bool,

        /// Start address of a range erase (4 KiB aligned)
        #[arg(long, value_parser = parse_hex_u32, requires = "length")]
        start: Option<u32>,

        /// Length of a range erase (multiple of 4 KiB)
        #[arg(long, value_parser = parse_hex_u32, requires = "start")]
        length: Option<u32>,
    },

    /// Set every block-protection bit
    Lock,

    /// Clear every block-protection bit
    Unlock,

    /// Issue a software reset
    Reset,

    /// List known SST26V parts
    ListParts,

    /// List available backends
    ListBackends,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x1000"), Ok(0x1000));
        assert_eq!(parse_hex_u32("0XFF"), Ok(0xFF));
        assert_eq!(parse_hex_u32("4096"), Ok(4096));
        assert_eq!(parse_hex_u32("64K"), Ok(64 * 1024));
        assert!(parse_hex_u32("0xZZ").is_err());
        assert!(parse_hex_u32("ten").is_err());
        assert!(parse_hex_u32("8388608K").is_err());
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_erase_args() {
        let cli = Cli::try_parse_from(["sst26v", "erase", "--start", "0x1000", "--length", "8K"])
            .unwrap();
        match cli.command {
            Commands::Erase { start, length, .. } => {
                assert_eq!(start, Some(0x1000));
                assert_eq!(length, Some(0x2000));
            }
            _ => panic!("expected erase"),
        }

        assert!(Cli::try_parse_from(["sst26v", "erase", "--chip", "--start", "0"]).is_err());
        assert!(Cli::try_parse_from(["sst26v", "erase", "--start", "0"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["sst26v", "id", "-p", "dummy", "--no-unlock", "-vv"])
            .unwrap();
        assert_eq!(cli.programmer.as_deref(), Some("dummy"));
        assert!(cli.no_unlock);
        assert_eq!(cli.verbose, 2);
        assert_eq!(log_filter(cli.verbose), "trace");
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(0), "info");
        assert_eq!(log_filter(1), "debug");
        assert_eq!(log_filter(5), "trace");
    }
}
