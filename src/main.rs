//! sst26v - Command-line tool for SST26V serial NOR flash
//!
//! The chip is reached through a backend (`dummy` emulator or Linux
//! spidev + gpiochip) described by a TOML board file and/or a `-p` string.
//! Every command first runs the device init sequence (release HOLD#/WP#,
//! software reset, and unless `--no-unlock` or the board file says
//! otherwise, clear block protection).

mod backend;
mod cli;
mod commands;
mod config;

use clap::Parser;
use cli::{Cli, Commands};
use commands::EraseTarget;
use config::BoardConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG still wins over -v
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli::log_filter(cli.verbose)),
    )
    .init();

    // Commands that don't touch hardware
    match cli.command {
        Commands::ListParts => {
            commands::list_parts();
            return Ok(());
        }
        Commands::ListBackends => {
            commands::list_backends();
            return Ok(());
        }
        _ => {}
    }

    let mut board = match &cli.board {
        Some(path) => BoardConfig::load(path)?,
        None => BoardConfig::default(),
    };
    if cli.no_unlock {
        board.device.unlock_on_init = false;
    }

    let mut flash = backend::open(cli.programmer.as_deref(), &board)?;
    flash.init()?;

    let result = match cli.command {
        Commands::Id => commands::run_id(&mut flash),
        Commands::Status => commands::run_status(&mut flash),
        Commands::Bpr => commands::run_bpr(&mut flash),
        Commands::Read {
            output,
            start,
            length,
        } => commands::run_read(&mut flash, &output, start, length),
        Commands::Write {
            input,
            start,
            verify,
            no_erase,
        } => commands::run_write(&mut flash, &input, start, verify, no_erase),
        Commands::Erase {
            sector,
            block,
            chip,
            start,
            length,
        } => {
            let target = match (sector, block, chip, start, length) {
                (Some(addr), _, _, _, _) => EraseTarget::Sector(addr),
                (_, Some(addr), _, _, _) => EraseTarget::Block(addr),
                (_, _, true, _, _) => EraseTarget::Chip,
                (_, _, _, Some(start), Some(length)) => EraseTarget::Range { start, length },
                _ => return Err("Specify --sector, --block, --chip or --start/--length".into()),
            };
            commands::run_erase(&mut flash, target)
        }
        Commands::Lock => commands::run_lock(&mut flash),
        Commands::Unlock => commands::run_unlock(&mut flash),
        Commands::Reset => commands::run_reset(&mut flash),
        Commands::ListParts | Commands::ListBackends => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
