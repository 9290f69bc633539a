//! Erase command

use crate::backend::Flash;
use indicatif::{ProgressBar, ProgressStyle};
use sst26v_core::chip::SECTOR_SIZE;
use std::time::Duration;

use super::{format_size, progress_bar};

/// What to erase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseTarget {
    /// The 4 KiB sector containing an address
    Sector(u32),
    /// The block containing an address
    Block(u32),
    /// The whole array
    Chip,
    /// A 4 KiB aligned range
    Range { start: u32, length: u32 },
}

/// Run the erase command
pub fn run_erase(flash: &mut Flash, target: EraseTarget) -> Result<(), Box<dyn std::error::Error>> {
    let part = flash.probe()?;

    match target {
        EraseTarget::Sector(addr) | EraseTarget::Block(addr) if addr >= part.size => {
            Err(format!("Address 0x{:06X} is beyond the {}", addr, part.name).into())
        }
        EraseTarget::Sector(addr) => {
            flash.write_enable()?;
            flash.erase_sector(addr)?;
            flash.wait_ready()?;
            println!("Erased sector at 0x{:06X}", addr & !(SECTOR_SIZE - 1));
            Ok(())
        }
        EraseTarget::Block(addr) => {
            let size = part.block_size_at(addr);
            flash.write_enable()?;
            flash.erase_block(addr)?;
            flash.wait_ready()?;
            println!(
                "Erased {} block at 0x{:06X}",
                format_size(size),
                addr & !(size - 1)
            );
            Ok(())
        }
        EraseTarget::Chip => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
            pb.set_message(format!("Erasing {}...", part.name));
            pb.enable_steady_tick(Duration::from_millis(100));
            let result = flash.erase_chip();
            pb.finish_and_clear();
            result?;
            println!("Chip erased");
            Ok(())
        }
        EraseTarget::Range { start, length } => {
            if start % SECTOR_SIZE != 0 || length % SECTOR_SIZE != 0 || length == 0 {
                return Err(format!(
                    "Range erase needs a 4 KiB aligned start and a non-zero multiple of 4 KiB (got 0x{:06X}+0x{:X})",
                    start, length
                )
                .into());
            }
            if !part.contains(start, length) {
                return Err(format!("Range is outside the {}", part.name).into());
            }

            let pb = progress_bar(length as u64, "Erasing")?;
            for sector in (start..start + length).step_by(SECTOR_SIZE as usize) {
                flash.erase_range(sector, SECTOR_SIZE)?;
                pb.inc(SECTOR_SIZE as u64);
            }
            pb.finish_with_message("Erase complete");
            println!("Erased {} at 0x{:06X}", format_size(length), start);
            Ok(())
        }
    }
}
