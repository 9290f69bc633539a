//! Identification and register dump commands

use crate::backend::{self, Flash};
use sst26v_core::chip::{find_part, PARTS};
use sst26v_core::{ConfigReg, Status};

use super::format_size;

/// Read the JEDEC ID and match it against the known parts
pub fn run_id(flash: &mut Flash) -> Result<(), Box<dyn std::error::Error>> {
    let id = flash.read_jedec_id()?;
    println!("JEDEC ID: {}", id);
    match find_part(id) {
        Some(part) => {
            println!("Part:     {}", part.name);
            println!("Size:     {} ({} bytes)", format_size(part.size), part.size);
            Ok(())
        }
        None if id.is_sst26() => {
            Err(format!("Unknown SST26 density (device 0x{:02X})", id.device).into())
        }
        None => Err("Not an SST26V chip".into()),
    }
}

fn describe_status(status: Status) -> Vec<&'static str> {
    let mut flags = Vec::new();
    if status.is_busy() {
        flags.push("BUSY");
    }
    if status.write_enabled() {
        flags.push("WEL");
    }
    if status.contains(Status::WSE) {
        flags.push("WSE");
    }
    if status.contains(Status::WSP) {
        flags.push("WSP");
    }
    if status.contains(Status::WPLD) {
        flags.push("WPLD");
    }
    if status.contains(Status::SEC) {
        flags.push("SEC");
    }
    flags
}

fn describe_config(config: ConfigReg) -> Vec<&'static str> {
    config.iter_names().map(|(name, _)| name).collect()
}

/// Print the STATUS and CONFIGURATION registers
pub fn run_status(flash: &mut Flash) -> Result<(), Box<dyn std::error::Error>> {
    let status = flash.read_status()?;
    let config = flash.read_config()?;
    println!(
        "STATUS: 0x{:02X} [{}]",
        status.bits(),
        describe_status(status).join(" ")
    );
    println!(
        "CONFIG: 0x{:02X} [{}]",
        config.bits(),
        describe_config(config).join(" ")
    );
    Ok(())
}

/// Print the block-protection register
pub fn run_bpr(flash: &mut Flash) -> Result<(), Box<dyn std::error::Error>> {
    let bpr = flash.read_block_protection()?;
    println!("BPR: {}", bpr);
    if bpr.is_unlocked() {
        println!("All blocks unlocked");
    } else if bpr.is_locked() {
        println!("All blocks locked");
    } else {
        println!("{} protection bits set", bpr.count_locked());
    }
    Ok(())
}

/// List known SST26V parts
pub fn list_parts() {
    println!("{:<14} {:>10} {:>10}", "Name", "Size", "JEDEC ID");
    println!("{}", "-".repeat(36));
    for part in PARTS {
        println!(
            "{:<14} {:>10} {:>10}",
            part.name,
            format_size(part.size),
            part.id.to_string()
        );
    }
}

/// List backends compiled into this binary
pub fn list_backends() {
    println!("Available backends:");
    println!();
    for info in backend::available_backends() {
        println!("  {:<6} - {}", info.name, info.description);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_registers() {
        assert_eq!(
            describe_status(Status::from_bits_retain(0x83)),
            vec!["BUSY", "WEL"]
        );
        assert!(describe_status(Status::empty()).is_empty());
        assert_eq!(
            describe_config(ConfigReg::WPEN | ConfigReg::BPNV),
            vec!["BPNV", "WPEN"]
        );
    }
}
