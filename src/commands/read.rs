//! Read command

use crate::backend::Flash;
use std::path::Path;

use super::{format_size, progress_bar, CHUNK_SIZE};

/// Read `length` bytes from `start` (default: to the end of the chip) into a file
pub fn run_read(
    flash: &mut Flash,
    output: &Path,
    start: u32,
    length: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let part = flash.probe()?;
    let length = length.unwrap_or_else(|| part.size.saturating_sub(start));
    if length == 0 || !part.contains(start, length) {
        return Err(format!(
            "Range 0x{:06X}+0x{:X} is outside the {} ({})",
            start,
            length,
            part.name,
            format_size(part.size)
        )
        .into());
    }

    let mut data = vec![0u8; length as usize];
    let pb = progress_bar(length as u64, "Reading")?;
    let mut addr = start;
    for chunk in data.chunks_mut(CHUNK_SIZE as usize) {
        flash.read(addr, chunk)?;
        addr += chunk.len() as u32;
        pb.inc(chunk.len() as u64);
    }
    pb.finish_with_message("Read complete");

    std::fs::write(output, &data)?;
    println!("Wrote {} bytes to {:?}", data.len(), output);
    Ok(())
}
