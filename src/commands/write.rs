//! Write command
//!
//! Unless told not to erase, the sectors covering the target range are read,
//! patched with the file contents, erased and written back, so bytes outside
//! the range survive.

use crate::backend::Flash;
use sst26v_core::chip::SECTOR_SIZE;
use std::path::Path;

use super::{progress_bar, CHUNK_SIZE};

/// Smallest sector-aligned span covering `[start, start + len)`
fn sector_span(start: u32, len: u32) -> (u32, u32) {
    let span_start = start & !(SECTOR_SIZE - 1);
    let end = start + len;
    let span_end = end.div_ceil(SECTOR_SIZE) * SECTOR_SIZE;
    (span_start, span_end - span_start)
}

fn is_erased(data: &[u8]) -> bool {
    data.iter().all(|&b| b == 0xFF)
}

/// Write a file at `start`
pub fn run_write(
    flash: &mut Flash,
    input: &Path,
    start: u32,
    verify: bool,
    no_erase: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(input)?;
    println!("Read {} bytes from {:?}", data.len(), input);
    if data.is_empty() {
        return Err("Input file is empty".into());
    }

    let part = flash.probe()?;
    let len = u32::try_from(data.len())?;
    if !part.contains(start, len) {
        return Err(format!(
            "{} bytes at 0x{:06X} do not fit in the {}",
            len, start, part.name
        )
        .into());
    }

    let (image_start, image) = if no_erase {
        (start, data)
    } else {
        let (span_start, span_len) = sector_span(start, len);
        let mut image = vec![0u8; span_len as usize];

        let pb = progress_bar(span_len as u64, "Reading")?;
        let mut addr = span_start;
        for chunk in image.chunks_mut(CHUNK_SIZE as usize) {
            flash.read(addr, chunk)?;
            addr += chunk.len() as u32;
            pb.inc(chunk.len() as u64);
        }
        pb.finish_with_message("Read complete");

        let offset = (start - span_start) as usize;
        image[offset..offset + data.len()].copy_from_slice(&data);

        let pb = progress_bar(span_len as u64, "Erasing")?;
        for sector in (span_start..span_start + span_len).step_by(SECTOR_SIZE as usize) {
            flash.erase_range(sector, SECTOR_SIZE)?;
            pb.inc(SECTOR_SIZE as u64);
        }
        pb.finish_with_message("Erase complete");

        (span_start, image)
    };

    let pb = progress_bar(image.len() as u64, "Writing")?;
    let mut addr = image_start;
    let mut written = 0usize;
    for chunk in image.chunks(CHUNK_SIZE as usize) {
        // Freshly erased flash already holds 0xFF
        if no_erase || !is_erased(chunk) {
            flash.write(addr, chunk)?;
            written += chunk.len();
        }
        addr += chunk.len() as u32;
        pb.inc(chunk.len() as u64);
    }
    pb.finish_with_message("Write complete");
    log::debug!("Programmed {} of {} bytes", written, image.len());

    if verify {
        flash.verify(image_start, &image)?;
        println!("Verified");
    }

    println!("Wrote {} bytes at 0x{:06X}", len, start);
    Ok(())
}
