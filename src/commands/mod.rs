//! CLI command implementations
//!
//! Every command takes an initialised [`Flash`](crate::backend::Flash)
//! handle. Long-running operations are chunked so the progress bar can
//! follow them.

mod erase;
mod info;
mod protect;
mod read;
mod write;

pub use erase::{run_erase, EraseTarget};
pub use info::{list_backends, list_parts, run_bpr, run_id, run_status};
pub use protect::{run_lock, run_reset, run_unlock};
pub use read::run_read;
pub use write::run_write;

use indicatif::{ProgressBar, ProgressStyle};

/// Chunk size for reads and sector-sized progress steps
const CHUNK_SIZE: u32 = 4096;

/// Create a progress bar with a phase message
fn progress_bar(total: u64, phase: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Human-readable size
fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
