//! Block protection and reset commands

use crate::backend::Flash;

/// Set every block-protection bit
pub fn run_lock(flash: &mut Flash) -> Result<(), Box<dyn std::error::Error>> {
    flash.lock_write()?;
    let bpr = flash.read_block_protection()?;
    if !bpr.is_locked() {
        log::warn!("BPR reads back as {}", bpr);
        return Err("Lock did not take effect (WP# asserted with WPEN set?)".into());
    }
    println!("All blocks locked");
    Ok(())
}

/// Clear every block-protection bit
pub fn run_unlock(flash: &mut Flash) -> Result<(), Box<dyn std::error::Error>> {
    flash.unlock_write()?;
    let bpr = flash.read_block_protection()?;
    if !bpr.is_unlocked() {
        log::warn!("BPR reads back as {}", bpr);
        return Err("Unlock did not take effect (WP# asserted with WPEN set?)".into());
    }
    println!("All blocks unlocked");
    Ok(())
}

/// Issue a software reset
pub fn run_reset(flash: &mut Flash) -> Result<(), Box<dyn std::error::Error>> {
    flash.reset()?;
    println!("Reset issued");
    Ok(())
}
