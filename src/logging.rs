use anyhow::Result;
use tracing_subscriber::fmt;

/// Installs the fmt subscriber when `verbose` is set. A subscriber that is
/// already installed wins.
pub fn init(verbose: bool) -> Result<()> {
    if !verbose {
        return Ok(());
    }
    let _ = fmt()
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
    Ok(())
}
