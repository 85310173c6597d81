use anyhow::Result;

/// The tracker never needs more than one thread: aggregation is synchronous and the only timer is
/// the one-second status ticker.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
