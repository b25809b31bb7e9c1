use std::path::Path;
use std::time::Duration;

use bargain_core::services::Sweeper;

use crate::commands::common::open_database;
use crate::error::CliError;

pub async fn run_sweep(watch: bool, interval_secs: u64, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let sweeper = Sweeper::new(db).with_interval(Duration::from_secs(interval_secs.max(1)));

    if watch {
        tracing::info!(interval_secs, "sweeping on interval");
        sweeper.run().await;
        return Ok(());
    }

    let expired = sweeper.sweep_once()?;
    println!("{expired}");
    Ok(())
}
