pub mod record_watcher;
pub mod tx_watcher;
