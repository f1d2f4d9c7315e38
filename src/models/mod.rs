pub mod position;
pub mod record;
pub mod snapshot;

pub use position::{Position, PositionOutcome, Stakes};
pub use record::{BetOption, BetRecord, RawBetRecord, RecordDecodeError, WinningOption};
pub use snapshot::{PortfolioSnapshot, ScanStage, ScanWarning, SnapshotStatus};
