pub mod coordinator;
pub mod positions;
pub mod session;
pub mod store;
pub mod winnings;

pub use coordinator::{RefreshCoordinator, RefreshOutcome, RefreshTrigger, ScanFailure};
pub use positions::{PositionAggregator, PositionScan};
pub use session::Session;
pub use store::PortfolioStore;
pub use winnings::{WinningsAggregator, WinningsSum};
