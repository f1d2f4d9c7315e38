pub mod health;
pub mod metrics;
pub mod portfolio;
pub mod records;
pub mod session;
pub mod ws;
