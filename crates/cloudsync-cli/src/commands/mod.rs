pub mod config;
pub mod kinds;
pub mod reconcile;
pub mod resync;
