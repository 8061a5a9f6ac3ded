pub mod compress;
pub mod config;
pub mod identity;
pub mod ledger;
pub mod mover;
pub mod paths;
pub mod refs;
pub mod report;
pub mod runlog;
pub mod walk;
