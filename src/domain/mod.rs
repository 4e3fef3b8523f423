pub mod diff;
pub mod error;
pub mod event;
pub mod filter;
pub mod item;
pub mod permission;
pub mod snapshot;
pub mod stats;
