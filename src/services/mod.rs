pub mod export;
pub mod history;
pub mod inventory;
pub mod recorder;
pub mod revert;
