pub mod history_repo;
pub mod item_repo;
