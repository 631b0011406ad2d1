pub mod content;
pub mod models;
pub mod storage;
pub mod tournament_store;
