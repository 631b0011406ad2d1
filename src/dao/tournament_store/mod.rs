pub mod file;
pub mod memory;

use futures::future::BoxFuture;

use crate::dao::{models::TournamentDocument, storage::StorageResult};

pub use self::{file::FileTournamentStore, memory::MemoryTournamentStore};

/// Abstraction over where the tournament snapshot is kept between restarts.
pub trait TournamentStore: Send + Sync {
    fn save(&self, document: TournamentDocument) -> BoxFuture<'static, StorageResult<()>>;
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<TournamentDocument>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
