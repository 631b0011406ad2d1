//! Rust counterpart of the screen-side sync layer: a watchable snapshot mirror, an HTTP
//! command client and the reconnecting realtime task that ties them together.

pub mod commands;
pub mod mirror;
pub mod sync;

pub use commands::CommandClient;
pub use mirror::{MirrorState, SnapshotMirror};
pub use sync::run_sync;
