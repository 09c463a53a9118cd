//! MergeMark core library.
//!
//! A debounced, incremental tracker for version-control merge-conflict
//! markers in live text buffers: parsing marker regions, maintaining
//! per-buffer highlight caches consistent with edits and repository state,
//! and applying resolution edits. The hosting editor surface is abstracted
//! behind the [`host::Host`] trait; repository state is only ever queried,
//! never written.

pub mod cache;
pub mod config;
pub mod decor;
pub mod engine;
pub mod errors;
pub mod events;
pub mod git;
pub mod host;
pub mod marker;
pub mod resolve;
pub mod scheduler;
pub mod tracker;

// Re-exports for convenience.
pub use config::EngineConfig;
pub use engine::Engine;
pub use events::EngineHandle;
pub use host::{BufferId, Host, MemoryHost};
pub use resolve::ResolutionKind;
