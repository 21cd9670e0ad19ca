//! In-process repository implementations.
//!
//! Used when `STORAGE_BACKEND=memory` and by integration tests. Data lives only
//! as long as the process.
//!
//! - [`MemoryLinkRepository`] - Link store
//! - [`MemoryVisitRepository`] - Visit log

mod link_store;
mod visit_store;

pub use link_store::MemoryLinkRepository;
pub use visit_store::MemoryVisitRepository;
