//! Domain layer containing business entities and repository contracts.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures ([`entities::Link`], [`entities::Visit`])
//! - [`repositories`] - Data access trait definitions
//!
//! # Design Principles
//!
//! - Domain layer has no dependencies on infrastructure or presentation layers
//! - Repository traits define contracts implemented by the infrastructure layer
//! - Orchestration lives in services (see [`crate::application::services`])
//!
//! # Visit Recording Flow
//!
//! 1. HTTP handler receives `GET /visit/{id}`
//! 2. [`crate::application::services::VisitService::record_visit`] validates the link
//! 3. A [`entities::NewVisit`] is written to the visit log on a tracked task
//! 4. The click counter is incremented atomically via [`repositories::LinkRepository`]

pub mod entities;
pub mod repositories;
