//! Core domain entities.
//!
//! # Entity Types
//!
//! - [`Link`] - A registered destination with title, expiry and click counter
//! - [`Visit`] - One recorded redirect against a link
//!
//! Entities follow the "New Type" pattern with separate structs for creation
//! (`NewLink`, `NewVisit`) and for partial updates (`LinkPatch`).

pub mod link;
pub mod visit;

pub use link::{Link, LinkPatch, NewLink, parse_link_id};
pub use visit::{ClientInfo, NewVisit, Visit};
