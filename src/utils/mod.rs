//! Utility functions for request handling and input validation.
//!
//! - [`url_validator`] - Destination URL validation
//! - [`client_ip`] - Client address extraction from requests

pub mod client_ip;
pub mod url_validator;
