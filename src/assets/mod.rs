//! Asset pipeline integration.
//!
//! - **catalog**: registry of asset directories and URL resolution
//! - **overlay**: options hook injecting asset metadata into each job
//! - **http**: URL path joining

pub mod catalog;
pub mod http;
pub mod overlay;

pub use catalog::*;
pub use http::*;
pub use overlay::*;
