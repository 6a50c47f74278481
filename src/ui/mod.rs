//! Terminal user interface components.

pub mod error;
pub mod scope_view;

pub use error::report;
pub use scope_view::{ScopeCommand, ScopeTui, StatusLine};
