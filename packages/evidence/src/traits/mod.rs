//! Capability traits the gateway dispatches to.

pub mod completer;
pub mod searcher;

pub use completer::Completer;
pub use searcher::{SearchHit, WebSearcher};
