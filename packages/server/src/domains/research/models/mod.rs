//! Research domain models.

pub mod candidate;
pub mod document;
pub mod evaluation;
pub mod job;
pub mod outcome;
pub mod state;

pub use candidate::*;
pub use document::*;
pub use evaluation::*;
pub use job::*;
pub use outcome::*;
pub use state::*;
