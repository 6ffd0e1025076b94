// HTTP routes
pub mod error;
pub mod health;
pub mod research;
pub mod stream;

pub use error::*;
pub use health::*;
pub use research::*;
pub use stream::*;
