pub mod charset;
pub mod config;
pub mod error;
pub mod metadata;

pub use charset::*;
pub use config::*;
pub use error::*;
pub use metadata::*;
