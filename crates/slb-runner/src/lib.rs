pub mod access;
pub mod config;
pub mod logging;
pub mod runner;
pub mod validate;

pub use access::*;
pub use config::*;
pub use logging::*;
pub use runner::*;
pub use validate::*;
