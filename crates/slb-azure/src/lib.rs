pub mod auth;
pub mod client;
pub mod listing;

pub use auth::*;
pub use client::*;
pub use listing::*;
