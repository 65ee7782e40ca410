pub mod breaker;
pub mod classify;
pub mod error;
pub mod ids;
pub mod model;
pub mod policy;
pub mod report;
pub mod timestamp;
pub mod types;

pub use breaker::*;
pub use classify::*;
pub use error::*;
pub use ids::*;
pub use model::*;
pub use policy::*;
pub use report::*;
pub use timestamp::*;
pub use types::*;
