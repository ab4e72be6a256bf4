// crates/core/src/lib.rs
pub mod dispatch;
pub mod error;
pub mod fetcher;
pub mod readiness;
pub mod runner;
pub mod store;
pub mod task;

pub use dispatch::*;
pub use error::*;
pub use fetcher::*;
pub use readiness::*;
pub use runner::*;
pub use store::*;
pub use task::*;
