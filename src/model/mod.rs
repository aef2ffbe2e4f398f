pub mod basket;
pub mod config;
pub mod task;

pub use basket::*;
pub use config::*;
pub use task::*;
