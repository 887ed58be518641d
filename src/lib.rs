pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{agent, handler, tooling};
pub use domain::types;
pub use infrastructure::{model, server};
