pub mod schema;

pub use schema::{Config, SafetyLimits};
