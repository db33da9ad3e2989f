pub mod engine;
pub mod runtime;
