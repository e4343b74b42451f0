pub mod connection;
pub mod constants;
pub mod engine;
pub mod poll;
pub mod types;
