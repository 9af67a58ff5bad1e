pub mod types;
pub mod config;
pub mod error;
pub mod geometry;
pub mod spatial;
pub mod data;
pub mod assign;
pub mod dissolve;
pub mod convert;
pub mod server;
pub mod headers;
