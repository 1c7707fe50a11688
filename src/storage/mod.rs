//! Storage layer: the connection facade over the embedded engine.

pub mod conn;

pub use conn::Connection;
