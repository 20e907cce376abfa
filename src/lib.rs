// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod passage;
pub mod persist;
pub mod results;
pub mod runtime;
pub mod score;
pub mod session;
