pub mod buffer;
pub mod config;
pub mod errors;
pub mod hub;
pub mod logging;
pub mod orchestrator;
pub mod process;
pub mod setup;
pub mod ui;
