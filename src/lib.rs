pub mod audit;
pub mod cli;
pub mod config;
pub mod context;
pub mod logging;
pub mod security;
pub mod server;
pub mod shell;
pub mod ssh;
pub mod utils;
