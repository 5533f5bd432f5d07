pub mod bootstrap;
pub mod combat;
pub mod config;
pub mod loop_runner;
