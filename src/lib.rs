pub mod config;
pub mod console;
pub mod engine;
pub mod runner;
pub mod tools;
