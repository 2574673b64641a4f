pub mod api;
pub mod app;
pub mod audio;
pub mod automation;
pub mod cli;
pub mod config;
pub mod db;
pub mod global;
pub mod session;
pub mod summarizer;
pub mod transcript;
