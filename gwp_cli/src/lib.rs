pub mod config;
pub mod error;
pub mod send;
pub mod serve;
pub mod settings;
