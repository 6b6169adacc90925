pub mod config;
pub mod logging;
pub mod scenes;
pub mod source;
