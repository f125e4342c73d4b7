pub mod channels;
pub mod commands;
pub mod config;
pub mod errors;
pub mod health;
pub mod logging;
pub mod node;
pub mod sensors;
pub mod sink;
