pub mod cache;
pub mod commands;
pub mod formatters;
