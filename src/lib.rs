pub mod config;
pub mod events;
pub mod fanout;
pub mod models;
pub mod provider;
pub mod query;
pub mod rpc;
pub mod scanner;
pub mod search;
pub mod tokens;
pub mod transfers;

#[cfg(test)]
mod test_utils;
