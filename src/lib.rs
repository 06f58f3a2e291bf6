pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod features;
pub mod handlers;
pub mod middleware;
pub mod services;

#[cfg(test)]
pub mod testing;
