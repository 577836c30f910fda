pub extern crate actix_web;

pub mod admin;
pub mod config;
pub mod connection;
pub mod connection_tx_storage;
pub mod handlers;
pub mod router;
pub mod server;
pub mod server_state;
