// Public API for integration tests and the server binary

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod presentation;
pub mod protocol;
pub mod repository;
pub mod runloop;
pub mod state;
pub mod types;
pub mod ws;
