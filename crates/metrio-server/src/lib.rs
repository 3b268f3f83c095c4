pub mod body;
pub mod config;
pub mod error;
pub mod handlers;
pub mod persistence;
pub mod router;
pub mod state;
