pub mod config;
pub mod error;
pub mod notify;
pub mod schema;
pub mod state;
pub mod utils;
