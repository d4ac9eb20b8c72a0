pub mod database;
pub mod errors;
pub mod server;
pub mod services;
