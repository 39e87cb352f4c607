pub mod config;
pub mod envelope;
pub mod session;
pub mod settings;
pub mod zone;
