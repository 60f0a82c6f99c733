// Authentication module
// Manages the directory token lifecycle

mod exchange;
mod manager;
mod types;

pub use manager::TokenManager;
pub use types::Credentials;
