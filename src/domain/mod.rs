// Domain layer - Core business models
pub mod error;
pub mod reading;
pub mod session;
pub mod state;
