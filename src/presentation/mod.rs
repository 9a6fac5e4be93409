// Presentation layer - HTTP transport
pub mod app_state;
pub mod handlers;
