// Grill telemetry service - library surface for the binary and tests
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
