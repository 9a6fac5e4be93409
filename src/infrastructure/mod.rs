// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod device_client;
pub mod simulator;
pub mod sqlite_repository;
