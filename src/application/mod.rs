// Application layer - Use cases and service orchestration
pub mod cook_repository;
pub mod idle_monitor;
pub mod ingestor;
pub mod session_ledger;
pub mod state_tracker;
pub mod telemetry_cache;
