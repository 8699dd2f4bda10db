/// Delivery of pending turn alerts.
pub mod alert_service;
/// Operator alias maintenance.
pub mod alias_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Monitor, forget and inspect commands.
pub mod monitor_service;
/// Periodic refresh of monitored games from the external host.
pub mod poller_service;
/// Startup reload of persisted state.
pub mod rehydration;
/// Removals written to storage now or once it is back.
pub mod removal_sync;
/// Fixed-interval driver for the background loops.
pub mod scheduler;
/// Storage connection supervisor with degraded-mode handling.
pub mod storage_supervisor;
