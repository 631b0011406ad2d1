/// Realtime message builders.
pub mod broadcast;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Read-only tournament projections.
pub mod public_service;
/// Host commands and startup.
pub mod tournament_service;
/// Viewer WebSocket handling.
pub mod websocket_service;
