// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route Prefix: /api/*
// Middleware: jwt_auth_middleware places an AuthUser in the request extensions;
// each handler names the role it needs through the Authenticated<R> extractor.

pub mod activities;
pub mod files;
pub mod notifications;
pub mod portals;
pub mod session;
pub mod updates;
pub mod usage;
