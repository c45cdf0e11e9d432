// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Route Prefix: no /api prefix (/auth/*, /plans)

pub mod auth;
pub mod plans;
