// Two security tiers:
// Public (/auth/*) - no authentication, token acquisition and recovery
// Protected (/api/*) - bearer access token, permission-gated per route group
pub mod protected;
pub mod public;
