// handlers/protected/mod.rs - Protected handlers (session required)
//
// Middleware: jwt_auth_middleware → validate_user_middleware
pub mod auth;
pub mod features;
