// handlers/elevated/mod.rs - Elevated handlers (admin session required)
//
// Middleware: jwt_auth_middleware → validate_user_middleware → require_admin_middleware
pub mod admin;
