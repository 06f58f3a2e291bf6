// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (session required) → Elevated (admin session required)
pub mod elevated;
pub mod protected;
pub mod public;
