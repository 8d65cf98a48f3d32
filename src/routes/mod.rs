//! Route handlers. Each takes the raw query string (GET) or form body
//! (POST) and returns an HTML fragment for HTMX to swap.

pub mod game;
pub mod session;
pub mod study;
pub mod util;
