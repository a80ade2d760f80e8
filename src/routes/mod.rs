//! Routers, split by how access is enforced.

/// Page navigations, wrapped by the gate middleware (redirects instead of errors).
pub mod pages;

/// Routes open to anonymous callers.
pub mod public;

/// JSON API routes that require a verified session.
pub mod authenticated;

/// JSON API routes restricted to the `admin` role.
pub mod admin;
