/// Router Module Index
///
/// Routes are split by access level so that each group gets its guard as a router layer
/// in `create_router`, not per handler.

/// Routes accessible to anonymous clients: health, the subject catalogue, and the
/// credential endpoints (which are rate limited separately).
pub mod public;

/// Routes behind the `AuthUser` middleware and the API rate limiter.
pub mod authenticated;

/// Routes nested under `/admin`; every handler takes the `AdminUser` extractor.
pub mod admin;
