/// Handler Module Index
///
/// Handlers are grouped by the router that mounts them; access control is enforced by
/// the extractor each handler takes (`AuthUser`, `AdminUser`) as well as by the router layers.

/// Registration, login/logout, token refresh and the caller's own account.
pub mod auth;

/// Read-only access to the subject tree, public and authenticated.
pub mod subjects;

/// Dashboard, sessions, users and subject-tree mutations, restricted to admins.
pub mod admin;
