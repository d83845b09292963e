/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// Access control is applied explicitly at the module level (via Axum layers),
/// preventing accidental exposure of protected endpoints.

/// Routes accessible to all clients (anonymous or logged-in): the
/// authentication gateway itself and published content reads.
pub mod public;

/// Routes protected by the session middleware. Every handler here re-extracts
/// the validated `AuthSession` for its permission checks.
pub mod authenticated;
