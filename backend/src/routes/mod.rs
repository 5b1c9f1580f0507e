/// Router Module Index
///
/// Routes are grouped by access tier. Each group is wrapped in its own layer in
/// `create_router`, so a handler cannot end up on a less protected router by accident.

/// Routes open to anonymous callers: health, sign-in flow, catalogue reads.
pub mod public;

/// Routes behind `require_authenticated`. Any signed-in role.
pub mod authenticated;

/// Routes behind `require_admin`.
pub mod admin;
