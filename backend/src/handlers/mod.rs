//! Request handlers, grouped by resource.
//!
//! Access control happens twice: the route layer (`auth::require_*`) rejects
//! unauthenticated or under-privileged callers, and handlers that need the caller's
//! identity re-check ownership or role themselves.

pub mod dishes;
pub mod events;
pub mod orders;
pub mod session;
pub mod users;

pub use dishes::*;
pub use events::*;
pub use orders::*;
pub use session::*;
pub use users::*;
