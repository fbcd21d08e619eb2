//! Fatal error conditions.
//!
//! This core distinguishes two failure tiers. Precondition violations
//! (duplicate property creation, deleting an unowned record, reading a field
//! through the wrong discriminant) are caller bugs and are checked with
//! `debug_assert!` only; release builds trust callers. Resource-limit
//! conditions cannot be recovered from (continuing after a saturated
//! reference count would corrupt it), so they terminate the runtime
//! instead of returning an error.

use thiserror::Error;

/// Unrecoverable runtime conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fatal {
    /// A reference counter reached its maximum value. Incrementing further
    /// would wrap and eventually cause a premature free.
    #[error("reference count limit reached")]
    RefCountLimit,

    /// A handle was dereferenced after its target was freed. The safe-Rust
    /// analogue of a dangling pointer: the arena detects the stale
    /// generation instead of reading reused memory.
    #[error("dead handle dereferenced")]
    DeadHandle,
}

/// Terminate the runtime with a fatal condition.
///
/// Never returns; callers must not attempt to catch this.
#[allow(clippy::panic)]
pub(crate) fn fatal(code: Fatal) -> ! {
    panic!("jsheap fatal error: {code}")
}
