//! Stack safety utilities for deep recursion.
//!
//! Expression parsing recurses once per nesting depth, so adversarial input
//! (`- - - - … a`, or thousands of open parentheses) can push a thread past
//! its stack. Wrapping the recursive entry points in
//! [`ensure_sufficient_stack`] grows the stack on demand instead of
//! crashing.
//!
//! # Platform Support
//!
//! - **Native targets**: uses the `stacker` crate to grow the stack on
//!   demand.
//! - **WASM targets**: no-op passthrough (WASM has its own stack
//!   management).
//!
//! # Configuration
//!
//! - **Red zone**: 100KB - if less than this remains, grow the stack
//! - **Growth size**: 1MB per growth
//!
//! These values handle very deeply nested expressions (100k+ recursion
//! depth) while keeping memory usage reasonable.

/// Minimum stack space to keep available (100KB red zone).
#[cfg(not(target_arch = "wasm32"))]
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
#[cfg(not(target_arch = "wasm32"))]
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Ensure sufficient stack space is available before executing `f`.
///
/// If the remaining stack is below the red zone threshold, additional stack
/// space is allocated before calling `f`.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM version - just call directly (WASM has its own stack management).
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
