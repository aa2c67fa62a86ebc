#![forbid(unsafe_code)]

//! Propagation depth guard.
//!
//! Every closure update enters a [`DepthGuard`]. A recompute function that
//! writes back into one of its own dependencies re-enters the guard on each
//! lap; once the nesting depth passes the thread's limit the update fails
//! with [`Error::PropagationDepthExceeded`] and the error unwinds through
//! every `set()` on the stack.

use std::cell::Cell;

use trellis_core::config::DEFAULT_PROPAGATION_LIMIT;
use trellis_core::{Error, Result};

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    static LIMIT: Cell<usize> = const { Cell::new(DEFAULT_PROPAGATION_LIMIT) };
}

/// Current nesting limit for this thread.
#[must_use]
pub fn propagation_limit() -> usize {
    LIMIT.with(Cell::get)
}

/// Current nesting depth for this thread.
#[must_use]
pub fn depth() -> usize {
    DEPTH.with(Cell::get)
}

/// One level of closure nesting. Dropping it leaves the level.
#[derive(Debug)]
pub struct DepthGuard {
    _private: (),
}

impl DepthGuard {
    pub fn enter() -> Result<Self> {
        let limit = propagation_limit();
        DEPTH.with(|depth| {
            let next = depth.get() + 1;
            if next > limit {
                tracing::warn!(limit, "propagation depth exceeded");
                return Err(Error::PropagationDepthExceeded { limit });
            }
            depth.set(next);
            Ok(Self { _private: () })
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Restores the previous propagation limit on drop.
#[derive(Debug)]
#[must_use = "the limit is restored as soon as the scope is dropped"]
pub struct LimitScope {
    previous: usize,
}

/// Install `limit` for the current thread until the returned scope drops.
pub fn scoped_limit(limit: usize) -> LimitScope {
    let previous = LIMIT.with(|l| l.replace(limit.max(1)));
    LimitScope { previous }
}

impl Drop for LimitScope {
    fn drop(&mut self) {
        LIMIT.with(|l| l.set(self.previous));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_tracks_nesting() {
        assert_eq!(depth(), 0);
        let a = DepthGuard::enter().unwrap();
        let b = DepthGuard::enter().unwrap();
        assert_eq!(depth(), 2);
        drop(b);
        drop(a);
        assert_eq!(depth(), 0);
    }

    #[test]
    fn exceeding_limit_fails_without_leaking_depth() {
        let _scope = scoped_limit(2);
        let _a = DepthGuard::enter().unwrap();
        let _b = DepthGuard::enter().unwrap();
        let err = DepthGuard::enter().unwrap_err();
        assert!(matches!(err, Error::PropagationDepthExceeded { limit: 2 }));
        assert_eq!(depth(), 2);
    }

    #[test]
    fn scoped_limit_restores_previous() {
        let before = propagation_limit();
        {
            let _scope = scoped_limit(7);
            assert_eq!(propagation_limit(), 7);
            {
                let _inner = scoped_limit(0);
                assert_eq!(propagation_limit(), 1);
            }
            assert_eq!(propagation_limit(), 7);
        }
        assert_eq!(propagation_limit(), before);
    }
}
