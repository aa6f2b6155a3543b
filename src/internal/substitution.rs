//! Re-entrancy marker for the provider substitution hook.
//!
//! While the configured provider factory runs for a scope, asking that scope
//! for its provider handle yields the raw scope resolver. A factory that
//! resolves through its own output therefore terminates instead of wrapping
//! itself forever.

use std::cell::RefCell;

use smallvec::SmallVec;

thread_local! {
    static SUBSTITUTING: RefCell<SmallVec<[u64; 4]>> = RefCell::new(SmallVec::new());
}

struct Marker;

impl Drop for Marker {
    fn drop(&mut self) {
        SUBSTITUTING.with(|ids| {
            ids.borrow_mut().pop();
        });
    }
}

/// Whether the provider factory is currently running for `scope`.
pub(crate) fn is_substituting(scope: u64) -> bool {
    SUBSTITUTING.with(|ids| ids.borrow().contains(&scope))
}

/// Runs `f` with `scope` marked as being substituted.
pub(crate) fn substituting<T>(scope: u64, f: impl FnOnce() -> T) -> T {
    SUBSTITUTING.with(|ids| ids.borrow_mut().push(scope));
    let _marker = Marker;
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_is_scoped_to_the_call() {
        assert!(!is_substituting(7));
        let inner = substituting(7, || (is_substituting(7), is_substituting(8)));
        assert_eq!(inner, (true, false));
        assert!(!is_substituting(7));
    }
}
