//! Ambient scope suppression.

use crate::ambient;
use crate::types::ScopeId;
use tracing::debug;

/// Hides the ambient scope while alive.
///
/// On release the exact token that was hidden becomes ambient again, so
/// suppressors nest.
#[must_use = "the ambient scope is restored as soon as the suppressor is dropped"]
#[derive(Debug)]
pub struct Suppressor {
    hidden: Option<ScopeId>,
    released: bool,
}

impl Suppressor {
    pub(crate) fn new() -> Self {
        let hidden = ambient::current_id();
        ambient::set_current(None);
        debug!(hidden = ?hidden, "suppressed ambient scope");
        Self {
            hidden,
            released: false,
        }
    }

    /// Returns the token this suppressor hid.
    #[must_use]
    pub fn hidden(&self) -> Option<ScopeId> {
        self.hidden
    }

    /// Restores the hidden scope.
    pub fn release(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        ambient::set_current(self.hidden);
        debug!(restored = ?self.hidden, "restored ambient scope");
    }
}

impl Drop for Suppressor {
    fn drop(&mut self) {
        self.restore();
    }
}
