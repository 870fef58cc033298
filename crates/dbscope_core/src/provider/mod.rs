//! Resource provider capability.
//!
//! The scope manager never talks to a database directly. It consumes three
//! small traits implemented by a persistence engine:
//!
//! - [`ResourceProvider`] opens handles (sessions).
//! - [`ResourceHandle`] is one unit of work: flush, begin a transaction, close.
//! - [`ResourceTransaction`] is an explicit transaction on a handle.
//!
//! A provider's identity is its type. Two handles belong to the same slot of
//! a resource collection exactly when they were opened by the same provider
//! type.

mod registry;

pub use registry::ProviderRegistry;

use crate::error::ProviderResult;
use crate::types::{FlushMode, IsolationLevel};
use parking_lot::Mutex;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Handle shared between a resource collection and its callers.
///
/// Every scope that joins the same collection receives a clone of the same
/// `Arc`. Use [`Arc::ptr_eq`] to compare handles. Do not hold the lock
/// across a call to `save` or `dispose` on the owning scope.
pub type SharedHandle<H> = Arc<Mutex<H>>;

/// A factory for resource handles.
pub trait ResourceProvider: Send + Sync + 'static {
    /// The handle type opened by this provider.
    type Handle: ResourceHandle;

    /// Opens a new handle.
    fn open(&self) -> ProviderResult<Self::Handle>;

    /// Human-readable provider name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A unit of work issued by a provider.
pub trait ResourceHandle: Send + 'static {
    /// The explicit transaction type of this handle.
    type Transaction: ResourceTransaction;

    /// Writes pending changes to the engine.
    fn flush(&mut self) -> ProviderResult<()>;

    /// Begins an explicit transaction.
    ///
    /// `None` asks for the provider's default isolation level.
    fn begin_transaction(
        &mut self,
        isolation_level: Option<IsolationLevel>,
    ) -> ProviderResult<Self::Transaction>;

    /// Changes when the handle flushes.
    fn set_flush_mode(&mut self, mode: FlushMode);

    /// Returns true until the handle is closed.
    fn is_open(&self) -> bool;

    /// Closes the handle, discarding anything not flushed.
    fn close(&mut self) -> ProviderResult<()>;
}

/// An explicit transaction on a resource handle.
pub trait ResourceTransaction: Send + 'static {
    /// Commits the transaction.
    fn commit(&mut self) -> ProviderResult<()>;

    /// Rolls the transaction back.
    fn rollback(&mut self) -> ProviderResult<()>;

    /// Returns true while the transaction can still commit or roll back.
    fn is_active(&self) -> bool;

    /// Releases the transaction.
    fn close(&mut self) -> ProviderResult<()>;
}

/// Identity of a provider type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderId {
    type_id: TypeId,
    name: &'static str,
}

impl ProviderId {
    /// Returns the identity of provider type `P`.
    #[must_use]
    pub fn of<P: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            name: std::any::type_name::<P>(),
        }
    }

    /// Returns the provider type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProviderId").field(&self.name).finish()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
