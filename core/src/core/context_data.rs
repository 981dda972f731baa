// core/src/core/context_data.rs
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shared, lockable pipeline state.
///
/// Every handler of a run receives a clone pointing at the same data. The
/// guards are blocking `parking_lot` guards and MUST be dropped before any
/// `.await`; the usual shape is to copy what a step needs out of a short read
/// scope, await, then write results back in a second short scope.
#[derive(Debug)]
pub struct ContextData<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> ContextData<T> {
  pub fn new(data: T) -> Self {
    ContextData(Arc::new(RwLock::new(data)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// Copies a value out under a read lock.
  pub fn get<U>(&self, f: impl FnOnce(&T) -> U) -> U {
    f(&self.0.read())
  }

  /// Mutates under a write lock.
  pub fn update<U>(&self, f: impl FnOnce(&mut T) -> U) -> U {
    f(&mut self.0.write())
  }
}

impl<T: Send + Sync + 'static> Clone for ContextData<T> {
  fn clone(&self) -> Self {
    ContextData(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + 'static + Default> Default for ContextData<T> {
  fn default() -> Self {
    Self::new(T::default())
  }
}
