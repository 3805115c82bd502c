//! Task capability traits and the value-reclaim contract.

use std::fmt::Display;
use std::hash::Hash;

use super::error::AppResult;

/// Marker trait for values usable as anticipation keys.
///
/// A task is identified by itself: it must be structurally comparable with a
/// stable hash, cloneable into the store, and renderable for diagnostics.
/// The `Display` form is the human-readable name that appears in every
/// diagnostic line for the key.
pub trait TaskKey: Clone + Eq + Hash + Display + Send + Sync + 'static {}

/// Blanket implementation: any type meeting the requirements is a `TaskKey`.
impl<T> TaskKey for T where T: Clone + Eq + Hash + Display + Send + Sync + 'static {}

/// Release contract for stored values.
///
/// Values held by a store at disposal time are released through this trait.
/// The default implementation just drops the value, which is sufficient for
/// plain data. Values owning external resources override [`Reclaim::reclaim`]
/// to release them explicitly; a release failure propagates out of the
/// disposal walk rather than being swallowed.
pub trait Reclaim: Sized {
    /// Release the value. Dropping is the default release.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying resource fails to release cleanly.
    fn reclaim(self) -> AppResult<()> {
        Ok(())
    }
}

macro_rules! impl_reclaim_for {
    ($($ty:ty),* $(,)?) => {
        $(impl Reclaim for $ty {})*
    };
}

impl_reclaim_for!((), bool, i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, String);

/// A unit of speculative work whose result is memoized.
///
/// Compute tasks are idempotent and singular: one answer suffices and is
/// safe to share, so the produced value must be `Clone`: every observer of
/// the memo store receives a clone of the single stored value.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, PartialEq, Eq, Hash)]
/// enum Probe {
///     SdkVersion,
/// }
///
/// impl ComputeTask for Probe {
///     type Value = u32;
///
///     fn compute(&self) -> AppResult<u32> {
///         Ok(runtime_sdk_version())
///     }
/// }
/// ```
pub trait ComputeTask: TaskKey {
    /// The produced, shareable result type.
    type Value: Reclaim + Clone + Send + Sync + 'static;

    /// Produce the value. Runs on the worker when anticipated, or inline on
    /// the calling thread when fetched on a miss.
    ///
    /// # Errors
    ///
    /// A background failure is logged and the store entry is never written;
    /// an inline failure propagates directly to the caller.
    fn compute(&self) -> AppResult<Self::Value>;
}

/// A unit of speculative work producing a fresh, single-use instance.
///
/// Build tasks produce values that cannot be handed to two different
/// callers (a freshly constructed widget, an open handle). Multiple
/// anticipations under the same key queue up multiple interchangeable
/// instances; each consumer takes its own, so `Built` need not be `Clone`.
pub trait BuildTask: TaskKey {
    /// The produced, single-use result type.
    type Built: Reclaim + Send + 'static;

    /// Build one instance. Runs on the worker when anticipated, or inline on
    /// the calling thread when fetched on a miss.
    ///
    /// # Errors
    ///
    /// A background failure is logged and nothing is pooled; an inline
    /// failure propagates directly to the caller.
    fn build(&self) -> AppResult<Self::Built>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Handle {
        released: std::sync::Arc<std::sync::atomic::AtomicBool>,
    }

    impl Reclaim for Handle {
        fn reclaim(self) -> AppResult<()> {
            self.released
                .store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn default_reclaim_is_drop() {
        assert!(42i32.reclaim().is_ok());
        assert!(String::from("x").reclaim().is_ok());
        assert!(().reclaim().is_ok());
    }

    #[test]
    fn custom_reclaim_runs() {
        let released = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let handle = Handle {
            released: std::sync::Arc::clone(&released),
        };
        handle.reclaim().unwrap();
        assert!(released.load(std::sync::atomic::Ordering::SeqCst));
    }
}
