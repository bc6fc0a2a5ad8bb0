//! Crash boundary for whoever owns a store's lifetime.
//!
//! Nothing here installs a process-wide hook. Wrap the top-level work that
//! touches a store in [`run_guarded`]; when that work panics, the boundary
//! decides whether to rescue the file, reports the fault, and lets the panic
//! carry on.
//!
//! The rescue only happens when a dump was interrupted, i.e. a dump began and
//! never finished. A panic in unrelated code leaves the file alone: the last
//! completed dump is kept rather than risking a write from a half-finished
//! piece of work.

use crate::backend::MapBackend;
use crate::store::Store;
use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};

/// Run `f` against `store`. If `f` panics, flush the store when a dump was
/// interrupted, log the fault, and resume unwinding with the original payload.
///
/// The logged `boundary_backtrace` is captured here, after unwinding, so it
/// shows where the boundary sits rather than where the panic happened. The
/// panic's own location is in std's panic message (and in its backtrace with
/// `RUST_BACKTRACE=1`).
pub fn run_guarded<M, T, F>(store: &Store<M>, f: F) -> T
where
    M: MapBackend,
    F: FnOnce(&Store<M>) -> T,
{
    // The store is only touched again through its own guard.
    match panic::catch_unwind(AssertUnwindSafe(|| f(store))) {
        Ok(value) => value,
        Err(payload) => {
            handle_fault(store, &*payload);
            panic::resume_unwind(payload)
        }
    }
}

/// Rescue the file if a dump was interrupted, then report the fault. Returns
/// whether the file was rewritten.
pub(crate) fn handle_fault<M: MapBackend>(store: &Store<M>, payload: &(dyn Any + Send)) -> bool {
    let message = panic_message(payload);
    let rescued = if store.dump_interrupted() {
        match store.rescue_dump() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    target: "json_store",
                    path = %store.path().display(),
                    error = %e,
                    "rescue dump failed"
                );
                false
            }
        }
    } else {
        false
    };

    let boundary_backtrace = Backtrace::force_capture();
    tracing::error!(
        target: "json_store",
        kind = "panic",
        message = %message,
        rescued,
        boundary_backtrace = %boundary_backtrace,
        "unhandled fault"
    );
    rescued
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
