//! Runtime used by callback-style requests.
//!
//! [`Request::end`](super::Request::end) runs its future, and delivers its
//! callbacks, on the worker threads of a shared global runtime started on
//! first use. Callbacks never run on the thread that called `end`, even when
//! that thread drives a current-thread runtime of its own.

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Initialize the global runtime.
///
/// Called implicitly on first use. Calling it early moves thread startup out
/// of the first request.
pub fn init() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("horizon-lattice-fetch")
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime")
    })
}

/// Get a reference to the global runtime.
pub fn get() -> &'static Runtime {
    init()
}

/// Block on a future using the global runtime.
///
/// # Warning
///
/// Do not call this from within an async context, as it will block the
/// current thread.
pub fn block_on<F: Future>(future: F) -> F::Output {
    get().block_on(future)
}

/// Spawn a future on the global runtime.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    get().spawn(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker_name() -> Option<String> {
        std::thread::current().name().map(str::to_string)
    }

    #[test]
    fn test_spawn_outside_runtime_uses_global() {
        let handle = spawn(async { worker_name() });
        assert_eq!(block_on(handle).unwrap().as_deref(), Some("horizon-lattice-fetch"));
    }

    #[tokio::test]
    async fn test_spawn_inside_runtime_still_uses_global() {
        let caller = std::thread::current().id();
        let handle = spawn(async { (std::thread::current().id(), worker_name()) });
        let (worker, name) = handle.await.unwrap();
        assert_ne!(worker, caller);
        assert_eq!(name.as_deref(), Some("horizon-lattice-fetch"));
    }
}
