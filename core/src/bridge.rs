//! Blocking access to the async API.
//!
//! # Design
//! Every operation is written once as an `async fn`. `run_blocking` drives
//! any such future to completion on a dedicated runtime, and
//! `blocking_twins!` stamps out the `*_blocking` method for an async method
//! so the twins never carry logic of their own.
//!
//! The runtime is created on first use and lives for the rest of the
//! process, so connection pools built while serving one blocking call stay
//! usable for the next.

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};

use crate::error::ApiError;

static BLOCKING_RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn runtime() -> Result<&'static Runtime, ApiError> {
    if let Some(runtime) = BLOCKING_RUNTIME.get() {
        return Ok(runtime);
    }
    let runtime = Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("trellis-blocking")
        .enable_all()
        .build()?;
    // A racing caller may have installed its own runtime first; either works.
    let _ = BLOCKING_RUNTIME.set(runtime);
    BLOCKING_RUNTIME
        .get()
        .ok_or_else(|| ApiError::Config("blocking runtime unavailable".to_string()))
}

/// Run `future` to completion from synchronous code.
///
/// Errors raised by the future are returned unchanged. Calling this from
/// inside an async runtime returns `ApiError::BlockingInAsyncContext`
/// instead of stalling that runtime.
pub fn run_blocking<T, F>(future: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    if Handle::try_current().is_ok() {
        return Err(ApiError::BlockingInAsyncContext);
    }
    runtime()?.block_on(future)
}

/// Declare `*_blocking` twins of async methods on `self`.
///
/// ```ignore
/// blocking_twins! {
///     pub fn get_blocking<R: Resource> = get(id: &str, options: FetchOptions) -> Result<R, ApiError>;
/// }
/// ```
macro_rules! blocking_twins {
    ($(
        $(#[$meta:meta])*
        $vis:vis fn $blocking:ident $(<$($gen:ident : $bound:path),+>)?
            = $async_fn:ident ( $($arg:ident : $ty:ty),* $(,)? ) -> $ret:ty;
    )*) => {
        $(
            $(#[$meta])*
            $vis fn $blocking $(<$($gen: $bound),+>)? (&self, $($arg: $ty),*) -> $ret {
                $crate::bridge::run_blocking(self.$async_fn $(::<$($gen),+>)? ($($arg),*))
            }
        )*
    };
}

pub(crate) use blocking_twins;
