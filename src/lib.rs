// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # clrhost
//!
//! Embed the .NET CoreCLR runtime in a Rust process and call managed methods through
//! natively callable function pointers ("delegates"), without either side knowing the
//! other's object model.
//!
//! ## Features
//!
//! - **Runtime lifecycle** - initialize and shut down one embedded runtime instance
//!   per process, with a defined one-way state machine
//! - **Image discovery** - probes the platform's known installation locations for a
//!   runtime image, or uses an explicit override directory
//! - **Typed errors** - raw native status codes are translated into a closed error
//!   taxonomy at the FFI boundary and never leak past it
//! - **Argument marshaling** - builds tagged native argument buffers from a closed,
//!   explicit set of supported value types
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clrhost::{HostConfig, RuntimeHost};
//!
//! let host = RuntimeHost::new();
//! host.initialize(HostConfig::new())?;
//!
//! let add = host.create_delegate("Test", "Test.TestClass", "Add")?;
//! let add: unsafe extern "C" fn(i32, i32) -> i32 = unsafe { add.cast() };
//! assert_eq!(unsafe { add(2, 2) }, 4);
//!
//! host.shutdown()?;
//! # Ok::<(), clrhost::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`sdk`] - platform-dependent discovery of installed runtime image directories
//! - [`HostConfig`] - initialization parameters with documented defaults
//! - [`RuntimeHost`] - lifecycle owner; resolves the image, loads the runtime's
//!   shared library, and drives the native initialize/shutdown entry points
//! - [`Delegate`] / [`DelegateArgs`] - bound managed methods and per-invocation
//!   argument marshaling
//! - [`Error`] and [`Result`] - comprehensive error handling
//!
//! ## Concurrency
//!
//! The embedded runtime is process-wide: only one [`RuntimeHost`] may be initialized
//! at a time, enforced with an explicit guard. `initialize` and `shutdown` are
//! serialized internally; delegate creation and invocation run concurrently once the
//! host is initialized, subject only to the managed side's own concurrency contract.
//!
//! Delegate calls are synchronous, unboundedly blocking foreign calls; callers
//! needing timeouts must supply their own cancellation layer.

pub(crate) mod bindings;
pub(crate) mod error;

/// Host configuration for embedding the runtime.
pub mod config;

/// Delegates bound to managed methods, and per-invocation argument marshaling.
pub mod delegate;

/// Lifecycle management for the embedded runtime.
pub mod host;

/// Convenient re-exports of the most commonly used types.
pub mod prelude;

/// Platform-dependent discovery of installed runtime image directories.
///
/// See [`sdk::locate`] for the discovery contract: a fixed, ordered list of
/// installation roots per platform, home-directory placeholder expansion, and silent
/// skipping of missing or unreadable directories.
pub mod sdk;

/// `clrhost` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always
/// [`Error`]. Used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `clrhost` Error type
///
/// The main error type for all operations in this crate: image discovery, runtime
/// lifecycle, delegate creation, and argument marshaling.
pub use error::Error;

/// Initialization parameters for an embedded runtime.
///
/// See [`config::HostConfig`] for field defaults and the builder-style setters.
pub use config::{HostConfig, APP_PATHS, DEFAULT_APP_DOMAIN_NAME, NATIVE_DLL_SEARCH_DIRECTORIES};

/// Lifecycle owner for the embedded runtime.
///
/// See [`host::RuntimeHost`] for the state machine and the initialize/shutdown,
/// delegate-creation, and execute-assembly operations.
pub use host::RuntimeHost;

/// Delegates bound to managed methods, and per-invocation argument marshaling.
pub use delegate::{ArgValue, Delegate, DelegateArgs};
