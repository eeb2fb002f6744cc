//! # clrhost Prelude
//!
//! A convenient prelude for the most commonly used types in the hosting bridge.
//! Import this module to get quick access to everything needed for embedding the
//! runtime and calling managed methods.
//!
//! # Example
//!
//! ```rust,no_run
//! use clrhost::prelude::*;
//!
//! let host = RuntimeHost::new();
//! host.initialize(HostConfig::new())?;
//! # Ok::<(), clrhost::Error>(())
//! ```

/// The main error type for all clrhost operations
pub use crate::Error;

/// The result type used throughout clrhost
pub use crate::Result;

/// Initialization parameters for the embedded runtime
pub use crate::config::HostConfig;

/// Recognized runtime property keys and the default domain name
pub use crate::config::{APP_PATHS, DEFAULT_APP_DOMAIN_NAME, NATIVE_DLL_SEARCH_DIRECTORIES};

/// Lifecycle owner for the embedded runtime
pub use crate::host::RuntimeHost;

/// A native function pointer bound to one managed method
pub use crate::delegate::Delegate;

/// Argument marshaling for delegate invocations
pub use crate::delegate::{ArgValue, DelegateArgs};

/// Platform identity used during runtime image discovery
pub use crate::sdk::Platform;
