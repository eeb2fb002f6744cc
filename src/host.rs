//! Lifecycle management for the embedded runtime.
//!
//! [`RuntimeHost`] owns exactly one embedded runtime instance and walks it through a
//! one-way lifecycle: `Uninitialized -> Initializing -> {Initialized, Failed}` and
//! `Initialized -> Shutdown`. A host is never re-initialized; callers needing a fresh
//! runtime construct a new host. Because the native initialize/shutdown entry points
//! operate on process-global state, at most one host may be `Initialized` per process;
//! the constraint is enforced with an explicit guard rather than hidden global state.
//!
//! # Architecture
//!
//! Initialization resolves the runtime image directory (explicit override or the first
//! existing [`sdk`](crate::sdk) candidate), loads the runtime's shared library, and
//! calls the native initialize entry point with the defaulted configuration. A single
//! mutex serializes the lifecycle state machine; once the host is `Initialized`,
//! delegate creation and delegate invocation run without it - the bridge introduces no
//! serialization beyond protecting its own state.
//!
//! # Examples
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

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::bindings::{CoreClr, PROPERTY_DELIMITER};
use crate::config::HostConfig;
use crate::delegate::Delegate;
use crate::{sdk, Error, Result};

/// Set while any host in this process is initialized. The native runtime operates on
/// process-global state, so a second live runtime is rejected up front.
static PROCESS_HAS_RUNTIME: AtomicBool = AtomicBool::new(false);

/// One-way lifecycle states of a [`RuntimeHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostState {
    Uninitialized,
    Initializing,
    Initialized,
    Failed,
    Shutdown,
}

/// A deferred continuation run once, immediately after a successful initialize.
type DelegateSetup = Box<dyn FnOnce(&RuntimeHost) -> Result<()> + Send>;

struct HostInner {
    state: HostState,
    config: Option<HostConfig>,
    clr: Option<Arc<CoreClr>>,
    delegate_setup: Option<DelegateSetup>,
}

/// Owns the lifecycle of one embedded runtime instance.
///
/// `initialize` and `shutdown` are serialized internally by a mutex; delegate creation
/// and invocation are not serialized once the host is initialized. Delegates obtained
/// from this host are valid only until `shutdown`; using one afterwards is undefined
/// behavior.
pub struct RuntimeHost {
    inner: Mutex<HostInner>,
}

impl Default for RuntimeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuntimeHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self
            .inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(HostState::Failed);
        f.debug_struct("RuntimeHost").field("state", &state).finish()
    }
}

impl RuntimeHost {
    /// Creates a host in the `Uninitialized` state.
    #[must_use]
    pub fn new() -> Self {
        RuntimeHost {
            inner: Mutex::new(HostInner {
                state: HostState::Uninitialized,
                config: None,
                clr: None,
                delegate_setup: None,
            }),
        }
    }

    /// Registers a continuation the host runs once, immediately after a successful
    /// [`initialize`](Self::initialize), before `initialize` returns.
    ///
    /// Intended for creating all of a caller's delegates in one place. Registering
    /// after initialization has no effect; the continuation only fires from
    /// `initialize`. A failure in the continuation is propagated by `initialize`,
    /// with the host remaining initialized.
    pub fn setup_delegates<F>(&self, setup: F) -> Result<()>
    where
        F: FnOnce(&RuntimeHost) -> Result<()> + Send + 'static,
    {
        let mut inner = self.inner.lock().map_err(|_| Error::LockError)?;
        inner.delegate_setup = Some(Box::new(setup));
        Ok(())
    }

    /// Initializes the embedded runtime with the given configuration.
    ///
    /// Fills configuration defaults, resolves the runtime image directory (explicit
    /// override, or the first existing discovery candidate), loads the runtime's
    /// shared library, and invokes the native initialize entry point. On success the
    /// host transitions to `Initialized` and the configuration becomes immutable for
    /// the host's lifetime; on failure the host transitions to `Failed` and cannot be
    /// reused.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] - this host was already initialized, failed, or shut down
    /// - [`Error::AlreadyInitialized`] - another host in this process is live
    /// - [`Error::NoRuntimeFound`] - discovery exhausted every candidate directory
    /// - [`Error::InvalidProperty`] - a property key or value contains the wire delimiter
    /// - [`Error::RuntimeLibrary`] - the runtime's shared library failed to load
    /// - [`Error::InitializationFailed`] - the native initialize call returned a failure
    pub fn initialize(&self, config: HostConfig) -> Result<()> {
        {
            let mut inner = self.inner.lock().map_err(|_| Error::LockError)?;

            if inner.state != HostState::Uninitialized {
                return Err(Error::InvalidState);
            }

            if PROCESS_HAS_RUNTIME
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return Err(Error::AlreadyInitialized);
            }

            inner.state = HostState::Initializing;

            match Self::bring_up(config) {
                Ok((config, clr)) => {
                    inner.config = Some(config);
                    inner.clr = Some(Arc::new(clr));
                    inner.state = HostState::Initialized;
                    debug!("runtime initialized");
                }
                Err(err) => {
                    inner.state = HostState::Failed;
                    PROCESS_HAS_RUNTIME.store(false, Ordering::SeqCst);
                    return Err(err);
                }
            }
        }

        // Run the deferred delegate setup outside the lifecycle lock so it can call
        // back into create_delegate.
        let setup = {
            let mut inner = self.inner.lock().map_err(|_| Error::LockError)?;
            inner.delegate_setup.take()
        };

        if let Some(setup) = setup {
            setup(self)?;
        }

        Ok(())
    }

    /// Shuts the embedded runtime down.
    ///
    /// Invoked exactly once per successful initialize. Calling `shutdown` on a host
    /// that never initialized (or already shut down) is a harmless no-op that logs a
    /// diagnostic and returns `Ok(())`.
    ///
    /// All delegates obtained from this host are invalidated; invoking one after
    /// shutdown is undefined behavior.
    ///
    /// # Errors
    ///
    /// [`Error::ShutdownFailed`] when the native shutdown call returns a failure
    /// status. The host still transitions to `Shutdown`.
    pub fn shutdown(&self) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| Error::LockError)?;

        if inner.state != HostState::Initialized {
            warn!(state = ?inner.state, "shutdown called without a live runtime; ignoring");
            return Ok(());
        }

        let clr = inner.clr.take();
        inner.state = HostState::Shutdown;
        PROCESS_HAS_RUNTIME.store(false, Ordering::SeqCst);

        let result = match &clr {
            Some(clr) => clr.shutdown(),
            None => Ok(()),
        };

        debug!("runtime shut down");
        result
    }

    /// Returns a copy of the configuration this host was initialized with, if any.
    ///
    /// The live configuration is immutable for the host's lifetime; only a copy is
    /// handed out.
    #[must_use]
    pub fn config(&self) -> Option<HostConfig> {
        self.inner.lock().ok().and_then(|inner| inner.config.clone())
    }

    /// Returns `true` while the host is in the `Initialized` state.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.state == HostState::Initialized)
            .unwrap_or(false)
    }

    /// Binds a managed method and returns a natively callable [`Delegate`].
    ///
    /// A missing assembly, type, or method is a permanent condition for this runtime
    /// instance; nothing is retried.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] - the host is not initialized
    /// - [`Error::AssemblyNotFound`] / [`Error::TypeNotFound`] / [`Error::MethodNotFound`] -
    ///   the named target does not exist
    /// - [`Error::NullDelegate`] - the runtime produced a null function pointer
    /// - [`Error::UnknownNativeFailure`] - any other non-success native status
    pub fn create_delegate(
        &self,
        assembly_name: &str,
        type_name: &str,
        method_name: &str,
    ) -> Result<Delegate> {
        let clr = self.live_clr()?;
        let ptr = clr.create_delegate(assembly_name, type_name, method_name)?;
        Ok(Delegate::new(ptr))
    }

    /// Runs a managed assembly's default entry point and returns its exit code.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] when the host is not initialized, or
    /// [`Error::UnknownNativeFailure`] when the native execute call fails.
    pub fn execute_assembly(&self, assembly_path: &str) -> Result<u32> {
        let clr = self.live_clr()?;
        clr.execute_assembly(assembly_path)
    }

    /// Takes a handle to the live runtime, holding the lifecycle lock only briefly so
    /// native calls run unserialized.
    fn live_clr(&self) -> Result<Arc<CoreClr>> {
        let inner = self.inner.lock().map_err(|_| Error::LockError)?;

        if inner.state != HostState::Initialized {
            return Err(Error::InvalidState);
        }

        inner.clr.clone().ok_or(Error::InvalidState)
    }

    /// Resolves the image directory, loads the runtime library, and performs the
    /// native initialize call. All native-encoded buffers are scoped to this function
    /// and released on every exit path.
    fn bring_up(mut config: HostConfig) -> Result<(HostConfig, CoreClr)> {
        config.fill_defaults()?;

        let image_dir = resolve_image_dir(&config)?;
        debug!(image_dir = %image_dir.display(), "loading runtime image");

        let (count, joined_keys, joined_values) = join_properties(&config)?;

        let mut clr = CoreClr::load(&image_dir)?;
        clr.initialize(
            &config.exe_path,
            &config.app_domain_name,
            count,
            &joined_keys,
            &joined_values,
            &config.managed_assembly_path,
        )?;

        Ok((config, clr))
    }
}

/// Picks the runtime image directory: the explicit override verbatim when set,
/// otherwise the first discovery candidate that exists on disk.
fn resolve_image_dir(config: &HostConfig) -> Result<PathBuf> {
    if !config.clr_files_path.is_empty() {
        return Ok(PathBuf::from(&config.clr_files_path));
    }

    sdk::locate_current()
        .find(|candidate| candidate.exists())
        .ok_or(Error::NoRuntimeFound)
}

/// Serializes the property map into (count, joined keys, joined values).
///
/// Keys and values come from a single iteration pass, so the two sequences stay
/// parallel; map order itself is not stable and does not need to be. An entry
/// containing the delimiter character has no faithful representation on the wire
/// and is rejected up front rather than mis-paired.
fn join_properties(config: &HostConfig) -> Result<(usize, String, String)> {
    for (key, value) in &config.properties {
        if key.contains(PROPERTY_DELIMITER) || value.contains(PROPERTY_DELIMITER) {
            return Err(Error::InvalidProperty(format!(
                "entry {key:?} contains the delimiter {PROPERTY_DELIMITER:?}"
            )));
        }
    }

    let delimiter = PROPERTY_DELIMITER.to_string();
    let (keys, values): (Vec<&str>, Vec<&str>) = config
        .properties
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .unzip();

    Ok((keys.len(), keys.join(&delimiter), values.join(&delimiter)))
}
