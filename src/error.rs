use std::ffi::NulError;

use thiserror::Error;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers every failure mode of the hosting bridge: runtime image discovery,
/// native library loading, runtime initialization and shutdown, delegate creation, and
/// argument marshaling. Raw native status codes are translated into these variants at the
/// FFI boundary and never leak past it.
///
/// # Error Categories
///
/// ## Discovery and Configuration
/// - [`Error::NoRuntimeFound`] - No runtime image directory exists at any known location
/// - [`Error::RuntimeLibrary`] - The CoreCLR shared library could not be loaded or is missing symbols
/// - [`Error::InvalidString`] - A configuration string contained an interior NUL byte
/// - [`Error::InvalidProperty`] - A property does not fit the joined wire encoding
///
/// ## Lifecycle
/// - [`Error::AlreadyInitialized`] - A runtime is already live in this process
/// - [`Error::InvalidState`] - Operation not valid in the host's current lifecycle state
/// - [`Error::InitializationFailed`] - The native initialize call returned a failure status
/// - [`Error::ShutdownFailed`] - The native shutdown call returned a failure status
///
/// ## Delegate Creation
/// - [`Error::AssemblyNotFound`] - The named managed assembly could not be located
/// - [`Error::TypeNotFound`] - The named type does not exist in the assembly
/// - [`Error::MethodNotFound`] - The named method does not exist on the type
/// - [`Error::NullDelegate`] - The runtime produced a null function pointer
/// - [`Error::UnknownNativeFailure`] - Any other non-success native status, raw code attached
///
/// ## Marshaling
/// - [`Error::UnsupportedArgumentType`] - Argument type has no native discriminator mapping
#[derive(Error, Debug)]
pub enum Error {
    /// No runtime image was found at any of the known installation locations.
    ///
    /// Discovery exhausted every candidate directory for the current platform without
    /// finding one that exists on disk. Supply an explicit image directory via
    /// [`HostConfig::clr_files_path`](crate::HostConfig::clr_files_path) to bypass
    /// discovery.
    #[error("No runtime image found at any known installation location")]
    NoRuntimeFound,

    /// A runtime is already initialized in this process.
    ///
    /// The embedded runtime operates on process-global state; at most one host may be
    /// in the `Initialized` state at a time.
    #[error("A runtime host is already initialized in this process")]
    AlreadyInitialized,

    /// The operation is not valid in the host's current lifecycle state.
    ///
    /// A host moves through `Uninitialized -> Initialized -> Shutdown` exactly once.
    /// Re-initializing after a failure or shutdown, or creating delegates before a
    /// successful initialize, produces this error. Construct a new host for a fresh
    /// runtime.
    #[error("Operation not valid in the current host state")]
    InvalidState,

    /// The native runtime initialization call failed.
    ///
    /// Carries the raw status code returned by `coreclr_initialize`.
    #[error("Runtime initialization failed with native status {0:#010x}")]
    InitializationFailed(i32),

    /// The native runtime shutdown call failed.
    ///
    /// Carries the raw status code returned by `coreclr_shutdown`.
    #[error("Runtime shutdown failed with native status {0:#010x}")]
    ShutdownFailed(i32),

    /// The requested managed assembly could not be found.
    #[error("Assembly not found")]
    AssemblyNotFound,

    /// The requested type does not exist in the managed assembly.
    #[error("Type not found in assembly")]
    TypeNotFound,

    /// The requested method does not exist on the managed type.
    #[error("Method not found on type")]
    MethodNotFound,

    /// The runtime returned a null delegate function pointer.
    #[error("Runtime returned a null delegate function pointer")]
    NullDelegate,

    /// The native layer returned a status code outside the known mapping.
    ///
    /// The raw code is preserved so callers can diagnose runtime-specific failures
    /// that this bridge does not recognize. An unknown non-success code is never
    /// treated as success.
    #[error("Unknown native failure - status {0:#010x}")]
    UnknownNativeFailure(u32),

    /// The property map cannot be represented in the joined wire encoding.
    ///
    /// The native initialize call receives the property map as two `;`-joined
    /// strings, so a key or value containing the delimiter has no faithful
    /// representation; likewise a joined string that does not split back into the
    /// expected number of entries. Both cases fail with the offending entry named
    /// rather than mis-pairing keys and values silently.
    #[error("Property map does not fit the joined wire encoding: {0}")]
    InvalidProperty(String),

    /// The argument type has no mapping to a native type discriminator.
    ///
    /// Appending a value the marshaler cannot represent fails immediately rather than
    /// being dropped. The attached name identifies the rejected type.
    #[error("Unsupported delegate argument type: {0}")]
    UnsupportedArgumentType(&'static str),

    /// The CoreCLR shared library could not be loaded, or a hosting symbol was missing.
    #[error("{0}")]
    RuntimeLibrary(#[from] libloading::Error),

    /// A configuration string contained an interior NUL byte and cannot cross the FFI
    /// boundary.
    #[error("{0}")]
    InvalidString(#[from] NulError),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors, such as a failure to determine the current
    /// executable path during configuration defaulting.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Failed to lock target.
    ///
    /// This error occurs when the mutex guarding the host lifecycle state has been
    /// poisoned by a panic on another thread.
    #[error("Failed to lock target")]
    LockError,
}
