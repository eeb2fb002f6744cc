//! Delegates bound to managed methods, and argument marshaling for invoking them.
//!
//! A [`Delegate`] is a native function pointer bound to one managed method, created
//! through [`RuntimeHost::create_delegate`](crate::RuntimeHost::create_delegate) and
//! invoked directly thereafter. The native status codes the runtime returns during
//! delegate creation are mapped here into the crate error taxonomy.
//!
//! [`DelegateArgs`] builds a native-call-compatible argument buffer from a sequence of
//! [`ArgValue`]s: each appended value is copied into its own stable native cell and
//! tagged with a type discriminator. The buffer is constructed per invocation and
//! discarded after the call returns.
//!
//! # Examples
//!
//! ```rust
//! use clrhost::{ArgValue, DelegateArgs};
//!
//! let mut args = DelegateArgs::new();
//! args.append(ArgValue::I32(2))?;
//! args.append(ArgValue::I32(2))?;
//! assert_eq!(args.len(), 2);
//! # Ok::<(), clrhost::Error>(())
//! ```

use libc::{c_int, c_void};

use crate::{Error, Result};

// HRESULTs the runtime returns for delegate-creation failures.
const ASSEMBLY_NOT_FOUND: u32 = 0x8007_0002;
const TYPE_LOAD_EXCEPTION: u32 = 0x8013_1522;
const MISSING_METHOD_EXCEPTION: u32 = 0x8013_1513;
const NULL_REFERENCE_EXCEPTION: u32 = 0x8000_4003;

/// Maps a non-success delegate-creation status to the closed error taxonomy.
///
/// Unrecognized codes surface as [`Error::UnknownNativeFailure`] carrying the raw
/// value; they are never treated as success.
pub(crate) fn delegate_error(status: c_int) -> Error {
    match status as u32 {
        ASSEMBLY_NOT_FOUND => Error::AssemblyNotFound,
        TYPE_LOAD_EXCEPTION => Error::TypeNotFound,
        MISSING_METHOD_EXCEPTION => Error::MethodNotFound,
        NULL_REFERENCE_EXCEPTION => Error::NullDelegate,
        code => Error::UnknownNativeFailure(code),
    }
}

/// A native function pointer bound to one managed method.
///
/// Exclusively owned by the caller that received it. Its validity is bounded by the
/// owning [`RuntimeHost`](crate::RuntimeHost)'s lifetime: invoking a delegate after
/// [`shutdown`](crate::RuntimeHost::shutdown) is undefined behavior and is not guarded
/// at runtime.
#[derive(Debug)]
pub struct Delegate {
    ptr: *mut c_void,
}

// Managed method invocations may run concurrently from multiple threads; the managed
// side defines its own concurrency contract.
unsafe impl Send for Delegate {}
unsafe impl Sync for Delegate {}

impl Delegate {
    pub(crate) fn new(ptr: *mut c_void) -> Self {
        Delegate { ptr }
    }

    /// Returns the raw function pointer.
    #[must_use]
    pub fn as_raw(&self) -> *const c_void {
        self.ptr
    }

    /// Reinterprets the delegate as a typed `extern "C"` function pointer.
    ///
    /// # Safety
    ///
    /// `F` must be an `extern "C"` function pointer type whose signature matches the
    /// bound managed method's unmanaged-callers signature, and the owning host must
    /// still be initialized when the returned pointer is called.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use clrhost::{HostConfig, RuntimeHost};
    /// # let host = RuntimeHost::new();
    /// # host.initialize(HostConfig::new())?;
    /// let add = host.create_delegate("Test", "Test.TestClass", "Add")?;
    /// let add: unsafe extern "C" fn(i32, i32) -> i32 = unsafe { add.cast() };
    /// assert_eq!(unsafe { add(2, 2) }, 4);
    /// # Ok::<(), clrhost::Error>(())
    /// ```
    #[must_use]
    pub unsafe fn cast<F: Copy>(&self) -> F {
        assert_eq!(
            std::mem::size_of::<F>(),
            std::mem::size_of::<*const c_void>(),
            "delegate cast target must be a function pointer"
        );
        std::mem::transmute_copy(&self.ptr)
    }
}

/// Native type discriminators understood by the managed argument dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
enum NativeKind {
    I32 = 0,
}

/// A dynamically typed delegate argument.
///
/// The set of supported types is closed and explicit; extending it means adding a
/// variant here and mapping it to a native discriminator in
/// [`DelegateArgs::append`]. Variants without a mapping are rejected with
/// [`Error::UnsupportedArgumentType`] rather than being silently dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// A 32-bit signed integer, marshaled as a native `int` cell.
    I32(i32),
    /// A 64-bit signed integer. Accepted at the type level but not yet mapped to a
    /// native discriminator.
    I64(i64),
    /// A UTF-8 string. Accepted at the type level but not yet mapped to a native
    /// discriminator.
    Str(String),
}

impl ArgValue {
    /// A short name for the variant, used in error reporting.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgValue::I32(_) => "i32",
            ArgValue::I64(_) => "i64",
            ArgValue::Str(_) => "str",
        }
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        ArgValue::I32(value)
    }
}

/// One tagged slot in the native argument buffer.
#[repr(C)]
struct RawArg {
    value: *const c_void,
    kind: c_int,
}

/// An ordered, tagged argument buffer for one delegate invocation.
///
/// Each appended value is copied into a freshly allocated cell whose address stays
/// stable for the life of the list, so the raw buffer handed to the native call
/// remains valid until the call returns. The list is exclusively owned by its
/// builder (`&mut` for appends, no interior sharing) and is meant to be discarded
/// after the invocation; it is not reused across calls.
#[derive(Default)]
pub struct DelegateArgs {
    // Boxed cells keep value addresses stable while `raw` grows.
    cells: Vec<Box<c_int>>,
    raw: Vec<RawArg>,
}

impl DelegateArgs {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an argument list from a value sequence, failing on the first
    /// unsupported value.
    pub fn from_values(values: impl IntoIterator<Item = ArgValue>) -> Result<Self> {
        let mut args = Self::new();
        for value in values {
            args.append(value)?;
        }
        Ok(args)
    }

    /// Appends one value to the list.
    ///
    /// The value is copied into its own native cell and pushed onto the buffer with
    /// its type discriminator. Values whose variant has no native mapping yet fail
    /// with [`Error::UnsupportedArgumentType`] and leave the list unchanged.
    pub fn append(&mut self, value: ArgValue) -> Result<()> {
        match value {
            ArgValue::I32(v) => {
                let cell = Box::new(v as c_int);
                self.raw.push(RawArg {
                    value: (&*cell as *const c_int).cast(),
                    kind: NativeKind::I32 as c_int,
                });
                self.cells.push(cell);
                Ok(())
            }
            other => Err(Error::UnsupportedArgumentType(other.type_name())),
        }
    }

    /// Number of arguments in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if no arguments have been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the buffer as an opaque (pointer, count) pair for the native call.
    ///
    /// The pointer stays valid until the list is dropped or mutated; the caller must
    /// not hold it across either.
    #[must_use]
    pub fn as_raw_parts(&self) -> (*const c_void, usize) {
        (self.raw.as_ptr().cast(), self.raw.len())
    }
}

impl std::fmt::Debug for DelegateArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegateArgs")
            .field("len", &self.raw.len())
            .finish()
    }
}
