//! Raw bindings to the CoreCLR hosting API.
//!
//! This module owns the dynamic loading of the runtime's shared library and the four
//! hosting entry points it exports (`coreclr_initialize`, `coreclr_shutdown`,
//! `coreclr_create_delegate`, `coreclr_execute_assembly`). Everything above this layer
//! works with typed [`crate::Error`] values; raw native status codes are translated
//! here and never escape.
//!
//! Status codes follow the HRESULT convention: a non-negative value is success.
//!
//! The property map crosses this boundary as a count plus two `;`-joined strings
//! (keys, values), matching the encoding the original hosting shim expected; the
//! strings are split back into parallel arrays immediately before the native call.

use std::ffi::{CStr, CString};
use std::fs;
use std::path::{Path, PathBuf};

use libc::{c_char, c_int, c_uint, c_void};
use libloading::Library;

use crate::delegate::delegate_error;
use crate::{Error, Result};

/// Delimiter joining property keys and values on the wire.
pub(crate) const PROPERTY_DELIMITER: char = ';';

/// Runtime property carrying the list of fully trusted assemblies.
const TRUSTED_PLATFORM_ASSEMBLIES: &str = "TRUSTED_PLATFORM_ASSEMBLIES";

#[cfg(target_os = "windows")]
const CORECLR_LIBRARY: &str = "coreclr.dll";
#[cfg(target_os = "macos")]
const CORECLR_LIBRARY: &str = "libcoreclr.dylib";
#[cfg(all(unix, not(target_os = "macos")))]
const CORECLR_LIBRARY: &str = "libcoreclr.so";

#[cfg(target_os = "windows")]
const TPA_SEPARATOR: char = ';';
#[cfg(not(target_os = "windows"))]
const TPA_SEPARATOR: char = ':';

/// `SUCCEEDED` from the HRESULT convention.
pub(crate) fn succeeded(status: c_int) -> bool {
    status >= 0
}

type InitializeFn = unsafe extern "C" fn(
    exe_path: *const c_char,
    app_domain_friendly_name: *const c_char,
    property_count: c_int,
    property_keys: *const *const c_char,
    property_values: *const *const c_char,
    host_handle: *mut *mut c_void,
    domain_id: *mut c_uint,
) -> c_int;

type ShutdownFn = unsafe extern "C" fn(host_handle: *mut c_void, domain_id: c_uint) -> c_int;

type CreateDelegateFn = unsafe extern "C" fn(
    host_handle: *mut c_void,
    domain_id: c_uint,
    assembly_name: *const c_char,
    type_name: *const c_char,
    method_name: *const c_char,
    delegate: *mut *mut c_void,
) -> c_int;

type ExecuteAssemblyFn = unsafe extern "C" fn(
    host_handle: *mut c_void,
    domain_id: c_uint,
    argc: c_int,
    argv: *const *const c_char,
    managed_assembly_path: *const c_char,
    exit_code: *mut c_uint,
) -> c_int;

/// A loaded CoreCLR shared library and, after a successful initialize, the opaque
/// host handle and domain id the hosting calls operate on.
///
/// The [`Library`] is kept alive for as long as this struct exists so the resolved
/// entry points stay valid.
pub(crate) struct CoreClr {
    // Field order matters for drop: symbols are plain fn pointers copied out of the
    // library, so only `library` owns a resource.
    library: Library,
    image_dir: PathBuf,
    initialize: InitializeFn,
    shutdown: ShutdownFn,
    create_delegate: CreateDelegateFn,
    execute_assembly: ExecuteAssemblyFn,
    host_handle: *mut c_void,
    domain_id: c_uint,
}

// The host handle is an opaque token only ever handed back to the runtime, which
// performs its own synchronization for delegate creation and invocation.
unsafe impl Send for CoreClr {}
unsafe impl Sync for CoreClr {}

impl std::fmt::Debug for CoreClr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreClr")
            .field("image_dir", &self.image_dir)
            .field("domain_id", &self.domain_id)
            .finish_non_exhaustive()
    }
}

impl CoreClr {
    /// Loads `libcoreclr` from the given runtime image directory and resolves the
    /// hosting entry points.
    pub(crate) fn load(image_dir: &Path) -> Result<Self> {
        let library_path = image_dir.join(CORECLR_LIBRARY);
        let library = unsafe { Library::new(&library_path) }?;

        let initialize = unsafe { *library.get::<InitializeFn>(b"coreclr_initialize\0")? };
        let shutdown = unsafe { *library.get::<ShutdownFn>(b"coreclr_shutdown\0")? };
        let create_delegate =
            unsafe { *library.get::<CreateDelegateFn>(b"coreclr_create_delegate\0")? };
        let execute_assembly =
            unsafe { *library.get::<ExecuteAssemblyFn>(b"coreclr_execute_assembly\0")? };

        Ok(CoreClr {
            library,
            image_dir: image_dir.to_path_buf(),
            initialize,
            shutdown,
            create_delegate,
            execute_assembly,
            host_handle: std::ptr::null_mut(),
            domain_id: 0,
        })
    }

    /// Initializes the runtime.
    ///
    /// `joined_keys` / `joined_values` carry the property map as `property_count`
    /// entries joined with [`PROPERTY_DELIMITER`]. When the caller supplied no
    /// `TRUSTED_PLATFORM_ASSEMBLIES` property, a default list is assembled from the
    /// managed assemblies in the runtime image directory, plus the entry assembly
    /// itself when one is set.
    pub(crate) fn initialize(
        &mut self,
        exe_path: &str,
        app_domain_name: &str,
        property_count: usize,
        joined_keys: &str,
        joined_values: &str,
        managed_assembly_path: &str,
    ) -> Result<()> {
        let mut keys: Vec<CString> = split_values(joined_keys, property_count)?;
        let mut values: Vec<CString> = split_values(joined_values, property_count)?;

        if !contains_key(&keys, TRUSTED_PLATFORM_ASSEMBLIES) {
            let tpa = self.default_tpa_list(managed_assembly_path);
            if !tpa.is_empty() {
                keys.push(CString::new(TRUSTED_PLATFORM_ASSEMBLIES)?);
                values.push(CString::new(tpa)?);
            }
        }

        let key_ptrs: Vec<*const c_char> = keys.iter().map(|k| k.as_ptr()).collect();
        let value_ptrs: Vec<*const c_char> = values.iter().map(|v| v.as_ptr()).collect();

        let exe_path = CString::new(exe_path)?;
        let app_domain_name = CString::new(app_domain_name)?;

        let mut host_handle: *mut c_void = std::ptr::null_mut();
        let mut domain_id: c_uint = 0;

        let status = unsafe {
            (self.initialize)(
                exe_path.as_ptr(),
                app_domain_name.as_ptr(),
                key_ptrs.len() as c_int,
                key_ptrs.as_ptr(),
                value_ptrs.as_ptr(),
                &mut host_handle,
                &mut domain_id,
            )
        };

        if !succeeded(status) {
            return Err(Error::InitializationFailed(status));
        }

        self.host_handle = host_handle;
        self.domain_id = domain_id;
        Ok(())
    }

    /// Shuts the runtime down. Valid exactly once after a successful initialize.
    pub(crate) fn shutdown(&self) -> Result<()> {
        let status = unsafe { (self.shutdown)(self.host_handle, self.domain_id) };

        if !succeeded(status) {
            return Err(Error::ShutdownFailed(status));
        }

        Ok(())
    }

    /// Binds a managed method and returns its native function pointer.
    ///
    /// Non-success status codes are mapped through the fixed delegate error table; a
    /// success status with a null out-pointer maps to [`Error::NullDelegate`].
    pub(crate) fn create_delegate(
        &self,
        assembly_name: &str,
        type_name: &str,
        method_name: &str,
    ) -> Result<*mut c_void> {
        let assembly_name = CString::new(assembly_name)?;
        let type_name = CString::new(type_name)?;
        let method_name = CString::new(method_name)?;

        let mut delegate: *mut c_void = std::ptr::null_mut();

        let status = unsafe {
            (self.create_delegate)(
                self.host_handle,
                self.domain_id,
                assembly_name.as_ptr(),
                type_name.as_ptr(),
                method_name.as_ptr(),
                &mut delegate,
            )
        };

        if !succeeded(status) {
            return Err(delegate_error(status));
        }

        if delegate.is_null() {
            return Err(Error::NullDelegate);
        }

        Ok(delegate)
    }

    /// Runs a managed assembly's default entry point and returns its exit code.
    pub(crate) fn execute_assembly(&self, assembly_path: &str) -> Result<u32> {
        let assembly_path = CString::new(assembly_path)?;
        let mut exit_code: c_uint = 0;

        let status = unsafe {
            (self.execute_assembly)(
                self.host_handle,
                self.domain_id,
                0,
                std::ptr::null(),
                assembly_path.as_ptr(),
                &mut exit_code,
            )
        };

        if !succeeded(status) {
            return Err(Error::UnknownNativeFailure(status as u32));
        }

        Ok(exit_code)
    }

    /// Assembles the default trusted-assembly list from the runtime image directory.
    fn default_tpa_list(&self, managed_assembly_path: &str) -> String {
        let mut entries = list_managed_assemblies(&self.image_dir);

        if !managed_assembly_path.is_empty() {
            entries.push(managed_assembly_path.to_string());
        }

        entries.join(&TPA_SEPARATOR.to_string())
    }
}

/// Splits a joined property string back into exactly `count` C strings.
///
/// A piece count other than `count` means some entry contained the delimiter and
/// the keys and values would be mis-paired; that is an error, not a truncation.
fn split_values(joined: &str, count: usize) -> Result<Vec<CString>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let pieces: Vec<&str> = joined.split(PROPERTY_DELIMITER).collect();
    if pieces.len() != count {
        return Err(Error::InvalidProperty(format!(
            "expected {count} entries, found {}",
            pieces.len()
        )));
    }

    pieces
        .into_iter()
        .map(|v| CString::new(v).map_err(Error::from))
        .collect()
}

fn contains_key(keys: &[CString], wanted: &str) -> bool {
    keys.iter().any(|k| key_matches(k, wanted))
}

fn key_matches(key: &CStr, wanted: &str) -> bool {
    key.to_str().map(|k| k == wanted).unwrap_or(false)
}

/// Lists `.dll` files in a directory in filesystem enumeration order.
fn list_managed_assemblies(dir: &Path) -> Vec<String> {
    let mut assemblies = Vec::new();

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "dll").unwrap_or(false) {
                assemblies.push(path.to_string_lossy().into_owned());
            }
        }
    }

    assemblies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succeeded_follows_hresult_convention() {
        assert!(succeeded(0));
        assert!(succeeded(1));
        assert!(!succeeded(-1));
        assert!(!succeeded(0x8007_0002_u32 as c_int));
    }

    #[test]
    fn test_split_values_round_trips_joined_properties() {
        let split = split_values("APP_PATHS;NATIVE_DLL_SEARCH_DIRECTORIES", 2).unwrap();
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].to_str().unwrap(), "APP_PATHS");
        assert_eq!(split[1].to_str().unwrap(), "NATIVE_DLL_SEARCH_DIRECTORIES");
    }

    #[test]
    fn test_split_values_empty() {
        assert!(split_values("", 0).unwrap().is_empty());
    }

    #[test]
    fn test_split_values_rejects_entry_count_mismatch() {
        // A value that carried the delimiter would otherwise mis-pair the
        // sequences and drop the tail entry.
        let err = split_values("/a;/b;/c", 2).unwrap_err();
        assert!(matches!(err, Error::InvalidProperty(_)), "got {err:?}");

        let err = split_values("/a", 2).unwrap_err();
        assert!(matches!(err, Error::InvalidProperty(_)), "got {err:?}");
    }

    #[test]
    fn test_contains_key_finds_trusted_assemblies() {
        let keys = vec![
            CString::new("APP_PATHS").unwrap(),
            CString::new(TRUSTED_PLATFORM_ASSEMBLIES).unwrap(),
        ];
        assert!(contains_key(&keys, TRUSTED_PLATFORM_ASSEMBLIES));
        assert!(!contains_key(&keys, "SERVER_GC"));
    }

    #[test]
    fn test_list_managed_assemblies_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("System.Runtime.dll"), b"").unwrap();
        std::fs::write(dir.path().join("libcoreclr.so"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let assemblies = list_managed_assemblies(dir.path());
        assert_eq!(assemblies.len(), 1);
        assert!(assemblies[0].ends_with("System.Runtime.dll"));
    }

    #[test]
    fn test_load_fails_for_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let result = CoreClr::load(dir.path());
        assert!(matches!(result, Err(Error::RuntimeLibrary(_))));
    }
}
