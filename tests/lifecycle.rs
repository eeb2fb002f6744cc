//! Full-lifecycle integration tests against a real runtime image.
//!
//! These scenarios need an installed CoreCLR and a compiled test assembly, so they
//! are opt-in: set `CLRHOST_TEST_ASSEMBLY_DIR` to a directory containing `Test.dll`
//! (exposing `Test.TestClass` with `Add(int, int) -> int` and `String() -> string`
//! methods marked for unmanaged callers) and run the tests single-threaded -
//! the embedded runtime is process-global and cannot be restarted:
//!
//! ```bash
//! CLRHOST_TEST_ASSEMBLY_DIR=tests/testfiles cargo test --test lifecycle -- --test-threads=1
//! ```
//!
//! Without the variable, every test here is a silent pass.

use std::ffi::CStr;
use std::sync::OnceLock;

use clrhost::prelude::*;

/// The initialized process-wide host, shared across tests in this binary.
static HOST: OnceLock<RuntimeHost> = OnceLock::new();

/// Initializes the shared host, or returns `None` when the opt-in variable is unset.
fn live_host() -> Option<&'static RuntimeHost> {
    let assembly_dir = std::env::var("CLRHOST_TEST_ASSEMBLY_DIR").ok()?;

    Some(HOST.get_or_init(|| {
        let host = RuntimeHost::new();
        let config = HostConfig::new()
            .with_property(APP_PATHS, assembly_dir.clone())
            .with_property(NATIVE_DLL_SEARCH_DIRECTORIES, assembly_dir);
        host.initialize(config)
            .expect("runtime failed to initialize; is a CoreCLR image installed?");
        host
    }))
}

#[test]
fn create_delegate_maps_missing_targets() {
    let Some(host) = live_host() else { return };

    let err = host
        .create_delegate("missing-assembly", "Test.TestClass", "Add")
        .unwrap_err();
    assert!(matches!(err, Error::AssemblyNotFound), "got {err:?}");

    let err = host
        .create_delegate("Test", "missing.Type", "Add")
        .unwrap_err();
    assert!(matches!(err, Error::TypeNotFound), "got {err:?}");

    let err = host
        .create_delegate("Test", "Test.TestClass", "missing")
        .unwrap_err();
    assert!(matches!(err, Error::MethodNotFound), "got {err:?}");
}

#[test]
fn add_delegate_round_trip() {
    let Some(host) = live_host() else { return };

    let add = host.create_delegate("Test", "Test.TestClass", "Add").unwrap();
    let add: unsafe extern "C" fn(i32, i32) -> i32 = unsafe { add.cast() };

    assert_eq!(unsafe { add(2, 2) }, 4);
    assert_eq!(unsafe { add(-3, 10) }, 7);
}

#[test]
fn string_delegate_round_trip() {
    let Some(host) = live_host() else { return };

    let string = host
        .create_delegate("Test", "Test.TestClass", "String")
        .unwrap();
    let string: unsafe extern "C" fn() -> *const libc::c_char = unsafe { string.cast() };

    let returned = unsafe { CStr::from_ptr(string()) };
    assert_eq!(returned.to_str().unwrap(), "teststring");
}

#[test]
fn second_host_is_rejected_while_runtime_is_live() {
    let Some(_host) = live_host() else { return };

    let second = RuntimeHost::new();
    let err = second.initialize(HostConfig::new()).unwrap_err();
    assert!(matches!(err, Error::AlreadyInitialized), "got {err:?}");
}

#[test]
fn setup_delegates_runs_after_initialize() {
    // Exercises the deferred-callback path without a live runtime: the continuation
    // must not fire when initialization fails.
    let dir = tempfile::tempdir().unwrap();
    let host = RuntimeHost::new();

    host.setup_delegates(|_| panic!("setup must not run when initialize fails"))
        .unwrap();

    let config = HostConfig::new().with_clr_files_path(dir.path().to_string_lossy());
    assert!(host.initialize(config).is_err());
}
