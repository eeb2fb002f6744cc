//! Host configuration for embedding the runtime.
//!
//! [`HostConfig`] carries the initialization parameters the native runtime expects:
//! the host executable path, an application-domain friendly name, the runtime property
//! map, the entry managed assembly, and an optional explicit runtime image directory.
//! Every field has a defined default filled in during
//! [`RuntimeHost::initialize`](crate::RuntimeHost::initialize); once passed to
//! `initialize`, a configuration is immutable for the life of that host instance.

use std::collections::HashMap;

use crate::Result;

/// The application-domain friendly name used when the caller does not supply one.
pub const DEFAULT_APP_DOMAIN_NAME: &str = "app";

/// Runtime property key naming the directories probed for managed assemblies.
pub const APP_PATHS: &str = "APP_PATHS";

/// Runtime property key naming the directories probed for native support libraries.
pub const NATIVE_DLL_SEARCH_DIRECTORIES: &str = "NATIVE_DLL_SEARCH_DIRECTORIES";

/// Initialization parameters for an embedded runtime.
///
/// All fields default to empty; [`RuntimeHost::initialize`](crate::RuntimeHost::initialize)
/// fills the documented defaults for anything left unset, never overriding a
/// caller-supplied non-empty value.
///
/// # Examples
///
/// ```rust
/// use clrhost::HostConfig;
///
/// let config = HostConfig::new()
///     .with_app_domain_name("my-host")
///     .with_property("APP_PATHS", "/opt/myapp/assemblies");
/// ```
#[derive(Debug, Clone, Default)]
pub struct HostConfig {
    /// Path of the host process image. Defaults to the current executable path.
    pub exe_path: String,
    /// Friendly name for the default application domain. Defaults to
    /// [`DEFAULT_APP_DOMAIN_NAME`].
    pub app_domain_name: String,
    /// Runtime properties passed to the native initialize call. Keys are unique,
    /// order is irrelevant. When both [`APP_PATHS`] and
    /// [`NATIVE_DLL_SEARCH_DIRECTORIES`] are absent, both default to the
    /// executable's containing directory.
    pub properties: HashMap<String, String>,
    /// Absolute path to the entry managed assembly. May be empty when the host
    /// only creates delegates into already-resolvable assemblies.
    pub managed_assembly_path: String,
    /// Explicit runtime image directory. When empty, the host discovers an
    /// installed image via [`sdk::locate_current`](crate::sdk::locate_current).
    pub clr_files_path: String,
}

impl HostConfig {
    /// Creates an empty configuration; defaults are filled during initialization.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host executable path.
    #[must_use]
    pub fn with_exe_path(mut self, path: impl Into<String>) -> Self {
        self.exe_path = path.into();
        self
    }

    /// Sets the application-domain friendly name.
    #[must_use]
    pub fn with_app_domain_name(mut self, name: impl Into<String>) -> Self {
        self.app_domain_name = name.into();
        self
    }

    /// Sets one runtime property, replacing any previous value for the key.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Sets the absolute path of the entry managed assembly.
    #[must_use]
    pub fn with_managed_assembly(mut self, path: impl Into<String>) -> Self {
        self.managed_assembly_path = path.into();
        self
    }

    /// Pins the runtime image directory, bypassing discovery.
    ///
    /// The directory is passed to the native layer verbatim; no existence check is
    /// performed beyond what the native load itself does.
    #[must_use]
    pub fn with_clr_files_path(mut self, path: impl Into<String>) -> Self {
        self.clr_files_path = path.into();
        self
    }

    /// Fills the documented defaults for unset fields.
    ///
    /// Idempotent: calling this on an already-defaulted configuration changes
    /// nothing, and caller-supplied non-empty values are never overridden.
    pub(crate) fn fill_defaults(&mut self) -> Result<()> {
        if self.exe_path.is_empty() {
            self.exe_path = std::env::current_exe()?.to_string_lossy().into_owned();
        }

        if self.app_domain_name.is_empty() {
            self.app_domain_name = DEFAULT_APP_DOMAIN_NAME.to_string();
        }

        let app_paths_unset = self
            .properties
            .get(APP_PATHS)
            .map_or(true, |v| v.is_empty());
        let native_dirs_unset = self
            .properties
            .get(NATIVE_DLL_SEARCH_DIRECTORIES)
            .map_or(true, |v| v.is_empty());

        // The common case is assemblies sitting next to the host binary.
        if app_paths_unset && native_dirs_unset {
            let exe_dir = std::path::Path::new(&self.exe_path)
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();

            self.properties.insert(APP_PATHS.to_string(), exe_dir.clone());
            self.properties
                .insert(NATIVE_DLL_SEARCH_DIRECTORIES.to_string(), exe_dir);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_exe_path_and_domain_name() {
        let mut config = HostConfig::new();
        config.fill_defaults().unwrap();

        assert!(!config.exe_path.is_empty());
        assert_eq!(config.app_domain_name, DEFAULT_APP_DOMAIN_NAME);
    }

    #[test]
    fn test_defaults_fill_search_paths_with_exe_dir() {
        let mut config = HostConfig::new().with_exe_path("/opt/myapp/bin/host");
        config.fill_defaults().unwrap();

        assert_eq!(config.properties[APP_PATHS], "/opt/myapp/bin");
        assert_eq!(
            config.properties[NATIVE_DLL_SEARCH_DIRECTORIES],
            "/opt/myapp/bin"
        );
    }

    #[test]
    fn test_defaults_do_not_override_caller_values() {
        let mut config = HostConfig::new()
            .with_exe_path("/opt/myapp/bin/host")
            .with_app_domain_name("custom")
            .with_property(APP_PATHS, "/opt/assemblies");
        config.fill_defaults().unwrap();

        assert_eq!(config.app_domain_name, "custom");
        assert_eq!(config.properties[APP_PATHS], "/opt/assemblies");
        // APP_PATHS was supplied, so NATIVE_DLL_SEARCH_DIRECTORIES is left alone.
        assert!(!config.properties.contains_key(NATIVE_DLL_SEARCH_DIRECTORIES));
    }

    #[test]
    fn test_defaults_are_idempotent() {
        let mut config = HostConfig::new().with_exe_path("/opt/myapp/bin/host");
        config.fill_defaults().unwrap();
        let first = config.clone();
        config.fill_defaults().unwrap();

        assert_eq!(config.exe_path, first.exe_path);
        assert_eq!(config.properties, first.properties);
    }

    #[test]
    fn test_empty_string_properties_count_as_unset() {
        let mut config = HostConfig::new()
            .with_exe_path("/opt/myapp/bin/host")
            .with_property(APP_PATHS, "")
            .with_property(NATIVE_DLL_SEARCH_DIRECTORIES, "");
        config.fill_defaults().unwrap();

        assert_eq!(config.properties[APP_PATHS], "/opt/myapp/bin");
        assert_eq!(
            config.properties[NATIVE_DLL_SEARCH_DIRECTORIES],
            "/opt/myapp/bin"
        );
    }
}
