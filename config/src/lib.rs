//! Lint settings: the validated model and its TOML loader.
//!
//! Hosts usually push settings over their own channel; the loader here is
//! for the binary and for hosts that keep settings on disk.

mod loader;
mod settings;

pub use loader::{ConfigError, default_config_path, load_settings};
pub use settings::{
    AutoFixOnSave, DEFAULT_DEBOUNCE_MS, LintSettings, PackageManager, RunTrigger, SettingsError,
    compile_globs,
};
