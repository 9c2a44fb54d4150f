//! Resolved lint settings.
//!
//! Raw deserialization structs (with untagged unions and unchecked glob
//! strings) stay private here. [`LintSettings`] is resolved from them at the
//! parse boundary via `#[serde(try_from)]`, so holding one proves every
//! exclusion pattern compiled.

use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Deserialize;

/// Quiet period before a changed document is re-validated.
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

const MAX_DEBOUNCE_MS: u64 = 10_000;

const fn default_true() -> bool {
    true
}

const fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid exclude pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("auto_fix_on_save rule names must not be empty")]
    EmptyAutoFixRule,
    #[error("debounce_ms must be at most {max}, got {0}", max = MAX_DEBOUNCE_MS)]
    DebounceTooLong(u64),
}

/// When a changed document is re-validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunTrigger {
    /// Every content change schedules a (debounced) validation.
    #[default]
    OnType,
    /// Only saves schedule validation; edits clear the now-stale results.
    OnSave,
}

/// Package manager whose global install location is searched for the analyzer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Npm,
    Yarn,
}

/// Which auto-fixes a save-triggered "fix all" may apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AutoFixOnSave {
    #[default]
    Off,
    All,
    Rules(Vec<String>),
}

impl AutoFixOnSave {
    /// Whether a fix for `rule` takes part in a save-triggered fix-all.
    #[must_use]
    pub fn allows(&self, rule: &str) -> bool {
        match self {
            Self::Off | Self::All => true,
            Self::Rules(rules) => rules.iter().any(|r| r == rule),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Off)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPatterns {
    One(String),
    Many(Vec<String>),
}

impl Default for RawPatterns {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl RawPatterns {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(p) => vec![p],
            Self::Many(ps) => ps,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAutoFixOnSave {
    Toggle(bool),
    Rules(Vec<String>),
}

impl Default for RawAutoFixOnSave {
    fn default() -> Self {
        Self::Toggle(false)
    }
}

#[derive(Deserialize)]
struct RawLintSettings {
    #[serde(default = "default_true")]
    enable: bool,
    #[serde(default)]
    run: RunTrigger,
    #[serde(default)]
    js_enable: bool,
    #[serde(default = "default_true")]
    ignore_definition_files: bool,
    #[serde(default)]
    exclude: RawPatterns,
    #[serde(default = "default_true")]
    validate_with_default_config: bool,
    #[serde(default)]
    always_show_rule_failures_as_warnings: bool,
    #[serde(default)]
    auto_fix_on_save: RawAutoFixOnSave,
    #[serde(default)]
    config_file: Option<PathBuf>,
    #[serde(default)]
    rules_directory: Option<PathBuf>,
    #[serde(default)]
    package_manager: PackageManager,
    #[serde(default = "default_debounce_ms")]
    debounce_ms: u64,
}

/// Compile glob patterns the way the editor matches them: `*` stays within
/// one path segment, dot-files are matched.
pub fn compile_globs(patterns: &[String]) -> Result<GlobSet, SettingsError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob: Glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| SettingsError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| SettingsError::InvalidGlob {
        pattern: patterns.join(", "),
        source,
    })
}

/// Validated lint settings for one scope (a workspace folder or the whole
/// workspace).
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawLintSettings")]
pub struct LintSettings {
    enable: bool,
    run: RunTrigger,
    js_enable: bool,
    ignore_definition_files: bool,
    exclude_patterns: Vec<String>,
    exclude: GlobSet,
    validate_with_default_config: bool,
    always_show_rule_failures_as_warnings: bool,
    auto_fix_on_save: AutoFixOnSave,
    config_file: Option<PathBuf>,
    rules_directory: Option<PathBuf>,
    package_manager: PackageManager,
    debounce_ms: u64,
}

impl TryFrom<RawLintSettings> for LintSettings {
    type Error = SettingsError;

    fn try_from(raw: RawLintSettings) -> Result<Self, Self::Error> {
        if raw.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(SettingsError::DebounceTooLong(raw.debounce_ms));
        }
        let auto_fix_on_save = match raw.auto_fix_on_save {
            RawAutoFixOnSave::Toggle(false) => AutoFixOnSave::Off,
            RawAutoFixOnSave::Toggle(true) => AutoFixOnSave::All,
            RawAutoFixOnSave::Rules(rules) => {
                if rules.iter().any(|r| r.trim().is_empty()) {
                    return Err(SettingsError::EmptyAutoFixRule);
                }
                AutoFixOnSave::Rules(rules)
            }
        };
        let exclude_patterns = raw.exclude.into_vec();
        let exclude = compile_globs(&exclude_patterns)?;
        Ok(Self {
            enable: raw.enable,
            run: raw.run,
            js_enable: raw.js_enable,
            ignore_definition_files: raw.ignore_definition_files,
            exclude_patterns,
            exclude,
            validate_with_default_config: raw.validate_with_default_config,
            always_show_rule_failures_as_warnings: raw.always_show_rule_failures_as_warnings,
            auto_fix_on_save,
            config_file: raw.config_file,
            rules_directory: raw.rules_directory,
            package_manager: raw.package_manager,
            debounce_ms: raw.debounce_ms,
        })
    }
}

impl Default for LintSettings {
    fn default() -> Self {
        Self {
            enable: true,
            run: RunTrigger::OnType,
            js_enable: false,
            ignore_definition_files: true,
            exclude_patterns: Vec::new(),
            exclude: GlobSet::empty(),
            validate_with_default_config: true,
            always_show_rule_failures_as_warnings: false,
            auto_fix_on_save: AutoFixOnSave::Off,
            config_file: None,
            rules_directory: None,
            package_manager: PackageManager::Npm,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl LintSettings {
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enable
    }

    #[must_use]
    pub fn run(&self) -> RunTrigger {
        self.run
    }

    #[must_use]
    pub fn validate_with_default_config(&self) -> bool {
        self.validate_with_default_config
    }

    #[must_use]
    pub fn always_show_rule_failures_as_warnings(&self) -> bool {
        self.always_show_rule_failures_as_warnings
    }

    #[must_use]
    pub fn auto_fix_on_save(&self) -> &AutoFixOnSave {
        &self.auto_fix_on_save
    }

    #[must_use]
    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude_patterns
    }

    #[must_use]
    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    #[must_use]
    pub fn rules_directory(&self) -> Option<&Path> {
        self.rules_directory.as_deref()
    }

    #[must_use]
    pub fn package_manager(&self) -> PackageManager {
        self.package_manager
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Whether `path` is excluded from linting by these settings.
    #[must_use]
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.ignore_definition_files
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(".d.ts"))
        {
            return true;
        }
        self.exclude.is_match(path)
    }

    /// Whether documents of `language_id` are skipped.
    #[must_use]
    pub fn skips_language(&self, language_id: &str) -> bool {
        let is_js = matches!(language_id, "javascript" | "javascriptreact");
        is_js && !self.js_enable
    }
}
