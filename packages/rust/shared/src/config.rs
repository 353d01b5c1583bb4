//! Application configuration for the taxonomy builder.
//!
//! User config lives at `~/.taxonomy-builder/taxonomy.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TaxonomyError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "taxonomy.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".taxonomy-builder";

// ---------------------------------------------------------------------------
// Config structs (matching taxonomy.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Tracking-parameter policy for URL canonicalization.
    #[serde(default)]
    pub urls: UrlPolicy,

    /// Extraction settings.
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Named run profiles. Fields set here are layered over the built-in
    /// `dev`, `ci` and `prod` profiles of the same name.
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileOverrides>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Profile used when none is given on the command line.
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Directory for taxonomy/choices/rejected output files.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Base URL relative hrefs are resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Source tag stamped on documents.
    #[serde(default = "default_source")]
    pub source: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            output_dir: default_output_dir(),
            base_url: default_base_url(),
            source: default_source(),
        }
    }
}

fn default_profile() -> String {
    "dev".into()
}
fn default_output_dir() -> String {
    "./data".into()
}
fn default_base_url() -> String {
    "https://clutch.co".into()
}
fn default_source() -> String {
    "https://clutch.co/categories".into()
}

/// `[urls]` section: query parameters removed during canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPolicy {
    /// Any parameter starting with one of these (case-insensitive) is dropped.
    #[serde(default = "default_drop_prefixes")]
    pub drop_prefixes: Vec<String>,

    /// Parameters dropped by exact (case-insensitive) name.
    #[serde(default = "default_drop_keys")]
    pub drop_keys: Vec<String>,
}

impl Default for UrlPolicy {
    fn default() -> Self {
        Self {
            drop_prefixes: default_drop_prefixes(),
            drop_keys: default_drop_keys(),
        }
    }
}

impl UrlPolicy {
    /// Whether a query parameter named `key` is a tracking parameter.
    pub fn is_tracking(&self, key: &str) -> bool {
        let key = key.to_ascii_lowercase();
        self.drop_keys.iter().any(|k| k.eq_ignore_ascii_case(&key))
            || self
                .drop_prefixes
                .iter()
                .any(|p| key.starts_with(&p.to_ascii_lowercase()))
    }
}

fn default_drop_prefixes() -> Vec<String> {
    vec!["utm_".into(), "hsa_".into()]
}
fn default_drop_keys() -> Vec<String> {
    [
        "gclid", "fbclid", "mc_cid", "mc_eid", "_hsenc", "_hsmi", "ref", "ref_src", "ref_url",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[extract]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Selector strategies, tried in this order.
    #[serde(default = "default_strategies")]
    pub strategies: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
        }
    }
}

fn default_strategies() -> Vec<String> {
    vec!["section".into(), "list".into(), "generic".into()]
}

/// How malformed observations are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectMode {
    /// The first malformed observation fails the run.
    FailFast,
    /// Malformed observations go to the rejected channel; the run continues.
    #[default]
    Collect,
}

impl FromStr for RejectMode {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-fast" | "failfast" | "strict" => Ok(Self::FailFast),
            "collect" | "lenient" => Ok(Self::Collect),
            other => Err(TaxonomyError::config(format!(
                "unknown reject mode '{other}': expected 'fail-fast' or 'collect'"
            ))),
        }
    }
}

impl fmt::Display for RejectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FailFast => "fail-fast",
            Self::Collect => "collect",
        })
    }
}

/// `[profiles.<name>]` section. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_mode: Option<RejectMode>,

    /// Include "all in" links in the choices file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_all_in_choices: Option<bool>,

    /// Pretty-print JSON output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pretty: Option<bool>,
}

impl From<&ProfileConfig> for ProfileOverrides {
    fn from(profile: &ProfileConfig) -> Self {
        Self {
            reject_mode: Some(profile.reject_mode),
            include_all_in_choices: Some(profile.include_all_in_choices),
            pretty: Some(profile.pretty),
        }
    }
}

/// Settings of one resolved profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileConfig {
    pub reject_mode: RejectMode,
    pub include_all_in_choices: bool,
    pub pretty: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            reject_mode: RejectMode::default(),
            include_all_in_choices: false,
            pretty: default_true(),
        }
    }
}

impl ProfileConfig {
    /// Built-in profile settings, if `name` is one of `dev`, `ci`, `prod`.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "dev" => Some(Self {
                reject_mode: RejectMode::Collect,
                include_all_in_choices: true,
                pretty: true,
            }),
            "ci" => Some(Self {
                reject_mode: RejectMode::FailFast,
                include_all_in_choices: false,
                pretty: true,
            }),
            "prod" => Some(Self {
                reject_mode: RejectMode::Collect,
                include_all_in_choices: false,
                pretty: false,
            }),
            _ => None,
        }
    }

    /// Replace each field that `overrides` sets.
    pub fn with_overrides(self, overrides: &ProfileOverrides) -> Self {
        Self {
            reject_mode: overrides.reject_mode.unwrap_or(self.reject_mode),
            include_all_in_choices: overrides
                .include_all_in_choices
                .unwrap_or(self.include_all_in_choices),
            pretty: overrides.pretty.unwrap_or(self.pretty),
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Run config (runtime, merged from config + profile)
// ---------------------------------------------------------------------------

/// Runtime configuration for one pipeline run: merged from config file + profile.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the resolved profile.
    pub profile: String,
    pub base_url: Url,
    pub source: String,
    pub output_dir: PathBuf,
    pub reject_mode: RejectMode,
    pub include_all_in_choices: bool,
    pub pretty: bool,
    pub url_policy: UrlPolicy,
    pub strategies: Vec<String>,
}

impl RunConfig {
    /// Resolve `profile` (or the configured default) against `config`.
    pub fn resolve(config: &AppConfig, profile: Option<&str>) -> Result<Self> {
        let name = profile.unwrap_or(&config.defaults.profile).trim().to_ascii_lowercase();

        let settings = match (ProfileConfig::builtin(&name), config.profiles.get(&name)) {
            (Some(builtin), Some(overrides)) => builtin.with_overrides(overrides),
            (Some(builtin), None) => builtin,
            (None, Some(overrides)) => ProfileConfig::default().with_overrides(overrides),
            (None, None) => {
                return Err(TaxonomyError::config(format!("unknown profile '{name}'")));
            }
        };

        let base_url = Url::parse(&config.defaults.base_url).map_err(|e| {
            TaxonomyError::config(format!(
                "invalid base_url '{}': {e}",
                config.defaults.base_url
            ))
        })?;

        if config.extract.strategies.is_empty() {
            return Err(TaxonomyError::config("extract.strategies must not be empty"));
        }

        Ok(Self {
            profile: name,
            base_url,
            source: config.defaults.source.clone(),
            output_dir: PathBuf::from(&config.defaults.output_dir),
            reject_mode: settings.reject_mode,
            include_all_in_choices: settings.include_all_in_choices,
            pretty: settings.pretty,
            url_policy: config.urls.clone(),
            strategies: config.extract.strategies.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.taxonomy-builder/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TaxonomyError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.taxonomy-builder/taxonomy.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TaxonomyError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| TaxonomyError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TaxonomyError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let mut config = AppConfig::default();
    for name in ["dev", "ci", "prod"] {
        if let Some(profile) = ProfileConfig::builtin(name) {
            config
                .profiles
                .insert(name.to_string(), ProfileOverrides::from(&profile));
        }
    }
    let content =
        toml::to_string_pretty(&config).map_err(|e| TaxonomyError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TaxonomyError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
