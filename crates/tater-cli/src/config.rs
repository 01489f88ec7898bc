//! Layered configuration.
//!
//! Priority: command-line flags > environment (`TATER_*`) > JSON config file
//! > defaults. `--src` and `--dst` are always given on the command line.

use crate::cli::Cli;
use crate::error::{ConfigError, Result};
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tater_core::{BundleConfig, JsClassScope};

/// Settings for one bundle run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaterConfig {
    pub src: PathBuf,
    pub dst: PathBuf,
    /// Relative directory under `dst` for renamed assets
    #[serde(default)]
    pub assets_dir: PathBuf,
    #[serde(default)]
    pub force_delete_dst: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_class_file: Option<String>,
    #[serde(default = "default_minify")]
    pub minify: bool,
}

fn default_minify() -> bool {
    true
}

impl Default for TaterConfig {
    fn default() -> Self {
        Self {
            src: PathBuf::new(),
            dst: PathBuf::new(),
            assets_dir: PathBuf::new(),
            force_delete_dst: false,
            lang: None,
            js_class_file: None,
            minify: default_minify(),
        }
    }
}

/// Only the flags that were actually given, so unset flags do not mask
/// lower layers.
#[derive(Debug, Serialize)]
struct CliOverrides {
    src: PathBuf,
    dst: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    assets_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    force_delete_dst: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lang: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    js_class_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    minify: Option<bool>,
}

impl From<&Cli> for CliOverrides {
    fn from(args: &Cli) -> Self {
        Self {
            src: args.src.clone(),
            dst: args.dst.clone(),
            assets_dir: args.assets_dir.clone(),
            force_delete_dst: args.force_delete_dst.then_some(true),
            lang: args.lang.clone(),
            js_class_file: args.js_class_file.clone(),
            minify: args.no_minify.then_some(false),
        }
    }
}

impl TaterConfig {
    /// Load configuration from every source.
    pub fn load(args: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = &args.config {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.clone()).into());
            }
            figment = figment.merge(Json::file(path));
        }

        figment = figment
            .merge(Env::prefixed("TATER_"))
            .merge(Serialized::defaults(CliOverrides::from(args)));

        figment.extract().map_err(|e| {
            ConfigError::InvalidValue {
                field: "configuration".to_string(),
                value: e.to_string(),
                hint: "Check the config file syntax and TATER_* environment variables"
                    .to_string(),
            }
            .into()
        })
    }

    /// Core configuration for this run.
    pub fn to_bundle_config(&self) -> BundleConfig {
        let mut config = BundleConfig::new(&self.src, &self.dst)
            .assets_dir(&self.assets_dir)
            .force_delete_dst(self.force_delete_dst)
            .minify(self.minify);
        if let Some(lang) = &self.lang {
            config = config.lang_file(lang);
        }
        if let Some(name) = &self.js_class_file {
            config = config.js_class_scope(JsClassScope::File(name.clone()));
        }
        config
    }
}
