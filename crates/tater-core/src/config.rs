//! Bundle configuration and validation.

use crate::runtime::{Runtime, checks};
use path_clean::PathClean;
use std::path::{Component, Path, PathBuf};

/// Which scripts get their `CSS_*` class constants rewritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum JsClassScope {
    /// Every inline and linked script
    #[default]
    Everywhere,
    /// Only scripts loaded from a file with this name
    File(String),
}

impl JsClassScope {
    /// Whether a script from `source` (None for inline scripts) is in scope.
    pub fn applies_to(&self, source: Option<&Path>) -> bool {
        match self {
            JsClassScope::Everywhere => true,
            JsClassScope::File(name) => source
                .and_then(|p| p.file_name())
                .is_some_and(|f| f == name.as_str()),
        }
    }
}

/// Configuration errors, all detected before any bundling starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Source directory does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Source path is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),

    #[error("Source directory is not readable: {}", .0.display())]
    SourceNotReadable(PathBuf),

    #[error("Destination directory is not empty: {}", .0.display())]
    DestinationNotEmpty(PathBuf),

    #[error("Destination path is not a directory: {}", .0.display())]
    DestinationNotDirectory(PathBuf),

    #[error("Destination directory cannot be created: {}", .0.display())]
    DestinationNotCreatable(PathBuf),

    #[error("Destination directory is not readable: {}", .0.display())]
    DestinationNotReadable(PathBuf),

    #[error("Destination {} lies inside source {}", .dst.display(), .src.display())]
    DestinationInsideSource { src: PathBuf, dst: PathBuf },

    #[error("Source {} lies inside destination {}", .src.display(), .dst.display())]
    SourceInsideDestination { src: PathBuf, dst: PathBuf },

    #[error("Localization file does not exist: {}", .0.display())]
    LangFileMissing(PathBuf),

    #[error("Localization file is not a readable file: {}", .0.display())]
    LangFileNotReadable(PathBuf),

    #[error("Invalid localization file {}: {message}", .path.display())]
    LangFileInvalid { path: PathBuf, message: String },

    #[error("Assets directory must be relative without '..': {}", .0.display())]
    InvalidAssetsDir(PathBuf),
}

impl ConfigError {
    /// One-line suggestion for fixing the problem.
    pub fn hint(&self) -> String {
        match self {
            ConfigError::SourceMissing(_)
            | ConfigError::SourceNotDirectory(_)
            | ConfigError::SourceNotReadable(_) => {
                "Pass the directory containing your HTML entry points with --src.".to_string()
            }
            ConfigError::DestinationNotEmpty(_) => {
                "Use --force-delete-dst to replace the existing destination directory."
                    .to_string()
            }
            ConfigError::DestinationNotDirectory(_)
            | ConfigError::DestinationNotCreatable(_)
            | ConfigError::DestinationNotReadable(_) => {
                "Choose a destination whose parent directory exists and is writable.".to_string()
            }
            ConfigError::DestinationInsideSource { .. } => {
                "Place the destination directory outside the source tree.".to_string()
            }
            ConfigError::SourceInsideDestination { .. } => {
                "The destination is replaced on every run; keep sources outside it.".to_string()
            }
            ConfigError::LangFileMissing(_) | ConfigError::LangFileNotReadable(_) => {
                "Check the path passed with --lang.".to_string()
            }
            ConfigError::LangFileInvalid { .. } => {
                "The localization file must be a flat JSON object of string values, e.g. {\"title\": \"Hi\"}."
                    .to_string()
            }
            ConfigError::InvalidAssetsDir(_) => {
                "Use a relative path such as 'assets' for --assets-dir.".to_string()
            }
        }
    }
}

/// What to bundle and where.
#[derive(Debug, Clone)]
pub struct BundleConfig {
    /// Directory holding the HTML entry points
    pub src_dir: PathBuf,
    /// Output directory, mirrors entry file names
    pub dst_dir: PathBuf,
    /// Directory under `dst_dir` that receives renamed assets
    pub assets_dir: PathBuf,
    /// Delete an existing destination before writing
    pub force_delete_dst: bool,
    /// Flat JSON object used for `#lang#KEY#` placeholders
    pub lang_file: Option<PathBuf>,
    pub js_class_scope: JsClassScope,
    /// Run the CSS minifier and JS compiler over the bundles
    pub minify: bool,
}

impl BundleConfig {
    pub fn new(src_dir: impl Into<PathBuf>, dst_dir: impl Into<PathBuf>) -> Self {
        Self {
            src_dir: src_dir.into(),
            dst_dir: dst_dir.into(),
            assets_dir: PathBuf::new(),
            force_delete_dst: false,
            lang_file: None,
            js_class_scope: JsClassScope::Everywhere,
            minify: true,
        }
    }

    pub fn assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = dir.into();
        self
    }

    pub fn force_delete_dst(mut self, force: bool) -> Self {
        self.force_delete_dst = force;
        self
    }

    pub fn lang_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.lang_file = Some(path.into());
        self
    }

    pub fn js_class_scope(mut self, scope: JsClassScope) -> Self {
        self.js_class_scope = scope;
        self
    }

    pub fn minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    /// Absolute directory that receives renamed assets.
    pub fn asset_output_dir(&self) -> PathBuf {
        self.dst_dir.join(&self.assets_dir).clean()
    }

    /// URL prefix for renamed assets as referenced from output documents.
    pub fn asset_url_prefix(&self) -> String {
        self.assets_dir
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Check every path before any work starts.
    ///
    /// Does not touch the filesystem beyond reads; deleting a forced
    /// destination is left to the bundler.
    pub async fn validate(&self, runtime: &dyn Runtime) -> Result<(), ConfigError> {
        let src = &self.src_dir;
        if !runtime.exists(src) {
            return Err(ConfigError::SourceMissing(src.clone()));
        }
        if !checks::is_dir(runtime, src).await {
            return Err(ConfigError::SourceNotDirectory(src.clone()));
        }
        if !checks::is_readable(runtime, src) {
            return Err(ConfigError::SourceNotReadable(src.clone()));
        }

        let dst = &self.dst_dir;
        let (abs_src, abs_dst) = (absolutize(src), absolutize(dst));
        if abs_dst.starts_with(&abs_src) {
            return Err(ConfigError::DestinationInsideSource {
                src: src.clone(),
                dst: dst.clone(),
            });
        }
        if abs_src.starts_with(&abs_dst) {
            return Err(ConfigError::SourceInsideDestination {
                src: src.clone(),
                dst: dst.clone(),
            });
        }

        if runtime.exists(dst) {
            if !checks::is_dir(runtime, dst).await {
                return Err(ConfigError::DestinationNotDirectory(dst.clone()));
            }
            if !self.force_delete_dst {
                let entries = runtime
                    .read_dir(dst)
                    .await
                    .map_err(|_| ConfigError::DestinationNotReadable(dst.clone()))?;
                if !entries.is_empty() {
                    return Err(ConfigError::DestinationNotEmpty(dst.clone()));
                }
            }
            if !checks::is_writable(runtime, dst) && !self.force_delete_dst {
                return Err(ConfigError::DestinationNotCreatable(dst.clone()));
            }
        } else if !checks::can_be_created(runtime, &abs_dst).await {
            return Err(ConfigError::DestinationNotCreatable(dst.clone()));
        }

        if let Some(lang) = &self.lang_file {
            if !runtime.exists(lang) {
                return Err(ConfigError::LangFileMissing(lang.clone()));
            }
            if !checks::is_file(runtime, lang).await || !checks::is_readable(runtime, lang) {
                return Err(ConfigError::LangFileNotReadable(lang.clone()));
            }
        }

        let escapes = self
            .assets_dir
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ConfigError::InvalidAssetsDir(self.assets_dir.clone()));
        }

        Ok(())
    }
}

/// Cleaned absolute form of `path`, relative to the working directory.
pub(crate) fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.clean();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path).clean(),
        Err(_) => path.clean(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::test_utils::MemoryRuntime;

    fn runtime() -> MemoryRuntime {
        let runtime = MemoryRuntime::new();
        runtime.insert_file("/work/site/index.html", "<p>");
        runtime.insert_dir("/work/out");
        runtime
    }

    #[tokio::test]
    async fn test_valid_config() {
        let config = BundleConfig::new("/work/site", "/work/dist").assets_dir("static/img");
        config.validate(&runtime()).await.unwrap();
        assert_eq!(config.asset_url_prefix(), "static/img");
        assert_eq!(config.asset_output_dir(), Path::new("/work/dist/static/img"));
    }

    #[tokio::test]
    async fn test_missing_source() {
        let config = BundleConfig::new("/work/nope", "/work/dist");
        let err = config.validate(&runtime()).await.unwrap_err();
        assert!(matches!(err, ConfigError::SourceMissing(_)));
    }

    #[tokio::test]
    async fn test_source_must_be_directory() {
        let config = BundleConfig::new("/work/site/index.html", "/work/dist");
        let err = config.validate(&runtime()).await.unwrap_err();
        assert!(matches!(err, ConfigError::SourceNotDirectory(_)));
    }

    #[tokio::test]
    async fn test_non_empty_destination_requires_force() {
        let runtime = runtime();
        runtime.insert_file("/work/out/old.html", "old");

        let config = BundleConfig::new("/work/site", "/work/out");
        let err = config.validate(&runtime).await.unwrap_err();
        assert!(matches!(err, ConfigError::DestinationNotEmpty(_)));
        assert!(err.hint().contains("--force-delete-dst"));

        config.force_delete_dst(true).validate(&runtime).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_existing_destination_is_fine() {
        let config = BundleConfig::new("/work/site", "/work/out");
        config.validate(&runtime()).await.unwrap();
    }

    #[tokio::test]
    async fn test_destination_inside_source() {
        let config = BundleConfig::new("/work/site", "/work/site/dist");
        let err = config.validate(&runtime()).await.unwrap_err();
        assert!(matches!(err, ConfigError::DestinationInsideSource { .. }));

        let config = BundleConfig::new("/work/site", "/work/site/../site");
        let err = config.validate(&runtime()).await.unwrap_err();
        assert!(matches!(err, ConfigError::DestinationInsideSource { .. }));
    }

    #[tokio::test]
    async fn test_source_inside_destination() {
        let runtime = runtime();
        runtime.insert_file("/work/out/site/index.html", "<p>");

        for force in [false, true] {
            let config = BundleConfig::new("/work/out/site", "/work/out").force_delete_dst(force);
            let err = config.validate(&runtime).await.unwrap_err();
            assert!(matches!(err, ConfigError::SourceInsideDestination { .. }));
        }
        assert!(runtime.exists(Path::new("/work/out/site/index.html")));
    }

    #[tokio::test]
    async fn test_unreadable_destination_is_not_treated_as_empty() {
        let runtime = runtime();
        runtime.fail_read_dir("/work/out");
        let config = BundleConfig::new("/work/site", "/work/out");
        let err = config.validate(&runtime).await.unwrap_err();
        assert!(matches!(err, ConfigError::DestinationNotReadable(_)));
    }

    #[tokio::test]
    async fn test_uncreatable_destination() {
        let runtime = runtime();
        runtime.set_read_only("/work");
        let config = BundleConfig::new("/work/site", "/work/dist");
        let err = config.validate(&runtime).await.unwrap_err();
        assert!(matches!(err, ConfigError::DestinationNotCreatable(_)));
    }

    #[tokio::test]
    async fn test_lang_file_checks() {
        let runtime = runtime();
        let config = BundleConfig::new("/work/site", "/work/dist").lang_file("/work/en.json");
        let err = config.validate(&runtime).await.unwrap_err();
        assert!(matches!(err, ConfigError::LangFileMissing(_)));

        let config = BundleConfig::new("/work/site", "/work/dist").lang_file("/work/site");
        let err = config.validate(&runtime).await.unwrap_err();
        assert!(matches!(err, ConfigError::LangFileNotReadable(_)));
    }

    #[tokio::test]
    async fn test_assets_dir_must_stay_inside_destination() {
        for dir in ["../assets", "/abs/assets", "a/../../b"] {
            let config = BundleConfig::new("/work/site", "/work/dist").assets_dir(dir);
            let err = config.validate(&runtime()).await.unwrap_err();
            assert!(matches!(err, ConfigError::InvalidAssetsDir(_)), "{dir}");
        }
    }

    #[test]
    fn test_empty_assets_dir_has_empty_prefix() {
        let config = BundleConfig::new("/work/site", "/work/dist");
        assert_eq!(config.asset_url_prefix(), "");
        assert_eq!(config.asset_output_dir(), Path::new("/work/dist"));
    }

    #[test]
    fn test_js_class_scope() {
        let scope = JsClassScope::File("classes.js".into());
        assert!(scope.applies_to(Some(Path::new("/site/js/classes.js"))));
        assert!(!scope.applies_to(Some(Path::new("/site/js/app.js"))));
        assert!(!scope.applies_to(None));
        assert!(JsClassScope::Everywhere.applies_to(None));
    }
}
