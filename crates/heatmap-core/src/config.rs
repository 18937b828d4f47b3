use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HeatmapError;

/// Top-level configuration loaded from `.heatmap.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use heatmap_core::HeatmapConfig;
///
/// let config = HeatmapConfig::default();
/// assert_eq!(config.gerrit.port, 29418);
/// assert_eq!(config.tree.prune_segments, 1);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeatmapConfig {
    /// Review service connection and query settings.
    #[serde(default)]
    pub gerrit: GerritConfig,
    /// Local repository settings.
    #[serde(default)]
    pub git: GitConfig,
    /// Path tree settings.
    #[serde(default)]
    pub tree: TreeConfig,
}

impl HeatmapConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HeatmapError::Io`] if the file cannot be read, or
    /// [`HeatmapError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use heatmap_core::HeatmapConfig;
    /// use std::path::Path;
    ///
    /// let config = HeatmapConfig::from_file(Path::new(".heatmap.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, HeatmapError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`HeatmapError::Toml`] if parsing fails, or
    /// [`HeatmapError::Config`] if a value is unusable.
    ///
    /// # Examples
    ///
    /// ```
    /// use heatmap_core::HeatmapConfig;
    ///
    /// let toml = r#"
    /// [gerrit]
    /// project = "openstack/cinder"
    /// "#;
    /// let config = HeatmapConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.gerrit.project, "openstack/cinder");
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, HeatmapError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would produce an empty query or fetch.
    ///
    /// # Errors
    ///
    /// Returns [`HeatmapError::Config`] naming the first offending key.
    pub fn validate(&self) -> Result<(), HeatmapError> {
        let required = [
            ("gerrit.host", &self.gerrit.host),
            ("gerrit.project", &self.gerrit.project),
            ("gerrit.branch", &self.gerrit.branch),
            ("git.remote", &self.git.remote),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(HeatmapError::Config(format!("{key} must not be empty")));
            }
        }
        if self.gerrit.port == 0 {
            return Err(HeatmapError::Config("gerrit.port must not be 0".into()));
        }
        Ok(())
    }
}

/// Gerrit connection and query configuration.
///
/// # Examples
///
/// ```
/// use heatmap_core::GerritConfig;
///
/// let config = GerritConfig::default();
/// assert_eq!(config.host, "review.openstack.org");
/// assert_eq!(config.limit, 1000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GerritConfig {
    /// SSH host of the review service.
    #[serde(default = "default_host")]
    pub host: String,
    /// SSH port of the review service (default: 29418).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Project whose changes are aggregated.
    #[serde(default = "default_project")]
    pub project: String,
    /// Target branch of the changes.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Stop after this many changes; 0 means no limit (default: 1000).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_host() -> String {
    "review.openstack.org".into()
}

fn default_port() -> u16 {
    29418
}

fn default_project() -> String {
    "openstack/nova".into()
}

fn default_branch() -> String {
    "master".into()
}

fn default_limit() -> usize {
    1000
}

impl Default for GerritConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            project: default_project(),
            branch: default_branch(),
            limit: default_limit(),
        }
    }
}

/// Local repository configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Remote used to fetch patch set refs that are missing locally.
    #[serde(default = "default_remote")]
    pub remote: String,
}

fn default_remote() -> String {
    "gerrit".into()
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
        }
    }
}

/// Path tree configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Leading segments dropped from diff paths, e.g. the `a/` of `a/src/lib.rs`
    /// (default: 1).
    #[serde(default = "default_prune_segments")]
    pub prune_segments: usize,
}

fn default_prune_segments() -> usize {
    1
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            prune_segments: default_prune_segments(),
        }
    }
}
