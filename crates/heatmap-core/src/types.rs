use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::HeatmapError;

/// A change as reported by the review service's JSON query output.
///
/// Only the fields the heat map needs are decoded; everything else in the
/// row is ignored.
///
/// # Examples
///
/// ```
/// use heatmap_core::Change;
///
/// let row = r#"{"id":"I1","subject":"Fix","status":"NEW",
///     "currentPatchSet":{"revision":"abc","ref":"refs/changes/01/1/2","createdOn":100}}"#;
/// let change: Change = serde_json::from_str(row).unwrap();
/// assert_eq!(change.current_patch_set.created_on, 100);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    /// Change identifier (`I…` Change-Id).
    pub id: String,
    /// First line of the commit message.
    #[serde(default)]
    pub subject: String,
    /// Web URL of the change.
    #[serde(default)]
    pub url: Option<String>,
    /// Raw status string (`NEW`, `MERGED`, ...).
    pub status: String,
    /// Pagination key used to resume the query after this row.
    #[serde(default)]
    pub sort_key: Option<String>,
    /// Uploader of the change.
    #[serde(default)]
    pub owner: Account,
    /// Unix timestamp of the last update.
    #[serde(default, deserialize_with = "timestamp")]
    pub last_updated: i64,
    /// Changes this one is based on, present only with `--dependencies`.
    #[serde(default)]
    pub depends_on: Vec<Dependency>,
    /// The latest patch set of the change.
    pub current_patch_set: PatchSet,
}

impl Change {
    /// Interpret the raw status string.
    ///
    /// # Errors
    ///
    /// Returns [`HeatmapError::UnknownChangeStatus`] for anything other than
    /// open or merged.
    pub fn status(&self) -> Result<ChangeStatus, HeatmapError> {
        self.status
            .parse()
            .map_err(|_| HeatmapError::UnknownChangeStatus {
                change: self.id.clone(),
                status: self.status.clone(),
            })
    }
}

/// A user account of the review service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    /// Full name.
    #[serde(default)]
    pub name: Option<String>,
    /// Login name.
    #[serde(default)]
    pub username: Option<String>,
}

impl Account {
    /// Login name, falling back to the full name.
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or_default()
    }
}

/// Another change a change depends on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    /// Change identifier of the dependency.
    pub id: String,
}

/// One revision of a change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchSet {
    /// Commit SHA of the patch set.
    pub revision: String,
    /// Fetchable ref, e.g. `refs/changes/34/1234/5`.
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Unix timestamp of the patch set upload.
    #[serde(deserialize_with = "timestamp")]
    pub created_on: i64,
    /// Review votes on this patch set.
    #[serde(default)]
    pub approvals: Vec<Approval>,
    /// Files touched, present only when the query asked for them.
    #[serde(default)]
    pub files: Vec<PatchFile>,
}

impl PatchSet {
    /// The first approval of the given type, in the order the service lists them.
    pub fn first_approval(&self, kind: &str) -> Option<&Approval> {
        self.approvals.iter().find(|a| a.kind == kind)
    }
}

/// A review vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    /// Label short name, e.g. `APRV`, `CRVW`, `Verified`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Unix timestamp of the vote.
    #[serde(deserialize_with = "timestamp")]
    pub granted_on: i64,
}

/// A file listed on a patch set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchFile {
    /// Repository-relative path; `/COMMIT_MSG` denotes the commit message.
    pub file: String,
}

/// Review state of a change, as far as the heat map is concerned.
///
/// # Examples
///
/// ```
/// use heatmap_core::ChangeStatus;
///
/// assert_eq!("NEW".parse::<ChangeStatus>().unwrap(), ChangeStatus::Open);
/// assert_eq!("merged".parse::<ChangeStatus>().unwrap(), ChangeStatus::Merged);
/// assert!("ABANDONED".parse::<ChangeStatus>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    /// Pending review.
    Open,
    /// Approved and merged.
    Merged,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeStatus::Open => write!(f, "open"),
            ChangeStatus::Merged => write!(f, "merged"),
        }
    }
}

impl FromStr for ChangeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" | "open" => Ok(ChangeStatus::Open),
            "MERGED" | "merged" => Ok(ChangeStatus::Merged),
            other => Err(format!("unknown change status: {other}")),
        }
    }
}

/// Older service versions emit timestamps as strings.
fn timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(v) => Ok(v),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
