use std::process::Command;

use heatmap_core::{Change, GerritConfig, HeatmapError};

/// Options passed as `--<name>` flags to `gerrit query`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Include the current patch set (revision, ref, approvals).
    pub current_patch_set: bool,
    /// Include the files of the current patch set.
    pub files: bool,
    /// Include the changes each change depends on.
    pub dependencies: bool,
}

/// Gerrit ssh query client.
///
/// # Examples
///
/// ```
/// use heatmap_core::GerritConfig;
/// use heatmap_review::gerrit::{heatmap_terms, GerritClient, QueryOptions};
///
/// let config = GerritConfig::default();
/// let client = GerritClient::new(&config);
/// let opts = QueryOptions { current_patch_set: true, ..QueryOptions::default() };
/// let args = client.command_args(&heatmap_terms(&config), opts, None);
/// assert_eq!(args[..3], ["-p", "29418", "review.openstack.org"]);
/// assert!(args.contains(&"--current-patch-set".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct GerritClient {
    host: String,
    port: u16,
}

impl GerritClient {
    /// Client for the host and port in `config`.
    pub fn new(config: &GerritConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }

    /// Arguments for `ssh` running one page of the query.
    pub fn command_args(
        &self,
        terms: &[String],
        options: QueryOptions,
        resume_sort_key: Option<&str>,
    ) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.port.to_string(),
            self.host.clone(),
            "gerrit".into(),
            "query".into(),
            "--format=JSON".into(),
        ];
        if options.current_patch_set {
            args.push("--current-patch-set".into());
        }
        if options.files {
            args.push("--files".into());
        }
        if options.dependencies {
            args.push("--dependencies".into());
        }
        args.push("--".into());
        args.extend(terms.iter().cloned());
        if let Some(key) = resume_sort_key {
            args.push(format!("resume_sortkey:{key}"));
        }
        args
    }

    /// Lazily stream every change matching `terms`, one page at a time.
    ///
    /// Stops after `limit` changes unless `limit` is 0.
    pub fn query(&self, terms: Vec<String>, options: QueryOptions, limit: usize) -> ChangeQuery<'_> {
        ChangeQuery {
            client: self,
            terms,
            options,
            limit,
            rows: 0,
            sort_key: None,
            page: Vec::new().into_iter(),
            exhausted: false,
        }
    }

    fn run_page(&self, args: &[String]) -> Result<String, HeatmapError> {
        let output = Command::new("ssh")
            .args(args)
            .output()
            .map_err(|e| HeatmapError::Gerrit(format!("failed to run ssh: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HeatmapError::Gerrit(format!(
                "query on {} failed: {}",
                self.host,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| HeatmapError::Gerrit(format!("invalid UTF-8 in query output: {e}")))
    }
}

/// Query terms selecting the open and merged changes of the configured
/// project and branch.
pub fn heatmap_terms(config: &GerritConfig) -> Vec<String> {
    vec![
        format!("project:{}", config.project),
        format!("branch:{}", config.branch),
        "-status:workinprogress".into(),
        "-status:abandoned".into(),
    ]
}

/// Query terms selecting the open changes of the configured project and branch.
pub fn open_terms(config: &GerritConfig) -> Vec<String> {
    vec![
        format!("project:{}", config.project),
        format!("branch:{}", config.branch),
        "is:open".into(),
    ]
}

/// One page of query output.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Change rows in output order.
    pub changes: Vec<Change>,
    /// `rowCount` of the trailing stats row, if there was one.
    pub row_count: Option<u64>,
}

/// Decode newline-delimited JSON query output.
///
/// # Errors
///
/// Returns [`HeatmapError::Gerrit`] naming the line that is not valid JSON or
/// not a change.
///
/// # Examples
///
/// ```
/// use heatmap_review::gerrit::parse_page;
///
/// let page = parse_page(r#"{"type":"stats","rowCount":0,"runTimeMilliseconds":3}"#).unwrap();
/// assert!(page.changes.is_empty());
/// assert_eq!(page.row_count, Some(0));
/// ```
pub fn parse_page(output: &str) -> Result<Page, HeatmapError> {
    let mut page = Page::default();
    for (i, line) in output.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| HeatmapError::Gerrit(format!("line {}: invalid JSON: {e}", i + 1)))?;

        if value.get("type").and_then(|t| t.as_str()) == Some("stats") {
            page.row_count = value.get("rowCount").and_then(|c| c.as_u64());
            continue;
        }

        let change = serde_json::from_value(value)
            .map_err(|e| HeatmapError::Gerrit(format!("line {}: not a change: {e}", i + 1)))?;
        page.changes.push(change);
    }
    Ok(page)
}

/// Iterator over the changes of a query; see [`GerritClient::query`].
pub struct ChangeQuery<'a> {
    client: &'a GerritClient,
    terms: Vec<String>,
    options: QueryOptions,
    limit: usize,
    rows: usize,
    sort_key: Option<String>,
    page: std::vec::IntoIter<Change>,
    exhausted: bool,
}

impl ChangeQuery<'_> {
    fn fetch_page(&mut self) -> Result<(), HeatmapError> {
        let args = self
            .client
            .command_args(&self.terms, self.options, self.sort_key.as_deref());
        let page = parse_page(&self.client.run_page(&args)?)?;

        let next_key = page.changes.last().and_then(|c| c.sort_key.clone());
        if page.row_count == Some(0) || page.changes.is_empty() || next_key.is_none() {
            self.exhausted = true;
        }
        self.sort_key = next_key;
        self.page = page.changes.into_iter();
        Ok(())
    }
}

impl Iterator for ChangeQuery<'_> {
    type Item = Result<Change, HeatmapError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.limit > 0 && self.rows >= self.limit {
                return None;
            }
            if let Some(change) = self.page.next() {
                self.rows += 1;
                return Some(Ok(change));
            }
            if self.exhausted {
                return None;
            }
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
    }
}
