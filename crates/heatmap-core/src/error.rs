/// Errors that can occur while building a heat map.
///
/// Every variant is fatal to a run: there is no partial-result mode. Library
/// crates return this type directly; the binary converts it to a
/// `miette::Report` at the boundary, which also renders the `help` text.
///
/// # Examples
///
/// ```
/// use heatmap_core::HeatmapError;
///
/// let err = HeatmapError::MissingApproval { change: "I1234".into() };
/// assert!(err.to_string().contains("I1234"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum HeatmapError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The working repository could not be opened or inspected.
    #[error("git error: {0}")]
    Git(String),

    /// The change query against the review service failed.
    #[error("gerrit query error: {0}")]
    Gerrit(String),

    /// A line expected to be a hunk header does not match
    /// `@@ -<start>[,<count>] +<start>[,<count>] @@`.
    #[error("malformed hunk header: {line}")]
    #[diagnostic(
        code(heatmap::malformed_hunk_header),
        help("remaining hunk lines:\n{context}")
    )]
    MalformedHunkHeader {
        /// The offending line.
        line: String,
        /// The hunk lines from the offending line onwards.
        context: String,
    },

    /// A change carries a status other than open or merged.
    #[error("unexpected status {status:?} on change {change}")]
    #[diagnostic(
        code(heatmap::unknown_status),
        help("only NEW (open) and MERGED changes can be aggregated; narrow the query")
    )]
    UnknownChangeStatus {
        /// Change identifier.
        change: String,
        /// The status as reported by the review service.
        status: String,
    },

    /// A merged change has no `APRV` approval to date its approval.
    #[error("merged change {change} has no APRV approval")]
    #[diagnostic(code(heatmap::missing_approval))]
    MissingApproval {
        /// Change identifier.
        change: String,
    },

    /// The diff text of a revision could not be produced.
    #[error("failed to retrieve diff for {revision}: {message}")]
    #[diagnostic(
        code(heatmap::diff_retrieval),
        help("check that the git remote in .heatmap.toml can fetch review refs")
    )]
    DiffRetrieval {
        /// Revision that was requested.
        revision: String,
        /// What went wrong.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: HeatmapError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = HeatmapError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn malformed_header_shows_line_and_carries_context() {
        let err = HeatmapError::MalformedHunkHeader {
            line: "@@ garbage".into(),
            context: "@@ garbage\n+x".into(),
        };
        assert_eq!(err.to_string(), "malformed hunk header: @@ garbage");
        let help = miette::Diagnostic::help(&err).unwrap().to_string();
        assert!(help.contains("+x"));
    }

    #[test]
    fn unknown_status_names_change_and_status() {
        let err = HeatmapError::UnknownChangeStatus {
            change: "I42".into(),
            status: "ABANDONED".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("I42"));
        assert!(msg.contains("\"ABANDONED\""));
    }
}
