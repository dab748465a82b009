use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("Multiple files ({}) would be written to {target}", .sources.join(", "))]
    Collision { target: String, sources: Vec<String> },
    #[error("Target {target} already exists for source {source_name}")]
    TargetExists { target: String, source_name: String },
    #[error("Unknown special reference: `{0}`")]
    UnknownReference(String),
    #[error("Group reference \\{group} is out of range: the regular expression has {available} group(s)")]
    GroupOutOfRange { group: usize, available: usize },
    #[error("Index for entry {source_name} would be negative ({value}); adjust --index-first or --index-step")]
    NegativeIndex { source_name: String, value: i128 },
    #[error("Invalid regular expression: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl RenameError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Errors found while planning, before anything on disk was touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Collision { .. }
                | Self::TargetExists { .. }
                | Self::UnknownReference(_)
                | Self::GroupOutOfRange { .. }
                | Self::NegativeIndex { .. }
        )
    }

    pub fn status_code(&self) -> u8 {
        if self.is_validation() {
            1
        } else {
            2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_message_lists_every_source() {
        let err = RenameError::Collision {
            target: "Brand1q".to_string(),
            sources: vec!["CaSe1q".to_string(), "case1q".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Multiple files (CaSe1q, case1q) would be written to Brand1q"
        );
        assert_eq!(err.status_code(), 1);
    }

    #[test]
    fn io_errors_are_unexpected() {
        let err = RenameError::io(
            "cannot list directory",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_validation());
        assert_eq!(err.status_code(), 2);
        assert!(err.to_string().starts_with("cannot list directory: "));
    }

    #[test]
    fn invalid_pattern_is_unexpected() {
        let err = RenameError::from(regex::Regex::new("(").expect_err("must fail"));
        assert_eq!(err.status_code(), 2);
    }
}
