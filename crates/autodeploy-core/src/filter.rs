//! Repository and branch filtering for push events.

use crate::{FilterError, PushEvent};

/// A git ref split into its namespace and name.
///
/// `refs/heads/master` has branch `master`. Everything after the second `/`
/// is the name, so `refs/heads/feature/login` yields `feature/login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRef {
    namespace: String,
    branch: String,
}

impl GitRef {
    /// Parse a ref. Fewer than three `/`-separated segments, or an empty
    /// third segment, is an `InvalidRef`.
    pub fn parse(r#ref: &str) -> Result<Self, FilterError> {
        let mut segments = r#ref.splitn(3, '/');
        match (segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(namespace), Some(branch)) if !branch.is_empty() => Ok(Self {
                namespace: namespace.to_string(),
                branch: branch.to_string(),
            }),
            _ => Err(FilterError::InvalidRef(r#ref.to_string())),
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Second segment of the ref, e.g. `heads` or `tags`.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl std::str::FromStr for GitRef {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for GitRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "refs/{}/{}", self.namespace, self.branch)
    }
}

/// What intake should do with a parsed push event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    /// Configured repository and branch: hand the event to the deploy worker.
    Deploy { branch: String },
    /// Configured repository, another branch. Nothing to do.
    OtherBranch { branch: String },
    /// A repository this endpoint was never meant to receive.
    ForeignRepository { expected: String, actual: String },
}

/// Decides whether a push targets the configured repository and branch.
#[derive(Debug, Clone)]
pub struct EventFilter {
    repository: String,
    branch: String,
}

impl EventFilter {
    pub fn new(repository: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            branch: branch.into(),
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Repository is compared first, so a foreign repository is reported
    /// even when its ref is unusable.
    pub fn evaluate(&self, event: &PushEvent) -> Result<FilterDecision, FilterError> {
        if event.repository_name() != self.repository {
            return Ok(FilterDecision::ForeignRepository {
                expected: self.repository.clone(),
                actual: event.repository_name().to_string(),
            });
        }

        let git_ref = GitRef::parse(&event.r#ref)?;
        if self.is_deploy_branch(&git_ref) {
            Ok(FilterDecision::Deploy {
                branch: git_ref.branch,
            })
        } else {
            Ok(FilterDecision::OtherBranch {
                branch: git_ref.branch,
            })
        }
    }

    pub fn is_deploy_branch(&self, git_ref: &GitRef) -> bool {
        git_ref.branch() == self.branch
    }
}
