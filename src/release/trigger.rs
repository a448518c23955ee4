//! What started this publication, and whether it should publish.

use std::fmt;

/// Event that triggered a publication run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Push of `git_ref` (e.g. `refs/heads/main`)
    Push { git_ref: String },
    /// Manual dispatch or a local invocation
    Manual,
    /// Any other CI event
    Other { event: String },
}

impl Trigger {
    /// Reads `GITHUB_EVENT_NAME` and `GITHUB_REF`; outside CI this is
    /// [`Trigger::Manual`].
    pub fn from_env() -> Self {
        let event = std::env::var("GITHUB_EVENT_NAME").ok();
        let git_ref = std::env::var("GITHUB_REF").ok();
        Self::from_values(event.as_deref(), git_ref.as_deref())
    }

    pub fn from_values(event: Option<&str>, git_ref: Option<&str>) -> Self {
        match event.map(str::trim).filter(|e| !e.is_empty()) {
            None | Some("workflow_dispatch") => Self::Manual,
            Some("push") => Self::Push {
                git_ref: git_ref.unwrap_or_default().to_string(),
            },
            Some(other) => Self::Other {
                event: other.to_string(),
            },
        }
    }

    /// Whether this trigger publishes when the main branch is `main_branch`.
    ///
    /// Returns the reason when it does not.
    pub fn should_publish(&self, main_branch: &str) -> Result<(), String> {
        match self {
            Self::Manual => Ok(()),
            Self::Push { git_ref } => {
                let expected = format!("refs/heads/{}", main_branch);
                if *git_ref == expected {
                    Ok(())
                } else {
                    Err(format!("push to {} is not {}", git_ref, expected))
                }
            }
            Self::Other { event } => Err(format!("event '{}' does not publish", event)),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push { git_ref } => write!(f, "push ({})", git_ref),
            Self::Manual => f.write_str("manual"),
            Self::Other { event } => f.write_str(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_to_main_publishes() {
        let t = Trigger::from_values(Some("push"), Some("refs/heads/main"));
        assert!(t.should_publish("main").is_ok());
    }

    #[test]
    fn push_elsewhere_is_skipped() {
        let t = Trigger::from_values(Some("push"), Some("refs/heads/feature"));
        assert!(t.should_publish("main").is_err());
        let tag = Trigger::from_values(Some("push"), Some("refs/tags/main"));
        assert!(tag.should_publish("main").is_err());
    }

    #[test]
    fn manual_always_publishes() {
        assert_eq!(Trigger::from_values(None, None), Trigger::Manual);
        assert_eq!(
            Trigger::from_values(Some("workflow_dispatch"), Some("refs/heads/feature")),
            Trigger::Manual
        );
        assert!(Trigger::Manual.should_publish("main").is_ok());
    }

    #[test]
    fn other_events_are_skipped() {
        let t = Trigger::from_values(Some("pull_request"), Some("refs/pull/1/merge"));
        assert!(t.should_publish("main").is_err());
        assert_eq!(t.to_string(), "pull_request");
    }
}
