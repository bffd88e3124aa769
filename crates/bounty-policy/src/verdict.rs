//! Verdict types for pre-flight checks
//!
//! Form validation collects every violated field into one Block verdict so a
//! form can show all problems at once; [`Verdict::into_result`] turns that
//! into the workflow's error type.

use bounty_core::{BountyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Allow,

    Block {
        reason: String,
        violations: Vec<Violation>,
    },
}

impl Verdict {
    pub fn allow() -> Self {
        Verdict::Allow
    }

    pub fn block(reason: impl Into<String>, violations: Vec<Violation>) -> Self {
        Verdict::Block {
            reason: reason.into(),
            violations,
        }
    }

    /// Allow when nothing was violated, otherwise block with every violation.
    pub fn from_violations(reason: impl Into<String>, violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            Verdict::allow()
        } else {
            Verdict::block(reason, violations)
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Block { .. })
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            Verdict::Block { violations, .. } => violations,
            _ => &[],
        }
    }

    /// Violation for a given form field, if any
    pub fn field(&self, field: &str) -> Option<&Violation> {
        self.violations()
            .iter()
            .find(|v| v.field.as_deref() == Some(field))
    }

    /// A blocked verdict becomes a `Validation` error listing every violation.
    pub fn into_result(self) -> Result<()> {
        match self {
            Verdict::Block { violations, reason } => {
                let detail = if violations.is_empty() {
                    reason
                } else {
                    violations
                        .iter()
                        .map(|v| v.description.as_str())
                        .collect::<Vec<_>>()
                        .join("; ")
                };
                Err(BountyError::Validation(detail))
            }
            Verdict::Allow => Ok(()),
        }
    }
}

/// One failed check, optionally tied to a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Violation {
    pub fn new(rule_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            description: description.into(),
            field: None,
        }
    }

    pub fn on_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Verdict::Allow => write!(f, "ALLOW"),
            Verdict::Block { reason, violations } => {
                write!(f, "BLOCK: {}", reason)?;
                if !violations.is_empty() {
                    write!(f, " ({} violations)", violations.len())?;
                }
                Ok(())
            }
        }
    }
}
