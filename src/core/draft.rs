//! Validated input schemas accepted at the engine boundary

use super::{Location, Priority};
use crate::error::{FixhubError, Result};
use serde::{Deserialize, Serialize};

/// Longest free-text field accepted, in characters
pub const MAX_TEXT_LEN: usize = 4000;

/// Trim a required free-text field and reject blanks and oversized input
pub(crate) fn required_text(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FixhubError::invalid_input(format!("{field} must not be empty")));
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(FixhubError::invalid_input(format!(
            "{field} must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(value.to_string())
}

/// Everything a reporter supplies to open a ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTicket {
    pub description: String,
    pub location: Location,
    pub priority: Priority,
}

impl NewTicket {
    pub fn new(description: impl Into<String>, location: Location, priority: Priority) -> Self {
        Self {
            description: description.into(),
            location,
            priority,
        }
    }

    /// Check required fields and return the normalized draft
    pub fn validate(self) -> Result<Self> {
        Ok(Self {
            description: required_text("description", &self.description)?,
            location: self.location.normalized()?,
            priority: self.priority,
        })
    }
}

/// Reporter edits to a PENDING ticket; absent fields stay unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TicketPatch {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl TicketPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.description.is_none() && self.location.is_none() && self.priority.is_none()
    }

    /// Reject empty patches and blank fields, normalizing the rest
    pub fn validate(self) -> Result<Self> {
        if self.is_empty() {
            return Err(FixhubError::invalid_input(
                "patch must change at least one of description, location, priority",
            ));
        }
        Ok(Self {
            description: self
                .description
                .map(|d| required_text("description", &d))
                .transpose()?,
            location: self.location.map(Location::normalized).transpose()?,
            priority: self.priority,
        })
    }
}
