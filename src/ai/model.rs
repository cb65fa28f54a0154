//! `provider/model` identifiers.

use std::fmt;
use std::str::FromStr;

use crate::error::{AssistantError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelSpec {
    pub provider: String,
    /// Everything after the first `/`; may itself contain slashes.
    pub model: String,
}

impl ModelSpec {
    pub fn parse(spec: &str) -> Result<Self> {
        let malformed = || AssistantError::MalformedModelSpec(spec.to_string());
        let (provider, model) = spec.trim().split_once('/').ok_or_else(malformed)?;
        if provider.is_empty() || model.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            provider: provider.to_string(),
            model: model.to_string(),
        })
    }
}

impl FromStr for ModelSpec {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}
