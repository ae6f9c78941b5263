use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AppError;

/// Banking provider identifier. Used as a map key across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// A-Bank open banking sandbox.
    Abank,
    /// S-Bank open banking sandbox.
    Sbank,
    /// V-Bank open banking sandbox.
    Vbank,
}

impl ProviderId {
    /// Every known provider, in stable order.
    pub const ALL: [Self; 3] = [Self::Abank, Self::Sbank, Self::Vbank];

    /// Returns the stable lowercase code for this provider.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abank => "abank",
            Self::Sbank => "sbank",
            Self::Vbank => "vbank",
        }
    }

    /// Parses a provider code, ignoring ASCII case and surrounding whitespace.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|provider| provider.as_str() == normalized)
            .ok_or_else(|| AppError::Validation(format!("unknown provider '{value}'")))
    }
}

impl Display for ProviderId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::ProviderId;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(ProviderId::parse(" VBank ").ok(), Some(ProviderId::Vbank));
    }

    #[test]
    fn parse_rejects_unknown_codes() {
        assert!(ProviderId::parse("gostbank").is_err());
    }
}
