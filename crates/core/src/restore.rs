//! Restore request parameters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default number of days a restored copy stays readable.
pub const DEFAULT_RETENTION_DAYS: u32 = 3;

/// Minimum accepted retention.
pub const MIN_RETENTION_DAYS: u32 = 1;

/// Retrieval tier for a restore request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[default]
    Standard,
    Bulk,
}

impl Tier {
    /// Map caller input onto a tier, falling back to `Standard` for anything unknown.
    pub fn normalize(input: &str) -> Self {
        input.parse().unwrap_or_default()
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Bulk => "Bulk",
        }
    }
}

impl FromStr for Tier {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "bulk" => Ok(Self::Bulk),
            _ => Err(crate::Error::InvalidTier(s.to_string())),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How out-of-range restore parameters are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leniency {
    /// Silently substitute defaults: retention below 1 becomes 1, unknown tiers become `Standard`.
    #[default]
    Lenient,
    /// Reject out-of-range retention and unknown tiers.
    Strict,
}

/// Normalized parameters for one restore request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreParams {
    pub days: u32,
    pub tier: Tier,
}

impl RestoreParams {
    /// Resolve raw caller input according to the leniency policy.
    pub fn resolve(days: i64, tier: &str, leniency: Leniency) -> crate::Result<Self> {
        match leniency {
            Leniency::Lenient => Ok(Self::lenient(days, tier)),
            Leniency::Strict => {
                if days < i64::from(MIN_RETENTION_DAYS) {
                    return Err(crate::Error::InvalidRetention {
                        days,
                        min: MIN_RETENTION_DAYS,
                    });
                }
                let days = u32::try_from(days).map_err(|_| crate::Error::InvalidRetention {
                    days,
                    min: MIN_RETENTION_DAYS,
                })?;
                Ok(Self {
                    days,
                    tier: tier.parse()?,
                })
            }
        }
    }

    /// Clamp retention to at least one day and normalize the tier.
    pub fn lenient(days: i64, tier: &str) -> Self {
        let days = days.clamp(i64::from(MIN_RETENTION_DAYS), i64::from(u32::MAX)) as u32;
        Self {
            days,
            tier: Tier::normalize(tier),
        }
    }
}

impl Default for RestoreParams {
    fn default() -> Self {
        Self {
            days: DEFAULT_RETENTION_DAYS,
            tier: Tier::Standard,
        }
    }
}
