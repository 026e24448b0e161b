//! Subscription tier limits on active listings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Sentinel for "no limit" in tier tables and subscription records.
pub const UNLIMITED: i64 = -1;

/// Tier assumed for owners without a subscription record.
pub const DEFAULT_TIER: &str = "free";

/// Tier table used when none is configured.
pub const DEFAULT_TIER_LIMITS: &str = "free=3,basic=10,premium=50,enterprise=-1";

/// A user's subscription, as read from the subscription collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: DbId,
    pub tier: String,
    /// Per-subscription override of the tier table.
    pub max_listings: Option<i64>,
}

/// Resolved ceiling for one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quota {
    pub tier: String,
    /// `None` means unlimited.
    pub limit: Option<i64>,
}

impl Quota {
    /// Fail with `LISTING_LIMIT_REACHED` when `active` has reached the limit.
    pub fn check(&self, active: i64) -> Result<(), CoreError> {
        match self.limit {
            Some(limit) if active >= limit => Err(CoreError::ListingLimitReached {
                tier: self.tier.clone(),
                limit,
            }),
            _ => Ok(()),
        }
    }
}

/// Maximum active listings per tier name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierLimits {
    limits: HashMap<String, i64>,
    default_tier: String,
}

impl TierLimits {
    pub fn new(limits: HashMap<String, i64>, default_tier: impl Into<String>) -> Self {
        Self {
            limits,
            default_tier: default_tier.into(),
        }
    }

    /// Parse a `tier=limit,tier=limit` table. Tier names are lowercased.
    ///
    /// ```
    /// use estate_core::quota::TierLimits;
    ///
    /// let limits = TierLimits::parse("free=3, premium=-1", "free").unwrap();
    /// assert_eq!(limits.limit_for_tier("free"), Some(3));
    /// assert_eq!(limits.limit_for_tier("premium"), None);
    /// ```
    pub fn parse(table: &str, default_tier: &str) -> Result<Self, CoreError> {
        let mut limits = HashMap::new();
        for entry in table.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (tier, limit) = entry.split_once('=').ok_or_else(|| {
                CoreError::Validation(format!("Tier limit entry '{entry}' must be tier=limit"))
            })?;
            let limit: i64 = limit.trim().parse().map_err(|_| {
                CoreError::Validation(format!("Tier limit for '{tier}' must be an integer"))
            })?;
            if limit < UNLIMITED {
                return Err(CoreError::Validation(format!(
                    "Tier limit for '{tier}' must be -1 or non-negative"
                )));
            }
            limits.insert(tier.trim().to_ascii_lowercase(), limit);
        }
        let default_tier = default_tier.trim().to_ascii_lowercase();
        if !limits.contains_key(&default_tier) {
            return Err(CoreError::Validation(format!(
                "Default tier '{default_tier}' has no configured limit"
            )));
        }
        Ok(Self {
            limits,
            default_tier,
        })
    }

    pub fn default_tier(&self) -> &str {
        &self.default_tier
    }

    /// Limit for a tier name; unknown tiers get the default tier's limit.
    pub fn limit_for_tier(&self, tier: &str) -> Option<i64> {
        let raw = self
            .limits
            .get(&tier.to_ascii_lowercase())
            .or_else(|| self.limits.get(&self.default_tier))
            .copied()
            .unwrap_or(UNLIMITED);
        (raw != UNLIMITED).then_some(raw)
    }

    /// Resolve the quota for an owner's subscription (or lack of one).
    pub fn resolve(&self, subscription: Option<&Subscription>) -> Quota {
        match subscription {
            Some(sub) => {
                let limit = match sub.max_listings {
                    Some(UNLIMITED) => None,
                    Some(max) => Some(max),
                    None => self.limit_for_tier(&sub.tier),
                };
                Quota {
                    tier: sub.tier.clone(),
                    limit,
                }
            }
            None => Quota {
                tier: self.default_tier.clone(),
                limit: self.limit_for_tier(&self.default_tier),
            },
        }
    }
}

impl Default for TierLimits {
    fn default() -> Self {
        let limits = [("free", 3), ("basic", 10), ("premium", 50), ("enterprise", UNLIMITED)]
            .into_iter()
            .map(|(tier, limit)| (tier.to_string(), limit))
            .collect();
        Self::new(limits, DEFAULT_TIER)
    }
}
