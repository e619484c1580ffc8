//! Subscription tiers and their daily quotas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanId {
    #[default]
    Free,
    Basic,
    Premium,
}

impl PlanId {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Basic => "BASIC",
            Self::Premium => "PREMIUM",
        }
    }

    #[must_use]
    pub const fn is_paid(self) -> bool {
        !matches!(self, Self::Free)
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown plan: {0}")]
pub struct UnknownPlan(pub String);

impl FromStr for PlanId {
    type Err = UnknownPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FREE" => Ok(Self::Free),
            "BASIC" => Ok(Self::Basic),
            "PREMIUM" => Ok(Self::Premium),
            _ => Err(UnknownPlan(s.to_string())),
        }
    }
}

/// Immutable tier definition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub id: PlanId,
    pub name: &'static str,
    pub tagline: &'static str,
    pub daily_message_limit: u32,
    pub daily_token_limit: u32,
    /// Monthly price in euros.
    pub price: f64,
}

const FREE: Plan = Plan {
    id: PlanId::Free,
    name: "Plan básico gratuito",
    tagline: "Plan básico gratuito",
    daily_message_limit: 3,
    daily_token_limit: 2000,
    price: 0.0,
};

const BASIC: Plan = Plan {
    id: PlanId::Basic,
    name: "Plan básico",
    tagline: "Para uso regular",
    daily_message_limit: 10,
    daily_token_limit: 5000,
    price: 2.99,
};

const PREMIUM: Plan = Plan {
    id: PlanId::Premium,
    name: "Plan premium",
    tagline: "Para uso intensivo",
    daily_message_limit: 20,
    daily_token_limit: 10000,
    price: 6.99,
};

/// Static table of the known tiers.
pub struct PlanCatalog;

impl PlanCatalog {
    #[must_use]
    pub const fn resolve(id: PlanId) -> &'static Plan {
        match id {
            PlanId::Free => &FREE,
            PlanId::Basic => &BASIC,
            PlanId::Premium => &PREMIUM,
        }
    }

    /// Resolve a stored identifier; anything unrecognised is the free tier.
    #[must_use]
    pub fn resolve_str(id: Option<&str>) -> &'static Plan {
        let id = id.and_then(|s| s.parse().ok()).unwrap_or_default();
        Self::resolve(id)
    }

    #[must_use]
    pub const fn default_plan() -> &'static Plan {
        &FREE
    }

    #[must_use]
    pub const fn all() -> [&'static Plan; 3] {
        [&FREE, &BASIC, &PREMIUM]
    }
}

/// A paid plan granted to a user by the upgrade flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSubscription {
    pub plan: PlanId,
    pub expires_at: Option<DateTime<Utc>>,
}

impl UserSubscription {
    #[must_use]
    pub const fn new(plan: PlanId, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { plan, expires_at }
    }

    /// Expired exactly when the expiry instant is strictly before `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expiry| expiry >= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn resolve_matches_tier_table() {
        assert_eq!(PlanCatalog::resolve(PlanId::Free).daily_message_limit, 3);
        assert_eq!(PlanCatalog::resolve(PlanId::Basic).daily_message_limit, 10);
        assert_eq!(PlanCatalog::resolve(PlanId::Premium).daily_message_limit, 20);
        assert_eq!(PlanCatalog::resolve(PlanId::Premium).daily_token_limit, 10000);
    }

    #[test]
    fn unknown_identifiers_fall_back_to_free() {
        assert_eq!(PlanCatalog::resolve_str(None).id, PlanId::Free);
        assert_eq!(PlanCatalog::resolve_str(Some("GOLD")).id, PlanId::Free);
        assert_eq!(PlanCatalog::resolve_str(Some("premium")).id, PlanId::Premium);
        assert_eq!(PlanCatalog::default_plan().id, PlanId::Free);
    }

    #[test]
    fn plan_id_parsing() {
        assert_eq!(" Basic ".parse::<PlanId>(), Ok(PlanId::Basic));
        assert_eq!(
            "gold".parse::<PlanId>(),
            Err(UnknownPlan("gold".to_string()))
        );
        assert!(PlanId::Premium.is_paid());
        assert!(!PlanId::Free.is_paid());
    }

    #[test]
    fn subscription_expiry_boundary() {
        let now = Utc::now();
        let sub = UserSubscription::new(PlanId::Basic, Some(now));
        assert!(sub.is_active(now));
        assert!(!sub.is_active(now + Duration::seconds(1)));
        assert!(UserSubscription::new(PlanId::Basic, None).is_active(now));
    }

    #[test]
    fn all_lists_tiers_in_ascending_order() {
        let ids: Vec<_> = PlanCatalog::all().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![PlanId::Free, PlanId::Basic, PlanId::Premium]);
    }
}
