// src/models/plan.rs

use serde::{Deserialize, Serialize};

/// Pricing jurisdiction. Stored on the user as lowercase TEXT; NULL until the
/// first successful purchase locks it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Region {
    India,
    Global,
}

impl Region {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "india" => Some(Region::India),
            "global" => Some(Region::Global),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::India => "india",
            Region::Global => "global",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    /// Recurring tier purchase; updates the user's subscription_tier.
    Subscription,
    /// One-off minute/page pack; leaves the tier untouched.
    Pack,
}

/// A purchasable plan. Amounts are in the currency's smallest unit
/// (paise / cents) and are fixed server-side; nothing about pricing is
/// accepted from the client.
#[derive(Debug, Clone, Copy)]
pub struct Plan {
    pub name: &'static str,
    pub region: Region,
    pub kind: PlanKind,
    pub amount: i64,
    pub currency: &'static str,
    pub minutes: i64,
    pub pages: i64,
}

/// The full catalog. The two regions are disjoint: a plan name is only valid
/// within its own region's set.
pub const PLANS: &[Plan] = &[
    Plan {
        name: "starter",
        region: Region::India,
        kind: PlanKind::Subscription,
        amount: 9900,
        currency: "INR",
        minutes: 120,
        pages: 100,
    },
    Plan {
        name: "standard",
        region: Region::India,
        kind: PlanKind::Subscription,
        amount: 19900,
        currency: "INR",
        minutes: 250,
        pages: 200,
    },
    Plan {
        name: "achiever",
        region: Region::India,
        kind: PlanKind::Subscription,
        amount: 34900,
        currency: "INR",
        minutes: 500,
        pages: 450,
    },
    Plan {
        name: "topup",
        region: Region::India,
        kind: PlanKind::Pack,
        amount: 4900,
        currency: "INR",
        minutes: 60,
        pages: 40,
    },
    Plan {
        name: "standard",
        region: Region::Global,
        kind: PlanKind::Subscription,
        amount: 900,
        currency: "USD",
        minutes: 250,
        pages: 200,
    },
    Plan {
        name: "pro",
        region: Region::Global,
        kind: PlanKind::Subscription,
        amount: 1900,
        currency: "USD",
        minutes: 600,
        pages: 500,
    },
    Plan {
        name: "topup",
        region: Region::Global,
        kind: PlanKind::Pack,
        amount: 500,
        currency: "USD",
        minutes: 60,
        pages: 40,
    },
];

impl Plan {
    /// Looks up a plan by exact name within one region's set. Case-sensitive:
    /// plan names are server-defined identifiers, not free text.
    pub fn resolve(region: Region, name: &str) -> Option<&'static Plan> {
        PLANS.iter().find(|p| p.region == region && p.name == name)
    }
}
