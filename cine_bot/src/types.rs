use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Subscription plan. Decides the price and whether delivered movies
/// can be forwarded or saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[serde(alias = "clasico")]
    Classic,
    Premium,
}

impl Plan {
    pub const ALL: [Plan; 2] = [Plan::Classic, Plan::Premium];

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Classic => "classic",
            Plan::Premium => "premium",
        }
    }

    /// Human readable name.
    pub fn title(self) -> &'static str {
        match self {
            Plan::Classic => "Classic",
            Plan::Premium => "Premium",
        }
    }

    /// Price in CUP when paying by bank card or wallet.
    pub fn card_price(self) -> u32 {
        match self {
            Plan::Classic => 200,
            Plan::Premium => 350,
        }
    }

    /// Price in CUP when paying with mobile balance.
    pub fn balance_price(self) -> u32 {
        match self {
            Plan::Classic => 120,
            Plan::Premium => 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl Display for UnknownVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown value: {}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for Plan {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" | "clasico" => Ok(Plan::Classic),
            "premium" => Ok(Plan::Premium),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// Where a payment request is in its life.
///
/// `Pending` moves to exactly one of the other two, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        self != PaymentStatus::Pending
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "approved" => Ok(PaymentStatus::Approved),
            "rejected" => Ok(PaymentStatus::Rejected),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
