//! Fee and resource pricing for ledger-mutating calls.
//!
//! A quote has two parts: the resource budget (the simulated execution cost
//! plus a fixed percentage of headroom) and the inclusion fee. The inclusion
//! fee follows the market when the network reports recent surge data and
//! falls back to a flat price otherwise.

use serde::{Deserialize, Serialize};

/// Pricing knobs, loaded from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    /// Extra resource budget on top of the simulated cost, in percent.
    pub headroom_percent: u64,
    /// Multiple of the base fee paid when the fee market is dynamic.
    pub base_fee_multiplier: u64,
    /// Lowest priority fee ever offered in a dynamic market.
    pub priority_fee_floor: u64,
    /// Inclusion fee used when the network reports no market data.
    pub flat_fee: u64,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            headroom_percent: 20,
            base_fee_multiplier: 2,
            priority_fee_floor: 100,
            flat_fee: 100,
        }
    }
}

/// Current network fee conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeConditions {
    /// Recent transactions paid above the base fee.
    Dynamic { base_fee: u64, priority_fee: u64 },
    /// No market signal; a single observed price.
    Flat { price: u64 },
}

/// Fee parameters attached to a transaction envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    /// Maximum inclusion fee the sender is willing to pay.
    pub inclusion_fee: u64,
    /// Priority component of `inclusion_fee`, when the market is dynamic.
    pub priority_fee: Option<u64>,
    /// Resource budget, simulated cost plus headroom.
    pub resource_limit: u64,
}

impl FeeQuote {
    pub fn total(&self) -> u64 {
        self.inclusion_fee.saturating_add(self.resource_limit)
    }
}

/// `estimate` increased by `percent`, rounded up.
pub fn with_headroom(estimate: u64, percent: u64) -> u64 {
    let scaled = u128::from(estimate) * u128::from(100 + percent);
    let limit = scaled.div_ceil(100);
    u64::try_from(limit).unwrap_or(u64::MAX)
}

pub fn quote(conditions: FeeConditions, cost_estimate: u64, policy: &FeePolicy) -> FeeQuote {
    let resource_limit = with_headroom(cost_estimate, policy.headroom_percent);

    match conditions {
        FeeConditions::Dynamic {
            base_fee,
            priority_fee,
        } => {
            let priority = priority_fee.max(policy.priority_fee_floor);
            FeeQuote {
                inclusion_fee: base_fee
                    .saturating_mul(policy.base_fee_multiplier)
                    .saturating_add(priority),
                priority_fee: Some(priority),
                resource_limit,
            }
        }
        FeeConditions::Flat { price } => FeeQuote {
            inclusion_fee: price.max(policy.flat_fee),
            priority_fee: None,
            resource_limit,
        },
    }
}
