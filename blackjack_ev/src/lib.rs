pub mod calculation;
pub mod dealer;
pub mod decision;
mod error;
mod hand;
pub mod insurance;
mod shoe;
mod statearray;
pub mod strategy;

use serde::{Deserialize, Serialize};
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};

pub use dealer::{dealer_blackjack_probability, DealerOutcome, DealerOutcomeDistribution};
pub use decision::{Action, ActionEvs, Capabilities, Decision};
pub use error::{check_card, EvError, EvResult};
pub use hand::Hand;
pub use insurance::{InsuranceDecision, InsuranceRecommendation};
pub use shoe::ShoeState;
pub use statearray::CardCount;
pub(crate) use statearray::StateArray;
pub use strategy::{EvBackend, ExactBackend};

/// Largest shoe the engine accepts.
pub const MAX_NUMBER_OF_DECKS: u8 = 16;

/// House rules. Immutable for the lifetime of a computation and safe to share
/// between threads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rules {
    pub num_decks: u8,
    /// Dealer hits soft 17.
    pub h17: bool,
    pub bj_payout: f64,
    pub late_surrender: bool,
    /// Double after split.
    pub das: bool,
    pub max_splits: u8,
    /// Split Aces receive exactly one card each.
    pub split_aces_one: bool,
    pub peek_rule: PeekRule,
    pub insurance_payout: f64,
    /// Size of the insurance bet relative to the original wager.
    pub insurance_bet_fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_enum_str, Deserialize_enum_str)]
pub enum PeekRule {
    /// Dealer checks for Blackjack under an Ace or ten before the player acts.
    #[serde(rename = "US")]
    Us,
    /// European no hole card: a dealer Blackjack takes every wager.
    #[serde(rename = "ENHC")]
    Enhc,
    /// No peek and no distinguished dealer Blackjack.
    #[serde(rename = "NONE")]
    NoPeek,
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            num_decks: 8,
            h17: true,
            bj_payout: 1.5,
            late_surrender: false,
            das: true,
            max_splits: 3,
            split_aces_one: true,
            peek_rule: PeekRule::Us,
            insurance_payout: 2.0,
            insurance_bet_fraction: 0.5,
        }
    }
}

impl Rules {
    pub fn validate(&self) -> EvResult<()> {
        if self.num_decks == 0 || self.num_decks > MAX_NUMBER_OF_DECKS {
            return Err(EvError::Config(format!(
                "number of decks must be in [1, {}], got {}",
                MAX_NUMBER_OF_DECKS, self.num_decks
            )));
        }
        if !self.bj_payout.is_finite() || self.bj_payout < 0.0 {
            return Err(EvError::Config(format!(
                "invalid Blackjack payout {}",
                self.bj_payout
            )));
        }
        if !self.insurance_payout.is_finite() || self.insurance_payout <= 0.0 {
            return Err(EvError::Config(format!(
                "invalid insurance payout {}",
                self.insurance_payout
            )));
        }
        if !(self.insurance_bet_fraction > 0.0 && self.insurance_bet_fraction <= 1.0) {
            return Err(EvError::Config(format!(
                "insurance bet fraction must be in (0, 1], got {}",
                self.insurance_bet_fraction
            )));
        }
        Ok(())
    }

    /// A full shoe for these rules.
    pub fn fresh_shoe(&self) -> ShoeState {
        ShoeState::with_number_of_decks(self.num_decks)
    }
}

/// Distribution of the dealer's final hand for the given up card and the shoe
/// the hole card is dealt from.
pub fn compute_dealer_distribution(
    dealer_up_card: u8,
    shoe: &ShoeState,
    rule: &Rules,
) -> EvResult<DealerOutcomeDistribution> {
    rule.validate()?;
    dealer::DealerModel::new(rule).distribution(dealer_up_card, shoe)
}

/// Expectation of every action for the hand. `shoe` must already have the hand
/// and the dealer up card removed.
pub fn compute_hand_evs(
    hand: &Hand,
    dealer_up_card: u8,
    shoe: &ShoeState,
    rule: &Rules,
    capabilities: &Capabilities,
    splits_used: u8,
) -> EvResult<ActionEvs> {
    ExactBackend.action_evs(hand, dealer_up_card, shoe, rule, capabilities, splits_used)
}

pub fn compute_insurance(
    dealer_up_card: u8,
    shoe: &ShoeState,
    rule: &Rules,
    hand: Option<&Hand>,
) -> EvResult<InsuranceDecision> {
    insurance::calculate_insurance(dealer_up_card, shoe, rule, hand)
}

/// Best permitted action for the hand, with the expectations it was chosen from.
pub fn decide(
    hand: &Hand,
    dealer_up_card: u8,
    shoe: &ShoeState,
    rule: &Rules,
    capabilities: &Capabilities,
    splits_used: u8,
) -> EvResult<Decision> {
    ExactBackend.decide(hand, dealer_up_card, shoe, rule, capabilities, splits_used)
}
