use crate::error::check_card;
use crate::{EvError, EvResult, Hand, Rules, ShoeState};
use serde::Serialize;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InsuranceRecommendation {
    Insure,
    NoInsure,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InsuranceDecision {
    /// Probability that the hole card gives the dealer Blackjack.
    pub p_bj: f64,
    pub break_even_p: f64,
    pub insurance_bet_fraction: f64,
    /// Expectation of the insurance bet in units of the original wager.
    pub ev_per_original: f64,
    /// Expectation per unit placed on insurance.
    pub ev_per_insurance: f64,
    /// Insuring a natural is the same as taking even money.
    pub even_money: bool,
    pub recommendation: InsuranceRecommendation,
}

/// Decides on the insurance side bet against an Ace up card.
///
/// Insurance is taken only when strictly profitable; at the break-even point it
/// is declined.
pub fn calculate_insurance(
    dealer_up_card: u8,
    shoe: &ShoeState,
    rule: &Rules,
    hand: Option<&Hand>,
) -> EvResult<InsuranceDecision> {
    rule.validate()?;
    if check_card(dealer_up_card)? != 1 {
        return Err(EvError::IllegalAction(format!(
            "insurance is only offered against an Ace, not {}",
            dealer_up_card
        )));
    }

    // Nothing left to draw means the hole card cannot complete a Blackjack.
    let p_bj = if shoe.is_empty() {
        0.0
    } else {
        shoe.probability_of(10)?
    };
    let fraction = rule.insurance_bet_fraction;
    let win = fraction * rule.insurance_payout;
    let break_even_p = fraction / (fraction + win);
    let ev_per_original = win * p_bj - fraction * (1.0 - p_bj);

    let recommendation = if p_bj > break_even_p {
        InsuranceRecommendation::Insure
    } else {
        InsuranceRecommendation::NoInsure
    };
    log::debug!(
        "insurance: p_bj {:.6} against break-even {:.6}: {}",
        p_bj,
        break_even_p,
        recommendation
    );

    Ok(InsuranceDecision {
        p_bj,
        break_even_p,
        insurance_bet_fraction: fraction,
        ev_per_original,
        ev_per_insurance: ev_per_original / fraction,
        even_money: hand.map(Hand::is_natural_blackjack).unwrap_or(false),
        recommendation,
    })
}
