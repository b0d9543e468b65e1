use crate::error::check_card;
use crate::statearray::MemoValue;
use crate::{CardCount, EvError, EvResult, PeekRule, Rules, ShoeState, StateArray};
use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// Distributions must sum to 1 within this tolerance.
pub const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Final result of the dealer's hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DealerOutcome {
    #[strum(serialize = "17")]
    Total17 = 0,
    #[strum(serialize = "18")]
    Total18,
    #[strum(serialize = "19")]
    Total19,
    #[strum(serialize = "20")]
    Total20,
    #[strum(serialize = "21")]
    Total21,
    #[strum(serialize = "bust")]
    Bust,
    #[strum(serialize = "blackjack")]
    Blackjack,
}

impl DealerOutcome {
    /// Outcome for a standing total in [17, 21].
    pub fn from_total(total: u16) -> Option<DealerOutcome> {
        match total {
            17 => Some(DealerOutcome::Total17),
            18 => Some(DealerOutcome::Total18),
            19 => Some(DealerOutcome::Total19),
            20 => Some(DealerOutcome::Total20),
            21 => Some(DealerOutcome::Total21),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DealerOutcomeDistribution {
    // [0, 4] for [17, 21].
    // 5 for Bust.
    // 6 for natural Blackjack.
    probabilities: [f64; 7],
}

impl DealerOutcomeDistribution {
    pub fn probability(&self, outcome: DealerOutcome) -> f64 {
        self.probabilities[outcome as usize]
    }

    /// Probability that the dealer stands on exactly this total. Zero outside [17, 21].
    pub fn p_total(&self, total: u16) -> f64 {
        DealerOutcome::from_total(total)
            .map(|outcome| self.probability(outcome))
            .unwrap_or(0.0)
    }

    pub fn p_bust(&self) -> f64 {
        self.probability(DealerOutcome::Bust)
    }

    pub fn p_blackjack(&self) -> f64 {
        self.probability(DealerOutcome::Blackjack)
    }

    pub fn sum(&self) -> f64 {
        self.probabilities.iter().sum()
    }

    /// Every outcome with its probability, standing totals first.
    pub fn iter(&self) -> impl Iterator<Item = (DealerOutcome, f64)> + '_ {
        DealerOutcome::iter().map(move |outcome| (outcome, self.probability(outcome)))
    }

    pub fn check_normalised(&self) -> EvResult<()> {
        let sum = self.sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(EvError::InvariantViolation(format!(
                "dealer outcome probabilities sum to {}",
                sum
            )));
        }
        Ok(())
    }

    fn end_with(outcome: DealerOutcome) -> Self {
        let mut odds = Self::default();
        odds.probabilities[outcome as usize] = 1.0;
        odds
    }

    fn add_outcome_with_p(&mut self, outcome: DealerOutcome, p: f64) {
        self.probabilities[outcome as usize] += p;
    }

    fn add_assign_with_p(&mut self, rhs: &Self, p: f64) {
        for i in 0..self.probabilities.len() {
            self.probabilities[i] += rhs.probabilities[i] * p;
        }
    }
}

impl MemoValue for DealerOutcomeDistribution {
    fn agrees_with(&self, other: &Self) -> bool {
        self.probabilities
            .iter()
            .zip(other.probabilities.iter())
            .all(|(a, b)| a.agrees_with(b))
    }
}

/// Running dealer total with Aces counted as 11 while that does not bust.
/// `soft` means one Ace is currently counted as 11.
pub(crate) fn add_card_to_total(total: u16, soft: bool, card: u8) -> (u16, bool) {
    if card == 1 && total + 11 <= 21 {
        return (total + 11, true);
    }
    let total = total + card as u16;
    if total > 21 && soft {
        (total - 10, false)
    } else {
        (total, soft)
    }
}

/// Hole card that the dealer is known not to hold, when the rules let the dealer
/// peek for Blackjack before the player acts.
pub fn get_impossible_dealer_hole_card(rule: &Rules, dealer_up_card: u8) -> Option<u8> {
    match rule.peek_rule {
        PeekRule::Us => match dealer_up_card {
            1 => Some(10),
            10 => Some(1),
            _ => None,
        },
        PeekRule::Enhc | PeekRule::NoPeek => None,
    }
}

/// Probability that the hole card completes a natural Blackjack, before any peek.
pub fn dealer_blackjack_probability(dealer_up_card: u8, shoe: &ShoeState) -> EvResult<f64> {
    match check_card(dealer_up_card)? {
        1 => shoe.probability_of(10),
        10 => shoe.probability_of(1),
        _ => Ok(0.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DealerKey {
    total: u16,
    soft: bool,
    shoe: CardCount,
}

/// Computes dealer outcome distributions. One model (and its cache) belongs to a
/// single top-level computation and must not be shared across shoes of
/// different sessions.
pub struct DealerModel<'a> {
    rule: &'a Rules,
    odds: StateArray<DealerKey, DealerOutcomeDistribution>,
}

impl<'a> DealerModel<'a> {
    pub fn new(rule: &'a Rules) -> Self {
        Self {
            rule,
            odds: StateArray::with_capacity(1 << 12),
        }
    }

    pub fn cached_states(&self) -> usize {
        self.odds.len()
    }

    /// Distribution of the dealer's final hand given the up card and the shoe
    /// the hole card will be (or was) dealt from.
    ///
    /// When the dealer peeks (US rule, Ace or ten up), the result is conditioned
    /// on the dealer not holding Blackjack.
    pub fn distribution(
        &mut self,
        dealer_up_card: u8,
        shoe: &ShoeState,
    ) -> EvResult<DealerOutcomeDistribution> {
        let dealer_up_card = check_card(dealer_up_card)?;
        let impossible_hole_card = get_impossible_dealer_hole_card(self.rule, dealer_up_card);
        let shoe = shoe.signature();

        let impossible_card_number = impossible_hole_card.map(|card| shoe[card]).unwrap_or(0);
        let current_valid_shoe_total = shoe.get_total() - impossible_card_number;
        if current_valid_shoe_total == 0 {
            // Either the shoe is empty, or only Blackjack-completing cards are left.
            return Err(EvError::ShoeDepleted {
                card: impossible_hole_card.filter(|_| shoe.get_total() > 0),
            });
        }
        let current_valid_shoe_total = current_valid_shoe_total as f64;

        let (up_total, up_soft) = add_card_to_total(0, false, dealer_up_card);
        let mut odds = DealerOutcomeDistribution::default();
        for hole_card in 1..=10 {
            if Some(hole_card) == impossible_hole_card || shoe[hole_card] == 0 {
                continue;
            }
            let p = shoe[hole_card] as f64 / current_valid_shoe_total;
            let (total, soft) = add_card_to_total(up_total, up_soft, hole_card);

            if total == 21 {
                let outcome = match self.rule.peek_rule {
                    PeekRule::NoPeek => DealerOutcome::Total21,
                    PeekRule::Us | PeekRule::Enhc => DealerOutcome::Blackjack,
                };
                odds.add_outcome_with_p(outcome, p);
                continue;
            }

            let mut next_shoe = shoe;
            next_shoe.remove_card(hole_card);
            let next_state_odds = self.memoization_dealer_gets_cards(total, soft, next_shoe)?;
            odds.add_assign_with_p(&next_state_odds, p);
        }

        odds.check_normalised()?;
        log::trace!(
            "dealer distribution for up card {} over {} cards: {:?}",
            dealer_up_card,
            shoe.get_total(),
            odds
        );
        Ok(odds)
    }

    fn memoization_dealer_gets_cards(
        &mut self,
        total: u16,
        soft: bool,
        shoe: CardCount,
    ) -> EvResult<DealerOutcomeDistribution> {
        // Case 1: Dealer must stand.
        if total > 21 {
            return Ok(DealerOutcomeDistribution::end_with(DealerOutcome::Bust));
        }
        if total >= 17 && !(total == 17 && soft && self.rule.h17) {
            if let Some(outcome) = DealerOutcome::from_total(total) {
                return Ok(DealerOutcomeDistribution::end_with(outcome));
            }
        }

        let key = DealerKey { total, soft, shoe };
        if let Some(odds) = self.odds.get(&key) {
            return Ok(*odds);
        }

        // Case 2: Dealer must hit.
        if shoe.get_total() == 0 {
            return Err(EvError::ShoeDepleted { card: None });
        }
        let current_shoe_total = shoe.get_total() as f64;

        let mut odds = DealerOutcomeDistribution::default();
        for card_value in 1..=10 {
            if shoe[card_value] == 0 {
                continue;
            }
            let p = shoe[card_value] as f64 / current_shoe_total;
            let (next_total, next_soft) = add_card_to_total(total, soft, card_value);

            let mut next_shoe = shoe;
            next_shoe.remove_card(card_value);
            let next_state_odds =
                self.memoization_dealer_gets_cards(next_total, next_soft, next_shoe)?;
            odds.add_assign_with_p(&next_state_odds, p);
        }

        self.odds.insert(key, odds)?;
        Ok(odds)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::get_typical_rule;
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Plays out every dealer draw sequence without any caching.
    fn enumerate_dealer(
        rule: &Rules,
        total: u16,
        soft: bool,
        cards_dealt: u8,
        shoe: CardCount,
        p: f64,
        out: &mut [f64; 7],
    ) {
        if cards_dealt == 2 && total == 21 {
            let outcome = match rule.peek_rule {
                PeekRule::NoPeek => DealerOutcome::Total21,
                _ => DealerOutcome::Blackjack,
            };
            out[outcome as usize] += p;
            return;
        }
        if total > 21 {
            out[DealerOutcome::Bust as usize] += p;
            return;
        }
        if cards_dealt >= 2 && total >= 17 && !(total == 17 && soft && rule.h17) {
            out[DealerOutcome::from_total(total).unwrap() as usize] += p;
            return;
        }
        for card in 1..=10u8 {
            if shoe[card] == 0 {
                continue;
            }
            let q = shoe[card] as f64 / shoe.get_total() as f64;
            let (t, s) = add_card_to_total(total, soft, card);
            let mut next = shoe;
            next.remove_card(card);
            enumerate_dealer(rule, t, s, cards_dealt + 1, next, p * q, out);
        }
    }

    #[test]
    fn distributions_sum_to_one() {
        for peek_rule in [PeekRule::Us, PeekRule::Enhc, PeekRule::NoPeek] {
            for h17 in [true, false] {
                let rule = Rules {
                    peek_rule,
                    h17,
                    ..get_typical_rule()
                };
                let shoe = ShoeState::with_number_of_decks(1);
                let mut model = DealerModel::new(&rule);
                for dealer_up_card in 1..=10 {
                    let shoe = shoe.with_draw(dealer_up_card).unwrap();
                    let odds = model.distribution(dealer_up_card, &shoe).unwrap();
                    assert_abs_diff_eq!(odds.sum(), 1.0, epsilon = PROBABILITY_TOLERANCE);
                    assert!(odds.probabilities.iter().all(|p| *p >= 0.0));
                }
            }
        }
    }

    #[test]
    fn matches_direct_enumeration_without_peek() {
        let rule = Rules {
            peek_rule: PeekRule::Enhc,
            ..get_typical_rule()
        };
        let shoe = ShoeState::with_number_of_decks(1).with_draws(&[10, 7, 1]).unwrap();
        let mut model = DealerModel::new(&rule);
        let odds = model.distribution(1, &shoe).unwrap();

        let mut expected = [0.0; 7];
        enumerate_dealer(&rule, 11, true, 1, shoe.signature(), 1.0, &mut expected);
        for outcome in DealerOutcome::iter() {
            assert_abs_diff_eq!(
                odds.probability(outcome),
                expected[outcome as usize],
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn us_peek_conditions_on_no_blackjack() {
        let rule = get_typical_rule();
        let shoe = ShoeState::with_number_of_decks(1).with_draw(1).unwrap();
        let mut model = DealerModel::new(&rule);
        let conditioned = model.distribution(1, &shoe).unwrap();
        assert_eq!(conditioned.p_blackjack(), 0.0);

        let enhc = Rules {
            peek_rule: PeekRule::Enhc,
            ..rule
        };
        let mut model = DealerModel::new(&enhc);
        let unconditioned = model.distribution(1, &shoe).unwrap();
        assert_abs_diff_eq!(unconditioned.p_blackjack(), 16.0 / 51.0, epsilon = 1e-12);

        // Removing the Blackjack mass and renormalising gives the peeked distribution.
        let scale = 1.0 - unconditioned.p_blackjack();
        for outcome in DealerOutcome::iter().filter(|o| *o != DealerOutcome::Blackjack) {
            assert_abs_diff_eq!(
                conditioned.probability(outcome),
                unconditioned.probability(outcome) / scale,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn no_peek_folds_blackjack_into_twenty_one() {
        let rule = Rules {
            peek_rule: PeekRule::NoPeek,
            ..get_typical_rule()
        };
        let shoe = ShoeState::with_number_of_decks(2).with_draw(10).unwrap();
        let mut model = DealerModel::new(&rule);
        let odds = model.distribution(10, &shoe).unwrap();
        assert_eq!(odds.p_blackjack(), 0.0);
        assert!(odds.p_total(21) >= 8.0 / shoe.total() as f64);
        let listed: Vec<DealerOutcome> = odds.iter().map(|(outcome, _)| outcome).collect();
        assert_eq!(listed.len(), 7);
        assert_eq!(listed[0], DealerOutcome::Total17);
        assert_eq!(odds.iter().map(|(_, p)| p).sum::<f64>(), odds.sum());
    }

    #[test]
    fn soft_seventeen_rule() {
        let stand = Rules {
            h17: false,
            peek_rule: PeekRule::NoPeek,
            ..get_typical_rule()
        };
        let mut model = DealerModel::new(&stand);
        // Ace up, the only card left is a six: soft 17 stands under S17.
        let odds = model
            .distribution(1, &ShoeState::from_counts(&[0, 0, 0, 0, 0, 1, 0, 0, 0, 0]))
            .unwrap();
        assert_eq!(odds.p_total(17), 1.0);

        let hit = Rules { h17: true, ..stand };
        let mut model = DealerModel::new(&hit);
        let shoe = ShoeState::from_counts(&[0, 0, 0, 0, 0, 1, 0, 0, 0, 3]);
        let odds = model.distribution(1, &shoe).unwrap();
        // A six in the hole makes soft 17, which hits a ten for hard 17.
        // A ten in the hole makes 21, not a distinguished Blackjack without peek.
        assert_abs_diff_eq!(odds.p_total(17), 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(odds.p_total(21), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn fails_when_the_dealer_runs_out_of_cards() {
        let rule = get_typical_rule();
        let mut model = DealerModel::new(&rule);
        let shoe = ShoeState::from_counts(&[0, 2, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            model.distribution(6, &shoe),
            Err(EvError::ShoeDepleted { card: None })
        );

        let only_tens = ShoeState::from_counts(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 5]);
        assert_eq!(
            model.distribution(1, &only_tens),
            Err(EvError::ShoeDepleted { card: Some(10) })
        );
    }

    #[test]
    fn blackjack_probability_from_shoe() {
        let shoe = ShoeState::with_number_of_decks(1);
        assert_abs_diff_eq!(dealer_blackjack_probability(1, &shoe).unwrap(), 16.0 / 52.0);
        assert_abs_diff_eq!(dealer_blackjack_probability(10, &shoe).unwrap(), 4.0 / 52.0);
        assert_eq!(dealer_blackjack_probability(7, &shoe).unwrap(), 0.0);

        let no_aces = ShoeState::from_counts(&[0, 4, 4, 4, 4, 4, 4, 4, 4, 16]);
        assert_eq!(dealer_blackjack_probability(10, &no_aces).unwrap(), 0.0);
    }
}
