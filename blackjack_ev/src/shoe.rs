use crate::error::check_card;
use crate::{CardCount, EvError, EvResult};

/// The undealt cards of the shoe, as remaining counts per card value.
///
/// A `ShoeState` is never mutated in place: drawing returns a new value, so
/// sibling branches of a search never observe each other's draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShoeState {
    counts: CardCount,
}

impl ShoeState {
    pub fn new(counts: CardCount) -> Self {
        Self { counts }
    }

    pub fn from_counts(counts: &[u16; 10]) -> Self {
        Self::new(CardCount::new(counts))
    }

    pub fn with_number_of_decks(number_of_decks: u8) -> Self {
        Self::new(CardCount::with_number_of_decks(number_of_decks))
    }

    pub fn count(&self, card: u8) -> u16 {
        self.counts[card]
    }

    pub fn total(&self) -> u16 {
        self.counts.get_total()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Exact remaining composition, used as a memoization key.
    pub fn signature(&self) -> CardCount {
        self.counts
    }

    /// Probability that the next card dealt has the given value. Fails on an empty shoe.
    pub fn probability_of(&self, card: u8) -> EvResult<f64> {
        let card = check_card(card)?;
        if self.is_empty() {
            return Err(EvError::ShoeDepleted { card: Some(card) });
        }
        Ok(self.counts[card] as f64 / self.total() as f64)
    }

    /// Returns the shoe after one card of the given value has been dealt.
    pub fn with_draw(&self, card: u8) -> EvResult<ShoeState> {
        let card = check_card(card)?;
        if self.counts[card] == 0 {
            return Err(EvError::ShoeDepleted { card: Some(card) });
        }
        let mut counts = self.counts;
        counts.remove_card(card);
        Ok(ShoeState { counts })
    }

    /// Returns the shoe after all given cards have been dealt, or fails without
    /// a partial result if any value runs out.
    pub fn with_draws(&self, cards: &[u8]) -> EvResult<ShoeState> {
        cards
            .iter()
            .try_fold(*self, |shoe, &card| shoe.with_draw(card))
    }
}
