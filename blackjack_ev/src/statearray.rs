use crate::{EvError, EvResult};
use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Index;

/// Values within this distance are considered to be the same result when a memo
/// entry is written twice.
const MEMO_TOLERANCE: f64 = 1e-12;

/// Memoization table owned by a single top-level computation.
///
/// Keys are exact (no lossy hashing of card counts), so two different shoes can
/// never share an entry.
#[derive(Debug, Clone)]
pub struct StateArray<K: Eq + Hash, V> {
    data: HashMap<K, V>,
}

impl<K: Eq + Hash, V> Default for StateArray<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> StateArray<K, V> {
    pub fn new() -> Self {
        StateArray {
            data: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: HashMap::with_capacity(capacity),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.data.get(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// Values that can be checked for agreement when the same state is computed twice.
pub trait MemoValue: Clone {
    fn agrees_with(&self, other: &Self) -> bool;
}

impl MemoValue for f64 {
    fn agrees_with(&self, other: &Self) -> bool {
        (self - other).abs() <= MEMO_TOLERANCE
    }
}

impl<K: Eq + Hash, V: MemoValue> StateArray<K, V> {
    /// Stores a result. Writing a different result under an existing key means
    /// the key does not capture the whole state, which is a defect.
    pub fn insert(&mut self, key: K, value: V) -> EvResult<()> {
        if let Some(existing) = self.data.get(&key) {
            if !existing.agrees_with(&value) {
                return Err(EvError::InvariantViolation(String::from(
                    "memo entry recomputed with a different result",
                )));
            }
            return Ok(());
        }
        self.data.insert(key, value);
        Ok(())
    }
}

/// Number of cards of each value (from 1 to 10 inclusive, 1 being Ace).
///
/// The counts are compared and hashed exactly, so a `CardCount` serves both as
/// a shoe signature and as the order-independent signature of a hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct CardCount {
    counts: [u16; 10],
    sum: u16,
    total: u16,
}

impl CardCount {
    pub fn new(counts: &[u16; 10]) -> CardCount {
        let mut card_count = CardCount {
            counts: *counts,
            sum: 0,
            total: 0,
        };

        card_count.propagate_counts();

        card_count
    }

    /// Standard composition: four of each value per deck, sixteen ten-valued cards.
    pub fn with_number_of_decks(number_of_decks: u8) -> CardCount {
        let mut counts = [(number_of_decks as u16) * 4; 10];
        counts[9] = (number_of_decks as u16) * 16;
        Self::new(&counts)
    }

    /// Add a card of given card value.
    ///
    /// Note that this method won't check if the card value is valid.
    pub fn add_card(&mut self, card_value: u8) {
        let index = (card_value - 1) as usize;
        self.counts[index] += 1;
        self.sum += card_value as u16;
        self.total += 1;
    }

    /// Remove a card of given card value.
    ///
    /// Note that this method won't check if the card value is valid. Callers must
    /// make sure the count of the given value is not already 0.
    pub fn remove_card(&mut self, card_value: u8) {
        let index = (card_value - 1) as usize;
        self.counts[index] -= 1;
        self.sum -= card_value as u16;
        self.total -= 1;
    }

    /// Note that this method treats Ace as 1.
    pub fn get_sum(&self) -> u16 {
        self.sum
    }

    pub fn get_total(&self) -> u16 {
        self.total
    }

    pub fn counts(&self) -> &[u16; 10] {
        &self.counts
    }

    pub fn is_soft(&self) -> bool {
        self.counts[0] > 0
    }

    pub fn bust(&self) -> bool {
        self.sum > 21
    }

    pub fn is_natural(&self) -> bool {
        self.total == 2 && self.counts[0] == 1 && self.counts[9] == 1
    }

    /// Best total, counting one Ace as 11 when that does not bust.
    pub fn get_actual_sum(&self) -> u16 {
        if self.is_soft() && self.sum + 10 <= 21 {
            self.sum + 10
        } else {
            self.sum
        }
    }

    fn propagate_counts(&mut self) {
        self.sum = 0;
        self.total = 0;
        for i in 0..self.counts.len() {
            self.sum += ((i + 1) as u16) * self.counts[i];
            self.total += self.counts[i];
        }
    }
}

impl Index<u8> for CardCount {
    type Output = u16;
    fn index(&self, index: u8) -> &Self::Output {
        &self.counts[(index - 1) as usize]
    }
}
