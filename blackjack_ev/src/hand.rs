use crate::error::check_card;
use crate::{CardCount, EvResult};

/// Cards of a single player hand, in the order they were dealt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hand {
    cards: Vec<u8>,
    card_count: CardCount,
    from_split: bool,
}

impl Hand {
    pub fn new(cards: &[u8]) -> EvResult<Hand> {
        let mut hand = Hand {
            cards: Vec::with_capacity(cards.len().max(3)),
            card_count: CardCount::default(),
            from_split: false,
        };
        for &card in cards {
            hand.receive_card(check_card(card)?);
        }
        Ok(hand)
    }

    /// One of the two hands created by splitting a pair of the given value.
    pub fn from_split(card: u8) -> EvResult<Hand> {
        let mut hand = Hand::new(&[card])?;
        hand.from_split = true;
        Ok(hand)
    }

    /// Returns a copy of this hand with one more card.
    pub fn with_card(&self, card: u8) -> EvResult<Hand> {
        let mut hand = self.clone();
        hand.receive_card(check_card(card)?);
        Ok(hand)
    }

    fn receive_card(&mut self, card: u8) {
        self.cards.push(card);
        self.card_count.add_card(card);
    }

    pub fn cards(&self) -> &[u8] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn is_from_split(&self) -> bool {
        self.from_split
    }

    /// Order-independent signature. Hands holding the same cards share it.
    pub fn signature(&self) -> CardCount {
        self.card_count
    }

    /// Total with every Ace counted as 1.
    pub fn hard_total(&self) -> u16 {
        self.card_count.get_sum()
    }

    /// Total with one Ace counted as 11, if the hand has an Ace that can be used that way.
    pub fn soft_total(&self) -> Option<u16> {
        if self.card_count.is_soft() && self.hard_total() + 10 <= 21 {
            Some(self.hard_total() + 10)
        } else {
            None
        }
    }

    pub fn best_total(&self) -> u16 {
        self.card_count.get_actual_sum()
    }

    /// Exactly two cards of the same value. All ten-valued cards count as equal.
    pub fn is_pair(&self) -> bool {
        self.cards.len() == 2 && self.cards[0] == self.cards[1]
    }

    pub fn is_busted(&self) -> bool {
        self.card_count.bust()
    }

    pub fn is_natural_blackjack(&self) -> bool {
        !self.from_split && self.card_count.is_natural()
    }
}
