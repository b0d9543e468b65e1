use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvError {
    #[error("Invalid rules: {0}")]
    Config(String),

    /// `card` is `None` when no card of any value is left to draw.
    #[error("Shoe depleted: no {} left to draw", describe_card(.card))]
    ShoeDepleted { card: Option<u8> },

    #[error("Illegal action: {0}")]
    IllegalAction(String),

    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Recursion limit exceeded: {what} reached {depth} (limit {limit})")]
    RecursionLimit {
        what: &'static str,
        depth: usize,
        limit: usize,
    },

    #[error("Invalid card value {0}: it must be in [1, 10]")]
    InvalidCard(u8),
}

fn describe_card(card: &Option<u8>) -> String {
    match card {
        Some(1) => String::from("Ace"),
        Some(card) => format!("card {}", card),
        None => String::from("card"),
    }
}

pub type EvResult<T> = Result<T, EvError>;

/// Checks that a card value is in [1, 10] (1 stands for Ace, 10 for any ten-valued card).
pub fn check_card(card: u8) -> EvResult<u8> {
    if (1..=10).contains(&card) {
        Ok(card)
    } else {
        Err(EvError::InvalidCard(card))
    }
}
