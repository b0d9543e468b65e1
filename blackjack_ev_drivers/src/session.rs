use blackjack_ev::{
    check_card, compute_insurance, dealer_blackjack_probability, Capabilities, Decision,
    EvBackend, EvResult, Hand, InsuranceDecision, PeekRule, Rules, ShoeState,
};
use serde::Serialize;

/// One shoe at a table. Cards are committed as they are seen, and every query
/// runs against the composition at that moment.
///
/// A session is owned by one caller; run separate sessions for parallel tables.
#[derive(Debug, Clone)]
pub struct Session {
    rules: Rules,
    shoe: ShoeState,
    initial_total: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDecision {
    pub backend: &'static str,
    pub conditioning: &'static str,
    pub p_bj: f64,
    pub remaining_cards: u16,
    #[serde(flatten)]
    pub decision: Decision,
}

impl Session {
    pub fn new(rules: Rules) -> EvResult<Session> {
        rules.validate()?;
        let shoe = rules.fresh_shoe();
        Ok(Session {
            rules,
            shoe,
            initial_total: shoe.total(),
        })
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn shoe(&self) -> &ShoeState {
        &self.shoe
    }

    /// Removes seen cards from the shoe. Either every card is removed or, if
    /// some value runs out, none is.
    pub fn apply_cards(&mut self, cards: &[u8]) -> EvResult<()> {
        self.shoe = self.shoe.with_draws(cards)?;
        log::debug!(
            "applied {} cards, {} of {} left",
            cards.len(),
            self.remaining(),
            self.initial_total
        );
        Ok(())
    }

    /// Starts over with a full shoe.
    pub fn reshuffle(&mut self) {
        self.shoe = self.rules.fresh_shoe();
    }

    pub fn remaining(&self) -> u16 {
        self.shoe.total()
    }

    /// Share of the shoe still undealt.
    pub fn penetration(&self) -> f64 {
        self.remaining() as f64 / self.initial_total as f64
    }

    /// Whether expectations for this up card are conditioned on the dealer
    /// having checked for Blackjack.
    pub fn conditioning(&self, dealer_up_card: u8) -> &'static str {
        match (self.rules.peek_rule, dealer_up_card) {
            (PeekRule::Us, 1 | 10) => "no-dealer-BJ",
            _ => "unconditioned",
        }
    }

    /// The hand and the up card must already have been applied.
    pub fn decide(
        &self,
        backend: &dyn EvBackend,
        hand: &Hand,
        dealer_up_card: u8,
        capabilities: &Capabilities,
        splits_used: u8,
    ) -> EvResult<SessionDecision> {
        let dealer_up_card = check_card(dealer_up_card)?;
        let decision = backend.decide(
            hand,
            dealer_up_card,
            &self.shoe,
            &self.rules,
            capabilities,
            splits_used,
        )?;
        let p_bj = if self.shoe.is_empty() {
            0.0
        } else {
            dealer_blackjack_probability(dealer_up_card, &self.shoe)?
        };
        log::info!(
            "{} backend: {:?} against {} -> {} ({:.6})",
            backend.name(),
            hand.cards(),
            dealer_up_card,
            decision.action,
            decision.ev
        );
        Ok(SessionDecision {
            backend: backend.name(),
            conditioning: self.conditioning(dealer_up_card),
            p_bj,
            remaining_cards: self.remaining(),
            decision,
        })
    }

    pub fn insurance(&self, dealer_up_card: u8, hand: Option<&Hand>) -> EvResult<InsuranceDecision> {
        compute_insurance(dealer_up_card, &self.shoe, &self.rules, hand)
    }
}
