use crate::{
    calculation::HandEvaluator,
    decision::{make_decision, ActionEvs, Capabilities, Decision},
    EvResult, Hand, Rules, ShoeState,
};

/// Anything able to put an expectation on each action of a hand.
///
/// Callers pick an implementation once and only talk to this trait.
pub trait EvBackend {
    fn name(&self) -> &'static str;

    fn action_evs(
        &self,
        hand: &Hand,
        dealer_up_card: u8,
        shoe: &ShoeState,
        rule: &Rules,
        capabilities: &Capabilities,
        splits_used: u8,
    ) -> EvResult<ActionEvs>;

    fn decide(
        &self,
        hand: &Hand,
        dealer_up_card: u8,
        shoe: &ShoeState,
        rule: &Rules,
        capabilities: &Capabilities,
        splits_used: u8,
    ) -> EvResult<Decision> {
        let evs = self.action_evs(hand, dealer_up_card, shoe, rule, capabilities, splits_used)?;
        make_decision(&evs, capabilities)
    }
}

/// Exact composition-dependent expectations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactBackend;

impl EvBackend for ExactBackend {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn action_evs(
        &self,
        hand: &Hand,
        dealer_up_card: u8,
        shoe: &ShoeState,
        rule: &Rules,
        capabilities: &Capabilities,
        splits_used: u8,
    ) -> EvResult<ActionEvs> {
        let mut evaluator = HandEvaluator::new(rule, dealer_up_card, *capabilities)?;
        evaluator.calculate_action_evs(hand, shoe, splits_used)
    }
}
