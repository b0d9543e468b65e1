use blackjack_ev::{
    Action, ActionEvs, Capabilities, EvBackend, EvError, EvResult, Hand, Rules, ShoeState,
};

// Pseudo-expectations handed to the decision engine. Only their order matters.
const PREFERRED: f64 = 1.0;
const FALLBACK: f64 = 0.5;
const AVAILABLE: f64 = 0.0;

type Entry = (Action, Option<Action>);

const H: Entry = (Action::Hit, None);
const S: Entry = (Action::Stand, None);
const P: Entry = (Action::Split, None);
const DH: Entry = (Action::Double, Some(Action::Hit));
const DS: Entry = (Action::Double, Some(Action::Stand));
const RH: Entry = (Action::Surrender, Some(Action::Hit));
const RS: Entry = (Action::Surrender, Some(Action::Stand));
const RP: Entry = (Action::Surrender, Some(Action::Split));

// Columns are the dealer up card, Ace first.
const HARD_CHARTS: [[Entry; 10]; 14] = [
    [H, H, H, H, H, H, H, H, H, H], // 5 or less
    [H, H, H, H, H, H, H, H, H, H],
    [H, H, H, H, H, H, H, H, H, H],
    [H, H, H, H, H, H, H, H, H, H],
    [H, H, DH, DH, DH, DH, H, H, H, H],
    [H, DH, DH, DH, DH, DH, DH, DH, DH, H],
    [DH, DH, DH, DH, DH, DH, DH, DH, DH, DH],
    [H, H, H, S, S, S, H, H, H, H],
    [H, S, S, S, S, S, H, H, H, H],
    [H, S, S, S, S, S, H, H, H, H],
    [RH, S, S, S, S, S, H, H, H, RH],
    [RH, S, S, S, S, S, H, H, RH, RH],
    [RS, S, S, S, S, S, S, S, S, S], // 17
    [S, S, S, S, S, S, S, S, S, S],  // 18 or more
];

const SOFT_CHARTS: [[Entry; 10]; 9] = [
    [H, H, H, H, DH, DH, H, H, H, H], // Ace + 2
    [H, H, H, H, DH, DH, H, H, H, H],
    [H, H, H, DH, DH, DH, H, H, H, H],
    [H, H, H, DH, DH, DH, H, H, H, H],
    [H, H, DH, DH, DH, DH, H, H, H, H],
    [H, DS, DS, DS, DS, DS, S, S, H, H],
    [S, S, S, S, S, DS, S, S, S, S],
    [S, S, S, S, S, S, S, S, S, S], // Ace + 9
    [S, S, S, S, S, S, S, S, S, S], // Ace + 10
];

const PAIR_CHARTS: [[Entry; 10]; 10] = [
    [P, P, P, P, P, P, P, P, P, P], // Double Ace
    [H, P, P, P, P, P, P, H, H, H], // Double 2
    [H, P, P, P, P, P, P, H, H, H],
    [H, H, H, H, P, P, H, H, H, H],
    [H, DH, DH, DH, DH, DH, DH, DH, DH, H],
    [H, P, P, P, P, P, H, H, H, H],
    [H, P, P, P, P, P, P, H, H, H],
    [RP, P, P, P, P, P, P, P, P, P],
    [S, P, P, P, P, P, S, P, P, S],
    [S, S, S, S, S, S, S, S, S, S], // Double 10
];

/// Multi-deck H17 basic strategy chart.
///
/// It ignores the shoe composition, so its expectations only rank the actions
/// of a hand and cannot be compared across hands.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicStrategyBackend;

impl BasicStrategyBackend {
    fn chart_entry(hand: &Hand, dealer_up_card: u8, can_split: bool) -> Entry {
        let col = (dealer_up_card - 1) as usize;
        let cards = hand.cards();

        if can_split && hand.is_pair() {
            let row = (cards[0] - 1) as usize;
            PAIR_CHARTS[row][col]
        } else if let Some(soft_total) = hand.soft_total() {
            // Soft total less the Ace counted as 11.
            let rest = (soft_total - 11).clamp(2, 10);
            SOFT_CHARTS[(rest - 2) as usize][col]
        } else {
            let row = hand.hard_total().clamp(5, 18) - 5;
            HARD_CHARTS[row as usize][col]
        }
    }
}

impl EvBackend for BasicStrategyBackend {
    fn name(&self) -> &'static str {
        "basic"
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
        rule.validate()?;
        let dealer_up_card = blackjack_ev::check_card(dealer_up_card)?;
        if hand.len() < 2 || hand.is_busted() {
            return Err(EvError::IllegalAction(format!(
                "cannot act on hand {:?}",
                hand.cards()
            )));
        }
        if splits_used > rule.max_splits {
            return Err(EvError::IllegalAction(format!(
                "{} splits used, but only {} allowed",
                splits_used, rule.max_splits
            )));
        }

        let mut evs = ActionEvs {
            stand: Some(AVAILABLE),
            ..Default::default()
        };
        let from_split = hand.is_from_split() || splits_used > 0;
        let split_aces_done =
            from_split && rule.split_aces_one && hand.len() == 2 && hand.cards()[0] == 1;
        if hand.is_natural_blackjack() || split_aces_done {
            return Ok(evs);
        }

        let has_cards = !shoe.is_empty();
        let two_cards = hand.len() == 2;
        if hand.best_total() < 21 && has_cards {
            evs.hit = Some(AVAILABLE);
        }
        if two_cards && capabilities.can_double && (!from_split || rule.das) && has_cards {
            evs.double = Some(AVAILABLE);
        }
        let can_split =
            hand.is_pair() && splits_used < rule.max_splits && capabilities.can_split && has_cards;
        if can_split {
            evs.split = Some(AVAILABLE);
        }
        if rule.late_surrender && capabilities.can_surrender && two_cards && !from_split {
            evs.surrender = Some(AVAILABLE);
        }

        let (preferred, fallback) = Self::chart_entry(hand, dealer_up_card, can_split);
        let mut rank = |action: Action, value: f64| {
            let slot = match action {
                Action::Stand => &mut evs.stand,
                Action::Hit => &mut evs.hit,
                Action::Double => &mut evs.double,
                Action::Split => &mut evs.split,
                Action::Surrender => &mut evs.surrender,
            };
            if let Some(ex) = slot {
                *ex = value;
            }
        };
        rank(preferred, PREFERRED);
        if let Some(fallback) = fallback {
            rank(fallback, FALLBACK);
        }
        Ok(evs)
    }
}
