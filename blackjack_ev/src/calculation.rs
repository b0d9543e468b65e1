use crate::dealer::DealerModel;
use crate::decision::{ActionEvs, Capabilities};
use crate::error::check_card;
use crate::{CardCount, EvError, EvResult, Hand, PeekRule, Rules, ShoeState, StateArray};

/// A hand cannot hold more cards than this without busting (21 Aces make 21).
pub const MAX_HAND_CARDS: usize = 22;

/// Split budgets above this are treated as a misconfiguration rather than searched.
pub const MAX_SPLIT_DEPTH: u8 = 8;

const SURRENDER_EXPECTATION: f64 = -0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct HandKey {
    hand: CardCount,
    from_split: bool,
    dealer_up_card: u8,
    shoe: CardCount,
    splits_remaining: u8,
}

/// Computes expectations of every action for one player decision.
///
/// An evaluator is built for one top-level call. Its caches are keyed by the exact
/// shoe composition and are dropped with the evaluator.
pub struct HandEvaluator<'a> {
    rule: &'a Rules,
    dealer_up_card: u8,
    capabilities: Capabilities,
    dealer: DealerModel<'a>,
    ex_max: StateArray<HandKey, f64>,
}

impl<'a> HandEvaluator<'a> {
    pub fn new(rule: &'a Rules, dealer_up_card: u8, capabilities: Capabilities) -> EvResult<Self> {
        rule.validate()?;
        let dealer_up_card = check_card(dealer_up_card)?;
        if rule.max_splits > MAX_SPLIT_DEPTH {
            return Err(EvError::RecursionLimit {
                what: "split budget",
                depth: rule.max_splits as usize,
                limit: MAX_SPLIT_DEPTH as usize,
            });
        }
        Ok(Self {
            rule,
            dealer_up_card,
            capabilities,
            dealer: DealerModel::new(rule),
            ex_max: StateArray::with_capacity(1 << 10),
        })
    }

    pub fn cached_states(&self) -> (usize, usize) {
        (self.ex_max.len(), self.dealer.cached_states())
    }

    /// Expectation of each action for the given hand, in units of the original
    /// wager. Actions that are not legal for the hand are `None`.
    pub fn calculate_action_evs(
        &mut self,
        hand: &Hand,
        shoe: &ShoeState,
        splits_used: u8,
    ) -> EvResult<ActionEvs> {
        if hand.len() < 2 {
            return Err(EvError::IllegalAction(String::from(
                "a hand needs at least two cards before acting",
            )));
        }
        if hand.len() > MAX_HAND_CARDS {
            return Err(EvError::RecursionLimit {
                what: "hand length",
                depth: hand.len(),
                limit: MAX_HAND_CARDS,
            });
        }
        if hand.is_busted() {
            return Err(EvError::IllegalAction(String::from(
                "no action is possible on a busted hand",
            )));
        }
        if splits_used > self.rule.max_splits {
            return Err(EvError::IllegalAction(format!(
                "{} splits used, but only {} allowed",
                splits_used, self.rule.max_splits
            )));
        }
        let from_split = hand.is_from_split() || splits_used > 0;
        let splits_remaining = self.rule.max_splits - splits_used;
        let counts = hand.signature();
        let shoe = shoe.signature();

        let mut evs = ActionEvs {
            stand: Some(self.calculate_stand_expectation(&counts, from_split, &shoe, 1.0)?),
            ..Default::default()
        };

        let split_aces_done = from_split
            && self.rule.split_aces_one
            && hand.len() == 2
            && hand.cards()[0] == 1;
        if hand.is_natural_blackjack() || split_aces_done {
            return Ok(evs);
        }

        if self.can_hit(&counts, &shoe) {
            evs.hit = Some(self.calculate_hit_expectation(&counts, &shoe)?);
        }
        if self.can_double(&counts, from_split, &shoe) {
            evs.double = Some(self.calculate_double_expectation(&counts, &shoe)?);
        }
        if self.can_split(hand.is_pair(), splits_remaining, &shoe) {
            evs.split = Some(self.calculate_split_expectation(
                hand.cards()[0],
                &shoe,
                splits_remaining,
            )?);
        }
        if self.rule.late_surrender
            && self.capabilities.can_surrender
            && hand.len() == 2
            && !from_split
        {
            evs.surrender = Some(SURRENDER_EXPECTATION);
        }

        let (hands, dealer_states) = self.cached_states();
        log::debug!(
            "evaluated {:?} against {}: {} hand states, {} dealer states",
            hand.cards(),
            self.dealer_up_card,
            hands,
            dealer_states
        );
        Ok(evs)
    }

    fn can_hit(&self, hand: &CardCount, shoe: &CardCount) -> bool {
        hand.get_actual_sum() < 21 && shoe.get_total() > 0
    }

    fn can_double(&self, hand: &CardCount, from_split: bool, shoe: &CardCount) -> bool {
        hand.get_total() == 2
            && self.capabilities.can_double
            && (!from_split || self.rule.das)
            && shoe.get_total() > 0
    }

    fn can_split(&self, is_pair: bool, splits_remaining: u8, shoe: &CardCount) -> bool {
        is_pair && splits_remaining > 0 && self.capabilities.can_split && shoe.get_total() > 0
    }

    /// Best expectation of a hand that may still act. Surrender is not offered
    /// here: it is only available before any other action.
    fn memoization_find_max_expectation(
        &mut self,
        hand: &CardCount,
        from_split: bool,
        shoe: &CardCount,
        splits_remaining: u8,
    ) -> EvResult<f64> {
        // Split depth is bounded separately, by `splits_remaining`.
        let cards = hand.get_total() as usize;
        if cards > MAX_HAND_CARDS {
            return Err(EvError::RecursionLimit {
                what: "hand length",
                depth: cards,
                limit: MAX_HAND_CARDS,
            });
        }

        // Past two cards, neither the split origin nor the split budget changes
        // what the hand can do.
        let two_cards = hand.get_total() == 2;
        let is_pair = two_cards && hand.counts().iter().any(|c| *c == 2);
        let key = HandKey {
            hand: *hand,
            from_split: from_split && two_cards,
            dealer_up_card: self.dealer_up_card,
            shoe: *shoe,
            splits_remaining: if is_pair { splits_remaining } else { 0 },
        };
        if let Some(ex) = self.ex_max.get(&key) {
            return Ok(*ex);
        }

        let mut ex_max = self.calculate_stand_expectation(hand, key.from_split, shoe, 1.0)?;
        let natural = !key.from_split && hand.is_natural();
        if !natural {
            if self.can_hit(hand, shoe) {
                let ex = self.calculate_hit_expectation(hand, shoe)?;
                ex_max = ex_max.max(ex);
            }
            if self.can_double(hand, key.from_split, shoe) {
                let ex = self.calculate_double_expectation(hand, shoe)?;
                ex_max = ex_max.max(ex);
            }
            if self.can_split(is_pair, key.splits_remaining, shoe) {
                let card = (hand.get_sum() / 2) as u8;
                let ex = self.calculate_split_expectation(card, shoe, key.splits_remaining)?;
                ex_max = ex_max.max(ex);
            }
        }

        self.ex_max.insert(key, ex_max)?;
        Ok(ex_max)
    }

    /// Expectation of standing with the given wager multiplier.
    fn calculate_stand_expectation(
        &mut self,
        hand: &CardCount,
        from_split: bool,
        shoe: &CardCount,
        wager: f64,
    ) -> EvResult<f64> {
        if hand.bust() {
            return Ok(-wager);
        }
        let odds = self
            .dealer
            .distribution(self.dealer_up_card, &ShoeState::new(*shoe))?;

        // Player natural Blackjack is settled before the dealer draws.
        if !from_split && hand.is_natural() {
            let p_push = match self.rule.peek_rule {
                PeekRule::NoPeek => odds.p_total(21),
                PeekRule::Us | PeekRule::Enhc => odds.p_blackjack(),
            };
            return Ok(wager * self.rule.bj_payout * (1.0 - p_push));
        }

        let player_sum = hand.get_actual_sum();
        let mut win = odds.p_bust();
        let mut lose = odds.p_blackjack();
        for dealer_sum in 17..=21 {
            let p = odds.p_total(dealer_sum);
            if player_sum > dealer_sum {
                win += p;
            } else if player_sum < dealer_sum {
                lose += p;
            }
        }
        Ok(wager * (win - lose))
    }

    /// Expectation of taking one card, then playing on optimally.
    fn calculate_hit_expectation(&mut self, hand: &CardCount, shoe: &CardCount) -> EvResult<f64> {
        let current_shoe_total = shoe.get_total() as f64;
        let mut ex_hit = 0.0;
        for card_value in 1..=10 {
            if shoe[card_value] == 0 {
                continue;
            }
            let p = shoe[card_value] as f64 / current_shoe_total;

            let mut next_hand = *hand;
            next_hand.add_card(card_value);
            if next_hand.bust() {
                ex_hit -= p;
                continue;
            }
            let mut next_shoe = *shoe;
            next_shoe.remove_card(card_value);

            let ex = self.memoization_find_max_expectation(&next_hand, false, &next_shoe, 0)?;
            ex_hit += p * ex;
        }
        Ok(ex_hit)
    }

    /// Expectation of doubling: one card for twice the wager, then stand.
    fn calculate_double_expectation(&mut self, hand: &CardCount, shoe: &CardCount) -> EvResult<f64> {
        let current_shoe_total = shoe.get_total() as f64;
        let mut ex_double = 0.0;
        for card_value in 1..=10 {
            if shoe[card_value] == 0 {
                continue;
            }
            let p = shoe[card_value] as f64 / current_shoe_total;

            let mut next_hand = *hand;
            next_hand.add_card(card_value);
            let mut next_shoe = *shoe;
            next_shoe.remove_card(card_value);

            ex_double += p * self.calculate_stand_expectation(&next_hand, false, &next_shoe, 2.0)?;
        }
        Ok(ex_double)
    }

    /// Expectation of splitting a pair of `card`, summed over both new hands.
    ///
    /// Both hands draw their second card from the same shoe, so they have the same
    /// expectation and one of them is computed.
    fn calculate_split_expectation(
        &mut self,
        card: u8,
        shoe: &CardCount,
        splits_remaining: u8,
    ) -> EvResult<f64> {
        let forced_stand = card == 1 && self.rule.split_aces_one;
        let current_shoe_total = shoe.get_total() as f64;

        let mut ex_single_hand = 0.0;
        for card_value in 1..=10 {
            if shoe[card_value] == 0 {
                continue;
            }
            let p = shoe[card_value] as f64 / current_shoe_total;

            let mut next_hand = CardCount::default();
            next_hand.add_card(card);
            next_hand.add_card(card_value);
            let mut next_shoe = *shoe;
            next_shoe.remove_card(card_value);

            let ex = if forced_stand {
                self.calculate_stand_expectation(&next_hand, true, &next_shoe, 1.0)?
            } else {
                self.memoization_find_max_expectation(
                    &next_hand,
                    true,
                    &next_shoe,
                    splits_remaining - 1,
                )?
            };
            ex_single_hand += p * ex;
        }
        Ok(2.0 * ex_single_hand)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::get_typical_rule;
    use super::*;
    use crate::dealer::add_card_to_total;
    use approx::assert_abs_diff_eq;

    fn evaluate(rule: &Rules, hand: &[u8], dealer_up_card: u8, shoe: &ShoeState) -> ActionEvs {
        let mut evaluator = HandEvaluator::new(rule, dealer_up_card, Capabilities::all()).unwrap();
        let hand = Hand::new(hand).unwrap();
        evaluator.calculate_action_evs(&hand, shoe, 0).unwrap()
    }

    /// Stand expectation by playing out every dealer draw sequence, no caching.
    fn enumerate_stand(
        player_sum: u16,
        total: u16,
        soft: bool,
        shoe: CardCount,
        h17: bool,
        p: f64,
    ) -> f64 {
        if total > 21 {
            return p;
        }
        if total >= 17 && !(total == 17 && soft && h17) {
            return match player_sum.cmp(&total) {
                std::cmp::Ordering::Greater => p,
                std::cmp::Ordering::Equal => 0.0,
                std::cmp::Ordering::Less => -p,
            };
        }
        let mut ex = 0.0;
        for card in 1..=10u8 {
            if shoe[card] == 0 {
                continue;
            }
            let q = shoe[card] as f64 / shoe.get_total() as f64;
            let (t, s) = add_card_to_total(total, soft, card);
            let mut next = shoe;
            next.remove_card(card);
            ex += enumerate_stand(player_sum, t, s, next, h17, p * q);
        }
        ex
    }

    #[test]
    fn stand_matches_direct_enumeration() {
        let rule = get_typical_rule();
        // Single deck with the player's 10, 8 and the dealer's 6 removed.
        let shoe = ShoeState::with_number_of_decks(1)
            .with_draws(&[10, 8, 6])
            .unwrap();
        let evs = evaluate(&rule, &[10, 8], 6, &shoe);
        let expected = enumerate_stand(18, 6, false, shoe.signature(), rule.h17, 1.0);
        assert_abs_diff_eq!(evs.stand.unwrap(), expected, epsilon = 1e-9);
    }

    #[test]
    fn hard_sixteen_hit_matches_one_level_expansion() {
        // Hitting 16 against a 10 with only small cards and tens left.
        let rule = Rules {
            peek_rule: PeekRule::NoPeek,
            ..get_typical_rule()
        };
        let shoe = ShoeState::from_counts(&[0, 0, 0, 0, 1, 0, 0, 0, 0, 6]);
        let evs = evaluate(&rule, &[10, 6], 10, &shoe);
        // A ten busts the player (6 of 7). A five makes 21 (1 of 7); the dealer then
        // holds 10 plus a ten from the six remaining and stands on 20.
        assert_abs_diff_eq!(evs.hit.unwrap(), -6.0 / 7.0 + 1.0 / 7.0, epsilon = 1e-12);
        // Standing on 16 loses to any dealer total: the hole card is a five (15, then
        // a ten busts) or a ten (20).
        assert_abs_diff_eq!(evs.stand.unwrap(), 1.0 / 7.0 - 6.0 / 7.0, epsilon = 1e-12);
    }

    #[test]
    fn double_is_one_card_for_twice_the_wager() {
        let rule = Rules {
            peek_rule: PeekRule::NoPeek,
            ..get_typical_rule()
        };
        // Only tens left: the player's 11 becomes 21, the dealer's 6 becomes 16 and busts.
        let shoe = ShoeState::from_counts(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 10]);
        let evs = evaluate(&rule, &[5, 6], 6, &shoe);
        assert_abs_diff_eq!(evs.double.unwrap(), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(evs.hit.unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(evs.stand.unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn natural_pays_the_blackjack_premium() {
        let rule = get_typical_rule();
        let shoe = ShoeState::with_number_of_decks(1)
            .with_draws(&[1, 10, 9])
            .unwrap();
        let evs = evaluate(&rule, &[1, 10], 9, &shoe);
        assert_abs_diff_eq!(evs.stand.unwrap(), 1.5, epsilon = 1e-12);
        assert_eq!(evs.hit, None);
        assert_eq!(evs.double, None);
        assert_eq!(evs.split, None);
        assert_eq!(evs.surrender, None);
    }

    #[test]
    fn natural_pushes_against_dealer_blackjack_without_peek() {
        let rule = Rules {
            peek_rule: PeekRule::Enhc,
            ..get_typical_rule()
        };
        let shoe = ShoeState::with_number_of_decks(1)
            .with_draws(&[1, 10, 1])
            .unwrap();
        let evs = evaluate(&rule, &[1, 10], 1, &shoe);
        let p_bj = 15.0 / 49.0;
        assert_abs_diff_eq!(evs.stand.unwrap(), 1.5 * (1.0 - p_bj), epsilon = 1e-12);
    }

    #[test]
    fn surrender_only_on_first_two_cards() {
        let rule = Rules {
            late_surrender: true,
            ..get_typical_rule()
        };
        let shoe = ShoeState::with_number_of_decks(1)
            .with_draws(&[10, 6, 10])
            .unwrap();
        let evs = evaluate(&rule, &[10, 6], 10, &shoe);
        assert_eq!(evs.surrender, Some(-0.5));

        let shoe = shoe.with_draw(2).unwrap();
        let evs = evaluate(&rule, &[10, 4, 2], 10, &shoe);
        assert_eq!(evs.surrender, None);
        assert_eq!(evs.double, None);

        let mut evaluator =
            HandEvaluator::new(&rule, 10, Capabilities::all()).unwrap();
        let hand = Hand::new(&[10, 6]).unwrap();
        let after_split = evaluator.calculate_action_evs(&hand, &shoe, 1).unwrap();
        assert_eq!(after_split.surrender, None);
    }

    #[test]
    fn split_aces_get_one_card_each() {
        let rule = get_typical_rule();
        let shoe = ShoeState::with_number_of_decks(8)
            .with_draws(&[1, 1, 6])
            .unwrap();
        let evs = evaluate(&rule, &[1, 1], 6, &shoe);

        // Two forced stands on Ace plus one card, evaluated independently.
        let mut model = DealerModel::new(&rule);
        let mut expected = 0.0;
        for card in 1..=10u8 {
            let p = shoe.probability_of(card).unwrap();
            let next_shoe = shoe.with_draw(card).unwrap();
            let odds = model.distribution(6, &next_shoe).unwrap();
            let (player_sum, _) = add_card_to_total(11, true, card);
            let mut ex = odds.p_bust() - odds.p_blackjack();
            for dealer_sum in 17..=21 {
                let q = odds.p_total(dealer_sum);
                if player_sum > dealer_sum {
                    ex += q;
                } else if player_sum < dealer_sum {
                    ex -= q;
                }
            }
            expected += p * ex;
        }
        assert_abs_diff_eq!(evs.split.unwrap(), 2.0 * expected, epsilon = 1e-9);
    }

    #[test]
    fn split_disabled_by_budget_or_capability() {
        let rule = Rules {
            max_splits: 1,
            ..get_typical_rule()
        };
        let shoe = ShoeState::with_number_of_decks(1)
            .with_draws(&[8, 8, 8])
            .unwrap();
        let mut evaluator = HandEvaluator::new(&rule, 8, Capabilities::all()).unwrap();
        let hand = Hand::new(&[8, 8]).unwrap();
        let evs = evaluator.calculate_action_evs(&hand, &shoe, 1).unwrap();
        assert_eq!(evs.split, None);

        let capabilities = Capabilities {
            can_split: false,
            ..Capabilities::all()
        };
        let mut evaluator = HandEvaluator::new(&rule, 8, capabilities).unwrap();
        let evs = evaluator.calculate_action_evs(&hand, &shoe, 0).unwrap();
        assert_eq!(evs.split, None);
        assert!(evs.double.is_some());
    }

    #[test]
    fn double_after_split_follows_das() {
        let rule = Rules {
            das: false,
            ..get_typical_rule()
        };
        let shoe = ShoeState::with_number_of_decks(1)
            .with_draws(&[9, 9, 6, 2])
            .unwrap();
        let mut evaluator = HandEvaluator::new(&rule, 6, Capabilities::all()).unwrap();
        let hand = Hand::from_split(9).unwrap().with_card(2).unwrap();
        let evs = evaluator.calculate_action_evs(&hand, &shoe, 1).unwrap();
        assert_eq!(evs.double, None);

        let rule = Rules {
            das: true,
            ..rule
        };
        let mut evaluator = HandEvaluator::new(&rule, 6, Capabilities::all()).unwrap();
        let evs = evaluator.calculate_action_evs(&hand, &shoe, 1).unwrap();
        assert!(evs.double.is_some());
    }

    #[test]
    fn illegal_requests() {
        let rule = get_typical_rule();
        let shoe = ShoeState::with_number_of_decks(1);
        let mut evaluator = HandEvaluator::new(&rule, 6, Capabilities::all()).unwrap();
        let busted = Hand::new(&[10, 9, 5]).unwrap();
        assert!(matches!(
            evaluator.calculate_action_evs(&busted, &shoe, 0),
            Err(EvError::IllegalAction(_))
        ));
        let single = Hand::new(&[10]).unwrap();
        assert!(matches!(
            evaluator.calculate_action_evs(&single, &shoe, 0),
            Err(EvError::IllegalAction(_))
        ));
        let pair = Hand::new(&[4, 4]).unwrap();
        assert!(matches!(
            evaluator.calculate_action_evs(&pair, &shoe, rule.max_splits + 1),
            Err(EvError::IllegalAction(_))
        ));
    }

    #[test]
    fn deep_resplits_within_the_split_limit() {
        // Eight resplits of twos followed by long runs of Aces go more than 22
        // levels deep, while no single hand exceeds 22 cards.
        let rule = Rules {
            max_splits: MAX_SPLIT_DEPTH,
            peek_rule: PeekRule::NoPeek,
            ..get_typical_rule()
        };
        let shoe = ShoeState::from_counts(&[24, 12, 0, 0, 0, 0, 0, 0, 0, 4]);
        let mut evaluator = HandEvaluator::new(&rule, 10, Capabilities::all()).unwrap();
        let hand = Hand::new(&[2, 2]).unwrap();
        let evs = evaluator.calculate_action_evs(&hand, &shoe, 0).unwrap();
        assert!(evs.split.is_some());
        assert!(evs.hit.is_some());

        let rule = Rules {
            max_splits: 3,
            ..rule
        };
        let mut evaluator = HandEvaluator::new(&rule, 10, Capabilities::all()).unwrap();
        let fewer_splits = evaluator.calculate_action_evs(&hand, &shoe, 0).unwrap();
        // Hitting ends the pair, so the split budget does not matter.
        assert_abs_diff_eq!(evs.hit.unwrap(), fewer_splits.hit.unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn overlong_hand_is_rejected() {
        let rule = get_typical_rule();
        let shoe = ShoeState::with_number_of_decks(8);
        let mut evaluator = HandEvaluator::new(&rule, 6, Capabilities::all()).unwrap();
        let hand = Hand::new(&[1; MAX_HAND_CARDS + 1]).unwrap();
        assert!(matches!(
            evaluator.calculate_action_evs(&hand, &shoe, 0),
            Err(EvError::RecursionLimit {
                what: "hand length",
                depth: 23,
                limit: MAX_HAND_CARDS,
            })
        ));
    }

    #[test]
    fn absurd_split_budget_is_rejected() {
        let rule = Rules {
            max_splits: 200,
            ..get_typical_rule()
        };
        assert!(matches!(
            HandEvaluator::new(&rule, 6, Capabilities::all()),
            Err(EvError::RecursionLimit { .. })
        ));
    }
}
