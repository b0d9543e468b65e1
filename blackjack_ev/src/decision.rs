use crate::{EvError, EvResult};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// Expectations closer than this are treated as equal when picking an action.
pub const TIE_TOLERANCE: f64 = 1e-9;

/// Player actions, declared in tie-break order: on equal expectation the action
/// requiring the least commitment wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Stand,
    Hit,
    Double,
    Split,
    Surrender,
}

/// What the table or session allows beyond the rule set, e.g. enough chips to double.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_double: bool,
    pub can_split: bool,
    pub can_surrender: bool,
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            can_double: true,
            can_split: true,
            can_surrender: true,
        }
    }

    pub fn permits(&self, action: Action) -> bool {
        match action {
            Action::Stand | Action::Hit => true,
            Action::Double => self.can_double,
            Action::Split => self.can_split,
            Action::Surrender => self.can_surrender,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Expected payout of each action in units of the original wager. `None` means
/// the action is not applicable to the hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ActionEvs {
    pub stand: Option<f64>,
    pub hit: Option<f64>,
    pub double: Option<f64>,
    pub split: Option<f64>,
    pub surrender: Option<f64>,
}

impl ActionEvs {
    pub fn get(&self, action: Action) -> Option<f64> {
        match action {
            Action::Stand => self.stand,
            Action::Hit => self.hit,
            Action::Double => self.double,
            Action::Split => self.split,
            Action::Surrender => self.surrender,
        }
    }

    /// Expectation of a requested action, failing if it is not applicable.
    pub fn require(&self, action: Action) -> EvResult<f64> {
        self.get(action)
            .ok_or_else(|| EvError::IllegalAction(format!("{} is not available", action)))
    }

    /// Best applicable action, with ties resolved in declaration order of `Action`.
    pub fn best(&self) -> Option<(Action, f64)> {
        let mut best: Option<(Action, f64)> = None;
        for action in Action::iter() {
            let ex = match self.get(action) {
                Some(ex) => ex,
                None => continue,
            };
            match best {
                Some((_, best_ex)) if ex <= best_ex + TIE_TOLERANCE => {}
                _ => best = Some((action, ex)),
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decision {
    pub action: Action,
    pub ev: f64,
    pub evs: ActionEvs,
}

/// Picks the action with the highest expectation among those that are both
/// applicable and permitted.
pub fn make_decision(evs: &ActionEvs, capabilities: &Capabilities) -> EvResult<Decision> {
    let permitted = ActionEvs {
        double: evs.double.filter(|_| capabilities.permits(Action::Double)),
        split: evs.split.filter(|_| capabilities.permits(Action::Split)),
        surrender: evs.surrender.filter(|_| capabilities.permits(Action::Surrender)),
        ..*evs
    };

    let (action, ev) = permitted.best().ok_or_else(|| {
        EvError::IllegalAction(String::from("no action is available for this hand"))
    })?;
    Ok(Decision {
        action,
        ev,
        evs: permitted,
    })
}
