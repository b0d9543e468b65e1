pub mod basic_strategy;
pub mod session;

use blackjack_ev::{EvBackend, EvError, ExactBackend, Rules};
use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;

pub use basic_strategy::BasicStrategyBackend;
pub use session::{Session, SessionDecision};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Cannot convert rule: {0}")]
    Rule(#[from] serde::de::value::Error),

    #[error(transparent)]
    Ev(#[from] EvError),

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    #[error("Cannot find home directory")]
    NoHomeDir,

    #[error("Invalid card {0}: expected A, 2-9, T, J, Q or K")]
    InvalidCard(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub rule: ConfigRule,
    #[serde(default)]
    pub advisor: ConfigAdvisor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRule {
    pub number_of_decks: u8,
    pub dealer_hit_on_soft17: bool,
    pub allow_das: bool,
    pub allow_late_surrender: bool,
    pub split_all_limits: u8,
    pub split_aces_one_card: bool,
    pub peek_policy: String,

    pub payout_blackjack: f64,
    pub payout_insurance: f64,
    pub insurance_bet_fraction: f64,
}

impl TryInto<Rules> for ConfigRule {
    type Error = serde::de::value::Error;

    fn try_into(self) -> Result<Rules, Self::Error> {
        let rule = Rules {
            num_decks: self.number_of_decks,
            h17: self.dealer_hit_on_soft17,
            bj_payout: self.payout_blackjack,
            late_surrender: self.allow_late_surrender,
            das: self.allow_das,
            max_splits: self.split_all_limits,
            split_aces_one: self.split_aces_one_card,
            peek_rule: self.peek_policy.parse()?,
            insurance_payout: self.payout_insurance,
            insurance_bet_fraction: self.insurance_bet_fraction,
        };

        Ok(rule)
    }
}

impl From<Rules> for ConfigRule {
    fn from(rule: Rules) -> Self {
        ConfigRule {
            number_of_decks: rule.num_decks,
            dealer_hit_on_soft17: rule.h17,
            allow_das: rule.das,
            allow_late_surrender: rule.late_surrender,
            split_all_limits: rule.max_splits,
            split_aces_one_card: rule.split_aces_one,
            peek_policy: rule.peek_rule.to_string(),
            payout_blackjack: rule.bj_payout,
            payout_insurance: rule.insurance_payout,
            insurance_bet_fraction: rule.insurance_bet_fraction,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigAdvisor {
    /// `exact` or `basic`.
    pub backend: String,
}

impl Default for ConfigAdvisor {
    fn default() -> Self {
        ConfigAdvisor {
            backend: String::from("exact"),
        }
    }
}

impl Config {
    /// Converted and validated house rules.
    pub fn rules(&self) -> Result<Rules, ConfigError> {
        let rule: Rules = self.rule.clone().try_into()?;
        rule.validate()?;
        Ok(rule)
    }
}

impl ConfigAdvisor {
    pub fn backend(&self) -> Result<&'static dyn EvBackend, ConfigError> {
        match self.backend.as_str() {
            "exact" => Ok(&ExactBackend),
            "basic" => Ok(&BasicStrategyBackend),
            other => Err(ConfigError::UnknownBackend(String::from(other))),
        }
    }
}

/// Parses a card as written on the table. All ten-valued cards map to 10.
pub fn parse_card(card: &str) -> Result<u8, ConfigError> {
    match card.trim().to_ascii_uppercase().as_str() {
        "A" | "1" => Ok(1),
        "T" | "J" | "Q" | "K" | "10" => Ok(10),
        other => match other.parse::<u8>() {
            Ok(value) if (2..=9).contains(&value) => Ok(value),
            _ => Err(ConfigError::InvalidCard(String::from(card))),
        },
    }
}

/// Parses a comma separated list of cards, e.g. `A,T,5`.
pub fn parse_cards(cards: &str) -> Result<Vec<u8>, ConfigError> {
    cards
        .split(',')
        .filter(|card| !card.trim().is_empty())
        .map(parse_card)
        .collect()
}

/// Reads the content of a given config file and parses it to a Config.
pub fn parse_config_from_file(filename: &str) -> Result<Config, ConfigError> {
    let file_content = fs::read_to_string(filename)?;
    parse_config(&file_content)
}

pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_yaml::from_str(content)?;
    log::debug!("parsed config: {:?}", config);
    Ok(config)
}
