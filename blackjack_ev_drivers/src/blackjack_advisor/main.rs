use blackjack_ev::{compute_dealer_distribution, Capabilities, Hand, Rules};
use blackjack_ev_drivers::{
    parse_card, parse_cards, parse_config_from_file, Config, ConfigAdvisor, ConfigError, Session,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::process::ExitCode;

const DEFAULT_CONFIG_FILE: &str = ".blackjack_ev.yml";

#[derive(Debug, Parser)]
#[command(author, about, long_about = None)]
struct CommandLineArgs {
    /// The path of the config file. Defaults to ~/.blackjack_ev.yml, or the
    /// standard table when that file does not exist.
    #[arg(short, long)]
    config: Option<String>,

    /// Overrides the backend in the config file: exact or basic
    #[arg(short, long)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct TableArgs {
    /// Dealer up card, e.g. A, 6 or T
    #[arg(short, long)]
    up: String,

    /// Other cards already dealt from this shoe, comma separated
    #[arg(short, long, default_value_t = String::new())]
    seen: String,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Best action for a player hand
    Decide {
        /// Player cards, comma separated, e.g. A,7
        #[arg(long)]
        hand: String,

        #[command(flatten)]
        table: TableArgs,

        #[arg(long, default_value_t = 0)]
        splits_used: u8,

        #[arg(long)]
        no_double: bool,

        #[arg(long)]
        no_split: bool,

        #[arg(long)]
        no_surrender: bool,
    },
    /// Whether to take insurance against an Ace
    Insurance {
        /// Player cards, comma separated
        #[arg(long)]
        hand: Option<String>,

        #[command(flatten)]
        table: TableArgs,
    },
    /// Distribution of the dealer's final hand
    Dealer {
        #[command(flatten)]
        table: TableArgs,
    },
}

#[derive(Debug, Serialize)]
struct DealerReport {
    up: u8,
    conditioning: &'static str,
    remaining_cards: u16,
    outcomes: BTreeMap<String, f64>,
}

fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    if let Some(path) = path {
        return parse_config_from_file(path);
    }

    let home_dir = home::home_dir().ok_or(ConfigError::NoHomeDir)?;
    let config_file_path = home_dir.join(DEFAULT_CONFIG_FILE);
    if !config_file_path.is_file() {
        log::info!(
            "{} not found, using the standard table",
            config_file_path.display()
        );
        return Ok(Config {
            rule: Rules::default().into(),
            advisor: ConfigAdvisor::default(),
        });
    }
    parse_config_from_file(&config_file_path.to_string_lossy())
}

/// Builds a session with the given cards already removed from the shoe.
fn open_session(rules: Rules, dealt: &[u8]) -> Result<Session, ConfigError> {
    let mut session = Session::new(rules)?;
    session.apply_cards(dealt)?;
    Ok(session)
}

fn run(args: CommandLineArgs) -> Result<String, ConfigError> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(backend) = args.backend {
        config.advisor.backend = backend;
    }
    let rules = config.rules()?;
    let backend = config.advisor.backend()?;

    let output = match args.command {
        Command::Decide {
            hand,
            table,
            splits_used,
            no_double,
            no_split,
            no_surrender,
        } => {
            let hand_cards = parse_cards(&hand)?;
            let up = parse_card(&table.up)?;
            let mut dealt = hand_cards.clone();
            dealt.push(up);
            dealt.extend(parse_cards(&table.seen)?);

            let session = open_session(rules, &dealt)?;
            let hand = Hand::new(&hand_cards)?;
            let capabilities = Capabilities {
                can_double: !no_double,
                can_split: !no_split,
                can_surrender: !no_surrender,
            };
            let decision = session.decide(backend, &hand, up, &capabilities, splits_used)?;
            serde_yaml::to_string(&decision)?
        }
        Command::Insurance { hand, table } => {
            let up = parse_card(&table.up)?;
            // `--hand ""` is the same as leaving it out.
            let hand = match hand {
                Some(hand) => {
                    Some(Hand::new(&parse_cards(&hand)?)?).filter(|hand| !hand.is_empty())
                }
                None => None,
            };
            let mut dealt: Vec<u8> = hand.iter().flat_map(|h| h.cards().to_vec()).collect();
            dealt.push(up);
            dealt.extend(parse_cards(&table.seen)?);

            let session = open_session(rules, &dealt)?;
            let decision = session.insurance(up, hand.as_ref())?;
            serde_yaml::to_string(&decision)?
        }
        Command::Dealer { table } => {
            let up = parse_card(&table.up)?;
            let mut dealt = vec![up];
            dealt.extend(parse_cards(&table.seen)?);

            let session = open_session(rules, &dealt)?;
            let odds = compute_dealer_distribution(up, session.shoe(), session.rules())?;
            let report = DealerReport {
                up,
                conditioning: session.conditioning(up),
                remaining_cards: session.remaining(),
                outcomes: odds
                    .iter()
                    .map(|(outcome, p)| (outcome.to_string(), p))
                    .collect(),
            };
            serde_yaml::to_string(&report)?
        }
    };
    Ok(output)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = CommandLineArgs::parse();
    match run(args) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
