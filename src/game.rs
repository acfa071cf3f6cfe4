//! The game module wires the library together into the interactive terminal game.
//!
//! It contains the `init()` function that parses the command line, sets up logging and runs the
//! game loop, as well as the welcome message and the loop over the turns of a single game.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use console::{style, Term};
use indicatif::ProgressBar;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::geocoder::{Nominatim, DEFAULT_ENDPOINT, DEFAULT_USER_AGENT};
use crate::input::{acknowledge, play_again, take_country, take_name, TurnInput};
use crate::map::{Atlas, WORLD_ZOOM};
use crate::session::Controller;
use crate::view::Board;

/// This struct holds the command line configuration. Every option can also be set through the
/// environment, which is handy for keeping the player names around between runs.
#[expect(
    clippy::arbitrary_source_item_ordering,
    reason = "The options show up in --help in this order, players first."
)]
#[derive(Parser)]
#[command(name = "countries", version, about)]
#[command(next_line_help = true)]
struct Cli {
    /// The name of the player who moves first.
    ///
    /// You will be asked for it when it is not given here.
    #[arg(long, env = "COUNTRIES_PLAYER_ONE", value_name = "NAME")]
    player_one: Option<String>,
    /// The name of the player who moves second.
    ///
    /// You will be asked for it when it is not given here.
    #[arg(long, env = "COUNTRIES_PLAYER_TWO", value_name = "NAME")]
    player_two: Option<String>,
    /// The Nominatim search endpoint countries are looked up with.
    #[arg(long, env = "COUNTRIES_GEOCODER_URL", value_name = "URL")]
    #[arg(default_value = DEFAULT_ENDPOINT, value_parser = verify_endpoint)]
    endpoint: String,
    /// The user agent sent along with every lookup.
    ///
    /// The public Nominatim instance asks every application to identify itself.
    #[arg(long, env = "COUNTRIES_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
    /// How many seconds a lookup may take before it counts as failed.
    #[arg(long, value_name = "SECONDS", default_value_t = 10)]
    #[arg(value_parser = clap::value_parser!(u64).range(1..=120))]
    timeout: u64,
    /// The zoom level the map jumps to when a country is found; 2 shows the whole world.
    #[arg(long, default_value_t = WORLD_ZOOM)]
    #[arg(value_parser = clap::value_parser!(u8).range(0..=18))]
    zoom: u8,
    /// Which log events to show, as a tracing filter directive such as "debug" or
    /// "countries=info".
    #[arg(long, env = "COUNTRIES_LOG", value_name = "FILTER", default_value = "warn")]
    log: String,
    /// Append the log to this file instead of printing it to the standard error.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

/// The controller as the terminal game runs it.
type TerminalGame = Controller<Nominatim, Atlas, Board>;

/// Initializes the game and runs it until the players are done. This is a `main()` function of
/// sorts though it is still called from main.rs.
///
/// # Errors
///
/// The function may return any one of the following errors:
///
/// - `io::Error` when the terminal or the log file cannot be used
/// - `dialoguer::Error` when a prompt fails
/// - an error installing the log subscriber
pub fn init() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log, cli.log_file.as_deref())?;

    let term = Term::stdout();
    let geocoder = Nominatim::new(
        &cli.endpoint,
        &cli.user_agent,
        Duration::from_secs(cli.timeout),
    );
    let mut game = Controller::new(geocoder, Atlas::new(), Board::new()).with_zoom(cli.zoom);
    info!(endpoint = %cli.endpoint, timeout = cli.timeout, zoom = cli.zoom, "configured");

    init_message(&term)?;

    let mut first = cli.player_one.unwrap_or_default();
    let mut second = cli.player_two.unwrap_or_default();
    let mut prompt_names = first.trim().is_empty() || second.trim().is_empty();

    loop {
        if prompt_names {
            first = take_name(&term, "Name of the first player", &first)?;
            second = take_name(&term, "Name of the second player", &second)?;
        }
        prompt_names = true;

        if game.start(&first, &second).is_err() {
            show_alerts(&term, &mut game)?;
            continue;
        }

        play(&term, &mut game)?;

        // leave the final board up while asking
        term.clear_screen()?;
        game.view().draw(&term, game.map())?;
        show_recap(&term, &game)?;

        if !play_again(&term)? {
            break Ok(());
        }
    }
}

/// This function shows the welcome message. The screen is cleared first, and the title of the
/// console window is set to the name of the game.
fn init_message(term: &Term) -> Result<()> {
    const MSG: &str = "Welcome to the countries game";
    const RULES: &str = "Take turns naming countries. Each one has to start with the last letter \
of the country before it. Found countries score a point, misses cost one.";

    term.clear_screen()?;
    term.set_title("countries");

    term.write_line(&format!("{}", style(MSG).bold()))?;
    term.write_line(&format!("{}", style(RULES).dim()))?;
    term.write_line("")?;
    Ok(())
}

/// Installs the `tracing` subscriber, writing either to the standard error or to `log_file`.
fn init_tracing(filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(filter)?;
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time();

    let installed = match log_file {
        Some(path) => {
            let file = File::options().create(true).append(true).open(path)?;
            subscriber
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => subscriber.with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|err| anyhow!("could not install the log subscriber: {err}"))
}

/// Plays turns until someone types the quit command. Each turn redraws the board, takes a country,
/// looks it up behind a spinner and then shows whatever the controller had to say about it.
fn play(term: &Term, game: &mut TerminalGame) -> Result<()> {
    loop {
        term.clear_screen()?;
        game.view().draw(term, game.map())?;

        let turn = game.view().turn_text().to_owned();
        let raw = match take_country(term, &turn, game.view().draft())? {
            TurnInput::Quit => break Ok(()),
            TurnInput::Country(raw) => raw,
        };
        game.view_mut().set_draft(&raw);

        let spinner = ProgressBar::new_spinner();
        spinner.set_message(format!("Looking up {}...", raw.trim()));
        spinner.enable_steady_tick(Duration::from_millis(80));
        let outcome = game.submit_entry(&raw);
        spinner.finish_and_clear();

        if let Err(err) = outcome {
            info!(kind = ?err.kind(), penalty = err.is_penalty(), "turn did not score");
        }

        show_alerts(term, game)?;
    }
}

/// Shows every alert the controller raised, one at a time.
fn show_alerts(term: &Term, game: &mut TerminalGame) -> Result<()> {
    for alert in game.view_mut().take_alerts() {
        acknowledge(term, &alert)?;
    }

    Ok(())
}

/// Lists the countries each player found and where they were found.
fn show_recap(term: &Term, game: &TerminalGame) -> Result<()> {
    let Some(session) = game.session() else {
        return Ok(());
    };

    for (seat, name) in session.players() {
        let found: Vec<String> = session
            .markers(seat)
            .iter()
            .map(|marker| format!("{} {}", marker.label(), marker.at()))
            .collect();
        let found = if found.is_empty() {
            "no countries".to_owned()
        } else {
            found.join(", ")
        };
        term.write_line(&format!("{} found {found}", style(name).bold()))?;
    }

    Ok(())
}

/// This function serves as a value parser for the endpoint option. Only plain HTTP and HTTPS URLs
/// with a host are accepted, since the lookup is a single GET request.
fn verify_endpoint(string: &str) -> Result<String, String> {
    let rest = string
        .strip_prefix("https://")
        .or_else(|| string.strip_prefix("http://"));

    match rest {
        Some(rest) if !rest.is_empty() && !rest.starts_with('/') => Ok(string.to_owned()),
        Some(_) => Err("The endpoint is missing a host.".to_owned()),
        None => Err("The endpoint has to be an http:// or https:// URL.".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn the_command_line_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_point_at_the_public_search() {
        let cli = Cli::try_parse_from(["countries"]).expect("no arguments are required");

        assert_eq!(cli.endpoint, DEFAULT_ENDPOINT, "public endpoint");
        assert_eq!(cli.timeout, 10, "ten second timeout");
        assert_eq!(cli.zoom, WORLD_ZOOM, "whole world");
    }

    #[test]
    fn out_of_range_options_are_refused() {
        assert!(
            Cli::try_parse_from(["countries", "--timeout", "0"]).is_err(),
            "a zero timeout"
        );
        assert!(
            Cli::try_parse_from(["countries", "--zoom", "30"]).is_err(),
            "a zoom past the deepest level"
        );
    }

    #[test]
    fn endpoints_need_a_scheme_and_a_host() {
        assert!(verify_endpoint("https://example.org/search").is_ok(), "https");
        assert!(verify_endpoint("http://localhost:8080/search").is_ok(), "http");
        assert!(verify_endpoint("ftp://example.org").is_err(), "ftp");
        assert!(verify_endpoint("https:///search").is_err(), "no host");
    }
}
