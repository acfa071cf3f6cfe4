//! This module contains all functions related to taking input from the players. They all use the
//! `dialoguer` crate to process the input.
//!
//! Player names are validated right in the prompt. Country entries are not: a blank entry goes to
//! the controller like any other, so that it is reported the same way as every other failed turn.

use anyhow::Result;
use console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};

/// Typing this instead of a country ends the current game.
pub(crate) const QUIT_COMMAND: &str = "/quit";

/// What a player typed at the country prompt.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum TurnInput {
    /// A country to submit, exactly as typed.
    Country(String),
    /// The player asked to stop the game.
    Quit,
}

/// This function shows an alert and blocks until it is acknowledged with any key. The message is
/// plain text; it is printed in bold red as a whole.
pub(crate) fn acknowledge(term: &Term, message: &str) -> Result<()> {
    term.write_line(&format!("{}", style(message).bold().red()))?;
    term.write_line(&format!("{}", style("Press any key to continue").dim()))?;
    let _ = term.read_key()?;

    Ok(())
}

/// Sorts raw prompt text into a command or a country.
pub(crate) fn parse_turn(input: String) -> TurnInput {
    if input.trim().eq_ignore_ascii_case(QUIT_COMMAND) {
        TurnInput::Quit
    } else {
        TurnInput::Country(input)
    }
}

/// This function asks whether the players want another game once one is over.
pub(crate) fn play_again(term: &Term) -> Result<bool> {
    let again = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("{}", style("Play another game?").bold()))
        .default(true)
        .interact_on(term)?;

    Ok(again)
}

/// This function is in charge of taking the country for the current turn. Blank input is let
/// through on purpose; see the module documentation.
pub(crate) fn take_country(term: &Term, turn: &str, draft: &str) -> Result<TurnInput> {
    let input: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "{} {}",
            style(turn).bold(),
            style(format!("(country, or {QUIT_COMMAND})")).dim()
        ))
        .with_initial_text(draft)
        .allow_empty(true)
        .interact_text_on(term)?;

    Ok(parse_turn(input))
}

/// This function is in charge of taking a player's name. The prompt starts out with `initial`, so
/// names given on the command line or in a previous game only need confirming.
pub(crate) fn take_name(term: &Term, label: &str, initial: &str) -> Result<String> {
    let name: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("{}", style(label).bold()))
        .with_initial_text(initial)
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Please enter a name")
            } else {
                Ok(())
            }
        })
        .interact_text_on(term)?;

    Ok(name.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_quit_command_is_recognised_loosely() {
        assert_eq!(parse_turn("/quit".to_owned()), TurnInput::Quit, "exact");
        assert_eq!(parse_turn("  /QUIT ".to_owned()), TurnInput::Quit, "padded and shouting");
    }

    #[test]
    fn everything_else_is_a_country_kept_as_typed() {
        assert_eq!(
            parse_turn(" Peru ".to_owned()),
            TurnInput::Country(" Peru ".to_owned()),
            "trimming is the controller's job"
        );
        assert_eq!(
            parse_turn("   ".to_owned()),
            TurnInput::Country("   ".to_owned()),
            "blank input still goes to the controller"
        );
    }
}
