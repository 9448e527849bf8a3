// ABOUTME: Interactive terminal prompts for the migration workflow
// ABOUTME: Wraps dialoguer behind a Prompter trait and exposes one typed step per question

use crate::accounts::{validate_mnemonic, DerivedAccounts, INVALID_MNEMONIC_MESSAGE};
use crate::migration::MigrationAction;
use anyhow::{bail, Context, Result};
use bip39::Mnemonic;
use dialoguer::{theme::ColorfulTheme, Confirm, Password, Select};

pub const GREETING_PROMPT: &str =
    "This tool will check if you have had OLD shareledger address and support with some utilities. Continue?";

pub const MNEMONIC_PROMPT: &str = "Now enter your 12-word passphrase (mnemonic). Input is hidden while you type. \
     Your passphrase stays with you and you only.";

pub const FEE_FUNDS_PROMPT: &str = "Are you sure you have enough SHR to perform transactions?";

pub const ACTION_PROMPT: &str = "Please select one of the following:";

/// The three kinds of question the workflow asks
///
/// Implemented with dialoguer for the terminal and by a scripted double in
/// tests.
pub trait Prompter {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;

    /// Ask for hidden input, re-asking until `validate` accepts it
    fn masked_text(
        &mut self,
        message: &str,
        validate: &dyn Fn(&str) -> std::result::Result<(), String>,
    ) -> Result<String>;

    /// Index of the chosen entry in `choices`
    fn select(&mut self, message: &str, choices: &[&str]) -> Result<usize>;
}

/// dialoguer-backed prompts on the controlling terminal
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(default)
            .interact()
            .context("Failed to get confirmation")
    }

    fn masked_text(
        &mut self,
        message: &str,
        validate: &dyn Fn(&str) -> std::result::Result<(), String>,
    ) -> Result<String> {
        Password::with_theme(&self.theme)
            .with_prompt(message)
            .validate_with(|input: &String| validate(input))
            .interact()
            .context("Failed to read hidden input")
    }

    fn select(&mut self, message: &str, choices: &[&str]) -> Result<usize> {
        Select::with_theme(&self.theme)
            .with_prompt(message)
            .items(choices)
            .default(0)
            .interact()
            .context("Failed to get selection")
    }
}

/// Answers to the two address questions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressConfirmation {
    pub old_confirmed: bool,
    pub new_confirmed: bool,
}

impl AddressConfirmation {
    pub fn both(&self) -> bool {
        self.old_confirmed && self.new_confirmed
    }
}

pub fn confirm_start(prompter: &mut dyn Prompter) -> Result<bool> {
    prompter.confirm(GREETING_PROMPT, true)
}

/// Ask for the mnemonic until a valid phrase is entered
pub fn prompt_mnemonic(prompter: &mut dyn Prompter) -> Result<Mnemonic> {
    let input = prompter.masked_text(MNEMONIC_PROMPT, &|input| {
        validate_mnemonic(input)
            .map(|_| ())
            .map_err(|_| INVALID_MNEMONIC_MESSAGE.to_string())
    })?;
    validate_mnemonic(&input)
}

/// Show both derived addresses and ask the user to recognise each one
///
/// Both questions default to "no"; nothing is assumed about the addresses.
pub fn confirm_addresses(
    prompter: &mut dyn Prompter,
    accounts: &DerivedAccounts,
) -> Result<AddressConfirmation> {
    let old_confirmed = prompter.confirm(
        &format!("Is '{}' your OLD address?", accounts.old.address),
        false,
    )?;
    let new_confirmed = prompter.confirm(
        &format!("Is '{}' your NEW address?", accounts.new.address),
        false,
    )?;

    Ok(AddressConfirmation {
        old_confirmed,
        new_confirmed,
    })
}

pub fn confirm_fee_funds(prompter: &mut dyn Prompter) -> Result<bool> {
    prompter.confirm(FEE_FUNDS_PROMPT, true)
}

pub fn select_action(
    prompter: &mut dyn Prompter,
    actions: &[MigrationAction],
) -> Result<MigrationAction> {
    if actions.is_empty() {
        bail!("No migration actions available to choose from");
    }
    let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
    let index = prompter.select(ACTION_PROMPT, &labels)?;
    actions
        .get(index)
        .copied()
        .with_context(|| format!("Selection {} is out of range", index))
}

/// Action-specific warning that must be accepted before anything is signed
pub fn confirm_action(prompter: &mut dyn Prompter, action: MigrationAction) -> Result<bool> {
    prompter.confirm(action.warning(), true)
}
