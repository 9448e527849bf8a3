// ABOUTME: In-memory ledger and scripted prompter for unit tests
// ABOUTME: Records every ledger call and broadcast so workflows can be asserted

use crate::interactive::Prompter;
use crate::ledger::{
    BroadcastResult, Coin, Delegation, DelegatorReward, FeeAction, LedgerClient, LedgerConnector,
    LedgerMsg, Signer,
};
use crate::migration::Holdings;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon \
                                 abandon abandon abandon abandon abandon about";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBroadcast {
    pub signer: String,
    pub messages: Vec<LedgerMsg>,
}

#[derive(Debug, Default)]
struct FakeState {
    holdings: Holdings,
    native_balance: Option<String>,
    fees: HashMap<FeeAction, String>,
    delivery_failure: Option<(u32, String)>,
    connect_fails: bool,
    calls: Vec<String>,
    broadcasts: Vec<RecordedBroadcast>,
}

/// Ledger double shared between the connector and every session it opens
#[derive(Debug, Clone, Default)]
pub struct FakeLedger {
    state: Arc<Mutex<FakeState>>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holdings(holdings: Holdings) -> Self {
        let ledger = Self::new();
        ledger.state().holdings = holdings;
        ledger
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: &str) {
        self.state().calls.push(call.to_string());
    }

    pub fn set_fee(&self, action: FeeAction, amount: &str) {
        self.state().fees.insert(action, amount.to_string());
    }

    pub fn set_native_balance(&self, amount: &str) {
        self.state().native_balance = Some(amount.to_string());
    }

    pub fn fail_delivery(&self, code: u32, raw_log: &str) {
        self.state().delivery_failure = Some((code, raw_log.to_string()));
    }

    pub fn fail_connect(&self) {
        self.state().connect_fails = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn broadcasts(&self) -> Vec<RecordedBroadcast> {
        self.state().broadcasts.clone()
    }
}

#[async_trait]
impl LedgerConnector for FakeLedger {
    async fn connect(&self) -> Result<Box<dyn LedgerClient>> {
        if self.state().connect_fails {
            bail!("connection refused");
        }
        self.record("connect");
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn all_balances(&self, _address: &str) -> Result<Vec<Coin>> {
        self.record("all_balances");
        Ok(self.state().holdings.balances.clone())
    }

    async fn delegator_delegations(&self, _address: &str) -> Result<Vec<Delegation>> {
        self.record("delegator_delegations");
        Ok(self.state().holdings.delegations.clone())
    }

    async fn delegation_total_rewards(&self, _address: &str) -> Result<Vec<DelegatorReward>> {
        self.record("delegation_total_rewards");
        Ok(self.state().holdings.rewards.clone())
    }

    async fn balance(&self, _address: &str, denom: &str) -> Result<Coin> {
        self.record("balance");
        let amount = self
            .state()
            .native_balance
            .clone()
            .unwrap_or_else(|| "0".to_string());
        Ok(Coin::new(denom, amount))
    }

    async fn fee_by_action(&self, action: FeeAction) -> Result<Coin> {
        self.record("fee_by_action");
        let amount = self
            .state()
            .fees
            .get(&action)
            .cloned()
            .unwrap_or_else(|| "1".to_string());
        Ok(Coin::new("nshr", amount))
    }

    async fn sign_and_broadcast(
        &self,
        signer: &Signer,
        messages: Vec<LedgerMsg>,
    ) -> Result<BroadcastResult> {
        self.record("sign_and_broadcast");
        let signer_address = signer
            .accounts()
            .first()
            .map(|a| a.address.clone())
            .context("signer without account")?;

        let mut state = self.state();
        state.broadcasts.push(RecordedBroadcast {
            signer: signer_address,
            messages,
        });
        let (code, raw_log) = state
            .delivery_failure
            .clone()
            .unwrap_or((0, String::new()));

        Ok(BroadcastResult {
            transaction_hash: format!("{:064X}", state.broadcasts.len()),
            height: 100,
            code,
            raw_log,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Confirm(bool),
    Text(String),
    Select(usize),
}

/// Replays answers in order; fails the test on an unexpected prompt kind
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    pub asked: Vec<String>,
    pub rejected_inputs: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: answers.into(),
            ..Default::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, message: &str) -> Result<Answer> {
        self.asked.push(message.to_string());
        self.answers
            .pop_front()
            .with_context(|| format!("no scripted answer for prompt '{}'", message))
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, message: &str, _default: bool) -> Result<bool> {
        match self.next(message)? {
            Answer::Confirm(answer) => Ok(answer),
            other => bail!("expected a confirmation answer, got {:?}", other),
        }
    }

    fn masked_text(
        &mut self,
        message: &str,
        validate: &dyn Fn(&str) -> std::result::Result<(), String>,
    ) -> Result<String> {
        loop {
            match self.next(message)? {
                Answer::Text(input) => match validate(&input) {
                    Ok(()) => return Ok(input),
                    Err(_) => self.rejected_inputs.push(input),
                },
                other => bail!("expected a text answer, got {:?}", other),
            }
        }
    }

    fn select(&mut self, message: &str, choices: &[&str]) -> Result<usize> {
        match self.next(message)? {
            Answer::Select(index) if index < choices.len() => Ok(index),
            other => bail!("invalid selection {:?} for {} choices", other, choices.len()),
        }
    }
}
