//! In-memory [`Ledger`] for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::Result;
use crate::fees::FeeConditions;
use crate::ledger::{
    simulation_failure, Inclusion, Invocation, Ledger, SignedEnvelope, Simulation, TxLookup,
};

#[derive(Default)]
struct State {
    fees: Option<FeeConditions>,
    resource_fee: u64,
    /// Keyed by function name, or `function(args)` for argument-specific answers.
    responses: HashMap<String, Value>,
    /// Contract error code raised by a function's simulation.
    failures: HashMap<String, u32>,
    sequences: HashMap<String, i64>,
    lookups: VecDeque<TxLookup>,
    always_pending: bool,
    sent: Vec<SignedEnvelope>,
    simulated: Vec<(Option<String>, Invocation)>,
}

/// Scriptable ledger. Unscripted transactions confirm on the first lookup in
/// ledger 100 and return whatever `respond` registered for their function.
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<State>,
}

fn key_with_args(function: &str, args: &[Value]) -> String {
    format!("{function}({})", Value::Array(args.to_vec()))
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    pub fn set_fee_conditions(&self, fees: FeeConditions) {
        self.with(|s| s.fees = Some(fees));
    }

    pub fn set_resource_fee(&self, fee: u64) {
        self.with(|s| s.resource_fee = fee);
    }

    pub fn respond(&self, function: &str, value: Value) {
        self.with(|s| s.responses.insert(function.to_string(), value));
    }

    pub fn respond_to(&self, function: &str, args: Vec<Value>, value: Value) {
        self.with(|s| s.responses.insert(key_with_args(function, &args), value));
    }

    /// Make simulations of `function` fail with contract error `code`, decoded
    /// against whichever contract the invocation targets.
    pub fn fail(&self, function: &str, code: u32) {
        self.with(|s| s.failures.insert(function.to_string(), code));
    }

    pub fn set_sequence(&self, account: &str, sequence: i64) {
        self.with(|s| s.sequences.insert(account.to_string(), sequence));
    }

    pub fn queue_lookup(&self, lookup: TxLookup) {
        self.with(|s| s.lookups.push_back(lookup));
    }

    pub fn always_pending(&self, pending: bool) {
        self.with(|s| s.always_pending = pending);
    }

    pub fn sent(&self) -> Vec<SignedEnvelope> {
        self.with(|s| s.sent.clone())
    }

    pub fn simulated(&self) -> Vec<(Option<String>, Invocation)> {
        self.with(|s| s.simulated.clone())
    }

    fn response_for(state: &State, invocation: &Invocation) -> Option<Value> {
        state
            .responses
            .get(&key_with_args(&invocation.function, &invocation.args))
            .or_else(|| state.responses.get(&invocation.function))
            .cloned()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn fee_conditions(&self) -> Result<FeeConditions> {
        Ok(self.with(|s| s.fees.unwrap_or(FeeConditions::Flat { price: 100 })))
    }

    async fn latest_ledger(&self) -> Result<u32> {
        Ok(100)
    }

    /// Accounts are funded with sequence 1 unless set otherwise.
    async fn sequence(&self, account: &str) -> Result<i64> {
        Ok(self.with(|s| s.sequences.get(account).copied().unwrap_or(1)))
    }

    async fn simulate(&self, source: Option<&str>, invocation: &Invocation) -> Result<Simulation> {
        self.with(|s| {
            s.simulated
                .push((source.map(str::to_string), invocation.clone()));
            if let Some(code) = s.failures.get(&invocation.function) {
                return Err(simulation_failure(
                    &format!("HostError: Error(Contract, #{code})"),
                    invocation.codes,
                ));
            }
            Ok(Simulation {
                min_resource_fee: s.resource_fee,
                result: Self::response_for(s, invocation),
                latest_ledger: 100,
                resources: None,
                auth: Vec::new(),
            })
        })
    }

    async fn send(&self, envelope: &SignedEnvelope) -> Result<String> {
        self.with(|s| s.sent.push(envelope.clone()));
        Ok(envelope.hash.clone())
    }

    async fn transaction(&self, hash: &str) -> Result<TxLookup> {
        self.with(|s| {
            if s.always_pending {
                return Ok(TxLookup::Pending);
            }
            if let Some(lookup) = s.lookups.pop_front() {
                return Ok(lookup);
            }
            let return_value = s
                .sent
                .iter()
                .rev()
                .find(|env| env.hash == hash)
                .and_then(|env| Self::response_for(s, &env.envelope.invocation));
            Ok(TxLookup::Success(Inclusion {
                ledger: 100,
                closed_at: None,
                return_value,
            }))
        })
    }
}
