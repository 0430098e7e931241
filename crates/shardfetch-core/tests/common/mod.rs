//! Shared test doubles: a scripted fetcher that tracks concurrency per token
//! and an in-memory persister.
#![allow(dead_code)]

pub mod provider_server;

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io;
use std::sync::Mutex;
use std::time::Duration;

use shardfetch_core::fetch::{ContractData, Fetcher};
use shardfetch_core::persist::Persister;
use shardfetch_core::retry::FetchError;
use shardfetch_core::token_pool::Token;

#[derive(Debug, Default)]
struct InFlight {
    per_token: HashMap<String, (usize, usize)>,
    total: usize,
    peak_total: usize,
}

/// Fetcher that answers after `delay`, failing addresses per their script.
#[derive(Debug, Default)]
pub struct MockFetcher {
    delay: Duration,
    script: Mutex<HashMap<String, VecDeque<FetchError>>>,
    in_flight: Mutex<InFlight>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// `address` fails with `errors` (in order) before succeeding.
    pub fn failing(self, address: &str, errors: Vec<FetchError>) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(address.to_string(), errors.into());
        self
    }

    /// `(address, token id)` for every call, in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called_addresses(&self) -> Vec<String> {
        self.calls().into_iter().map(|(a, _)| a).collect()
    }

    pub fn calls_for(&self, address: &str) -> usize {
        self.calls().iter().filter(|(a, _)| a == address).count()
    }

    /// Highest number of simultaneous calls on `token`.
    pub fn peak_for(&self, token: &str) -> usize {
        self.in_flight
            .lock()
            .unwrap()
            .per_token
            .get(token)
            .map(|(_, peak)| *peak)
            .unwrap_or(0)
    }

    /// Highest number of simultaneous calls overall.
    pub fn peak_total(&self) -> usize {
        self.in_flight.lock().unwrap().peak_total
    }

    fn enter(&self, token: &str) {
        let mut f = self.in_flight.lock().unwrap();
        let entry = f.per_token.entry(token.to_string()).or_default();
        entry.0 += 1;
        entry.1 = entry.1.max(entry.0);
        f.total += 1;
        f.peak_total = f.peak_total.max(f.total);
    }

    fn leave(&self, token: &str) {
        let mut f = self.in_flight.lock().unwrap();
        if let Some(entry) = f.per_token.get_mut(token) {
            entry.0 -= 1;
        }
        f.total -= 1;
    }
}

pub fn contract(address: &str) -> ContractData {
    ContractData {
        address: address.to_string(),
        contract_name: "Token".to_string(),
        compiler_version: "v0.8.19".to_string(),
        source_code: "contract Token {}".to_string(),
        raw: serde_json::json!({
            "SourceCode": "contract Token {}",
            "ContractName": "Token",
            "Address": address,
        }),
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, address: &str, token: &Token) -> Result<ContractData, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((address.to_string(), token.id.clone()));
        self.enter(&token.id);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let scripted = self
            .script
            .lock()
            .unwrap()
            .get_mut(address)
            .and_then(VecDeque::pop_front);
        self.leave(&token.id);
        match scripted {
            Some(err) => Err(err),
            None => Ok(contract(address)),
        }
    }
}

/// Persister keeping records in memory.
#[derive(Debug, Default)]
pub struct MemoryPersister {
    records: Mutex<BTreeMap<String, serde_json::Value>>,
    writes: Mutex<usize>,
}

impl MemoryPersister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records<'a>(addresses: impl IntoIterator<Item = &'a str>) -> Self {
        let p = Self::default();
        for a in addresses {
            p.records
                .lock()
                .unwrap()
                .insert(a.to_string(), serde_json::Value::Null);
        }
        p
    }

    pub fn addresses(&self) -> Vec<String> {
        self.records.lock().unwrap().keys().cloned().collect()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl Persister for MemoryPersister {
    fn persist(&self, address: &str, data: &ContractData) -> io::Result<()> {
        *self.writes.lock().unwrap() += 1;
        self.records
            .lock()
            .unwrap()
            .insert(address.to_string(), data.raw.clone());
        Ok(())
    }

    fn exists(&self, address: &str) -> bool {
        self.records.lock().unwrap().contains_key(address)
    }
}

/// `n` distinct addresses in list order.
pub fn addresses(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("0x{:040x}", i + 1)).collect()
}
