//! Scripted chain, dialer and store wrappers shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use chainevents_core::{
    BlockHeader, Cursor, DecodedEvent, EventStore, RawLog, RetryBudget, StorageError,
};
use chainevents_rpc::{ConnectionManager, Dialer, Endpoint, EvmRpc, RpcError};
use chainevents_storage::MemoryStorage;

pub const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

pub const TRANSFER_ABI: &str = r#"[
    {"type":"function","name":"transfer","inputs":[],"outputs":[]},
    {"type":"event","name":"Transfer","anonymous":false,"inputs":[
        {"name":"from","type":"address","indexed":true,"internalType":"address"},
        {"name":"to","type":"address","indexed":true,"internalType":"address"},
        {"name":"value","type":"uint256","indexed":false,"internalType":"uint256"}
    ]}
]"#;

pub fn contract() -> Address {
    Address::repeat_byte(0xc0)
}

#[derive(Default)]
pub struct ChainState {
    pub head: u64,
    pub logs: Vec<RawLog>,
    /// Remaining `filter_logs` calls that fail.
    pub fail_logs: u32,
    /// Remaining `latest_header` calls that fail.
    pub fail_head: u32,
    /// 1-based `latest_header` call numbers that fail.
    pub fail_head_calls: Vec<u32>,
    /// Every second `latest_header` call fails.
    pub alternate_heads: bool,
    pub head_calls: u32,
    /// Every fetch starting at or after this block fails.
    pub fail_from: Option<u64>,
    pub filter_calls: Vec<(u64, u64)>,
}

/// A fake node. Clones share state.
#[derive(Clone, Default)]
pub struct MockChain {
    pub state: Arc<Mutex<ChainState>>,
}

impl MockChain {
    pub fn with_head(head: u64) -> Self {
        let chain = Self::default();
        chain.state.lock().unwrap().head = head;
        chain
    }

    pub fn set_head(&self, head: u64) {
        self.state.lock().unwrap().head = head;
    }

    pub fn push_log(&self, log: RawLog) {
        self.state.lock().unwrap().logs.push(log);
    }

    pub fn fail_next_fetches(&self, n: u32) {
        self.state.lock().unwrap().fail_logs = n;
    }

    pub fn fail_fetches_from(&self, block: Option<u64>) {
        self.state.lock().unwrap().fail_from = block;
    }

    pub fn fail_next_heads(&self, n: u32) {
        self.state.lock().unwrap().fail_head = n;
    }

    pub fn fail_head_calls(&self, calls: &[u32]) {
        self.state.lock().unwrap().fail_head_calls = calls.to_vec();
    }

    pub fn fail_every_other_head(&self) {
        self.state.lock().unwrap().alternate_heads = true;
    }

    pub fn head_calls(&self) -> u32 {
        self.state.lock().unwrap().head_calls
    }

    pub fn filter_calls(&self) -> Vec<(u64, u64)> {
        self.state.lock().unwrap().filter_calls.clone()
    }
}

#[async_trait]
impl EvmRpc for MockChain {
    async fn latest_header(&self) -> Result<BlockHeader, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.head_calls += 1;
        let call = state.head_calls;
        if state.fail_head > 0 {
            state.fail_head -= 1;
            return Err(RpcError::Http("connection reset".into()));
        }
        if state.fail_head_calls.contains(&call) || (state.alternate_heads && call % 2 == 0) {
            return Err(RpcError::Http("connection reset".into()));
        }
        Ok(BlockHeader {
            number: state.head,
            hash: B256::left_padding_from(&state.head.to_be_bytes()),
        })
    }

    async fn filter_logs(
        &self,
        address: Address,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawLog>, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.filter_calls.push((from, to));
        if state.fail_from.is_some_and(|b| from >= b) {
            return Err(RpcError::Http("503 Service Unavailable".into()));
        }
        if state.fail_logs > 0 {
            state.fail_logs -= 1;
            return Err(RpcError::Timeout { ms: 30_000 });
        }
        Ok(state
            .logs
            .iter()
            .filter(|l| l.address == address && (from..=to).contains(&l.block_number))
            .cloned()
            .collect())
    }
}

/// Hands out the same `MockChain` on every dial.
pub struct MockDialer {
    pub chain: MockChain,
    pub dials: AtomicU32,
}

impl MockDialer {
    pub fn new(chain: MockChain) -> Arc<Self> {
        Arc::new(Self {
            chain,
            dials: AtomicU32::new(0),
        })
    }

    pub fn dials(&self) -> u32 {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dialer for MockDialer {
    async fn dial(&self, _: &Endpoint) -> Result<Arc<dyn EvmRpc>, RpcError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(self.chain.clone()))
    }
}

pub fn connection(dialer: Arc<MockDialer>) -> ConnectionManager {
    ConnectionManager::new(
        Endpoint::parse("http://mock.node").unwrap(),
        dialer,
        RetryBudget::new(3, Duration::ZERO),
        Duration::from_secs(1),
        Duration::from_secs(1),
    )
}

/// Wraps `MemoryStorage` and fails the next `n` commits.
pub struct FlakyStore {
    pub inner: MemoryStorage,
    pub fail_commits: AtomicU32,
}

impl FlakyStore {
    pub fn new(fail_commits: u32) -> Self {
        Self {
            inner: MemoryStorage::new(),
            fail_commits: AtomicU32::new(fail_commits),
        }
    }
}

#[async_trait]
impl EventStore for FlakyStore {
    async fn load_cursor(&self) -> Result<Option<Cursor>, StorageError> {
        self.inner.load_cursor().await
    }

    async fn commit_range(&self, events: &[DecodedEvent], to: u64) -> Result<(), StorageError> {
        let left = self.fail_commits.load(Ordering::SeqCst);
        if left > 0 {
            self.fail_commits.store(left - 1, Ordering::SeqCst);
            return Err(StorageError::Database("connection lost mid-transaction".into()));
        }
        self.inner.commit_range(events, to).await
    }

    async fn reset_cursor(&self, block: u64) -> Result<(), StorageError> {
        self.inner.reset_cursor(block).await
    }

    async fn event_count(&self) -> Result<u64, StorageError> {
        self.inner.event_count().await
    }
}

pub fn word(n: u64) -> Vec<u8> {
    U256::from(n).to_be_bytes::<32>().to_vec()
}

pub fn transfer_log(block: u64, log_index: u64, from: Address, to: Address, value: u64) -> RawLog {
    RawLog {
        address: contract(),
        topics: vec![
            TRANSFER_TOPIC.parse().unwrap(),
            from.into_word(),
            to.into_word(),
        ],
        data: Bytes::from(word(value)),
        block_number: block,
        block_hash: B256::left_padding_from(&block.to_be_bytes()),
        tx_hash: B256::left_padding_from(&(block * 1_000 + log_index).to_be_bytes()),
        tx_index: 0,
        log_index,
        removed: false,
    }
}
