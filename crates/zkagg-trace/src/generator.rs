// crates/zkagg-trace/src/generator.rs

//! Deterministic synthetic chain generator used by the CLI `simulate`
//! subcommand and by tests.
//!
//! Blocks are fully linked: numbers increase by one, every parent hash is the
//! previous block hash and every pre-state root is the previous post-state
//! root, so any contiguous slice is a valid chunk. Hashes and roots are
//! random bytes from a seeded `StdRng`; the same config always yields the
//! same chain.

use rand::{rngs::StdRng, Rng as _, SeedableRng};
use zkagg_core::{BlockHeader, BlockTrace, TransactionTrace, H256};

use crate::format::TraceFile;

/// Generator parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorConfig {
    /// Chain id stamped on every block.
    pub chain_id: u64,
    /// Number of the first generated block.
    pub start_block: u64,
    /// Transactions per block.
    pub txs_per_block: usize,
    /// Probability that a transaction is an L1 message.
    pub l1_msg_ratio: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            chain_id: 534_352,
            start_block: 1,
            txs_per_block: 4,
            l1_msg_ratio: 0.25,
            seed: 42,
        }
    }
}

/// Stateful generator: each call continues the chain where the previous one stopped.
#[derive(Debug)]
pub struct TraceGenerator {
    cfg: GeneratorConfig,
    rng: StdRng,
    next_number: u64,
    tip_hash: H256,
    tip_state_root: H256,
}

impl TraceGenerator {
    /// Start a chain from a random genesis.
    #[must_use]
    pub fn new(cfg: GeneratorConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let tip_hash = random_h256(&mut rng);
        let tip_state_root = random_h256(&mut rng);
        Self {
            next_number: cfg.start_block,
            cfg,
            rng,
            tip_hash,
            tip_state_root,
        }
    }

    /// Number the next generated block will carry.
    #[inline]
    #[must_use]
    pub const fn next_number(&self) -> u64 {
        self.next_number
    }

    /// Generate the next block.
    pub fn next_block(&mut self) -> BlockTrace {
        let number = self.next_number;
        let transactions = (0..self.cfg.txs_per_block)
            .map(|_| {
                let is_l1_msg = self.rng.random_bool(self.cfg.l1_msg_ratio.clamp(0.0, 1.0));
                let len = self.rng.random_range(16..=96);
                let mut data = vec![0u8; len];
                self.rng.fill(&mut data[..]);
                TransactionTrace {
                    tx_hash: random_h256(&mut self.rng),
                    is_l1_msg,
                    data,
                }
            })
            .collect();

        let header = BlockHeader {
            number,
            hash: random_h256(&mut self.rng),
            parent_hash: self.tip_hash,
            state_root: random_h256(&mut self.rng),
            timestamp: 1_700_000_000 + number * 3,
            gas_limit: 10_000_000,
        };
        let block = BlockTrace {
            chain_id: self.cfg.chain_id,
            prev_state_root: self.tip_state_root,
            withdraw_trie_root: random_h256(&mut self.rng),
            header,
            transactions,
        };

        self.tip_hash = block.header.hash;
        self.tip_state_root = block.header.state_root;
        self.next_number += 1;
        block
    }

    /// Generate the next `n` blocks.
    pub fn next_blocks(&mut self, n: usize) -> Vec<BlockTrace> {
        (0..n).map(|_| self.next_block()).collect()
    }
}

fn random_h256(rng: &mut StdRng) -> H256 {
    let mut b = [0u8; 32];
    rng.fill(&mut b);
    H256(b)
}

/// Generate `n_blocks` linked blocks with `cfg`.
#[must_use]
pub fn generate_traces(cfg: GeneratorConfig, n_blocks: usize) -> Vec<BlockTrace> {
    TraceGenerator::new(cfg).next_blocks(n_blocks)
}

/// Generate `n_blocks` with the default config and wrap them in a [`TraceFile`].
#[must_use]
pub fn generate_trace_file(n_blocks: usize) -> TraceFile {
    let cfg = GeneratorConfig::default();
    let seed = cfg.seed;
    let mut tf = TraceFile::new(generate_traces(cfg, n_blocks));
    tf.meta = Some(serde_json::json!({ "generator": "zkagg-trace", "seed": seed }));
    tf
}
