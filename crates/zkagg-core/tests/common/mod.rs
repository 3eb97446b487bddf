#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zkagg_core::registry::{params_file_name, vk_file_name, AGG_DEGREES, CHUNK_DEGREES};
use zkagg_core::{
    BatchHeader, BlockTrace, ChunkInfo, DigestBackend, Proof, ProofBackend, ProofLevel,
    ProofService, Role,
    ServiceOptions, VersionContext, H256,
};
use zkagg_trace::generator::{GeneratorConfig, TraceGenerator};
use zkagg_trace::partition::batch_header;

pub type Service = ProofService<DigestBackend>;

/// Throwaway params/assets tree: one shared params dir, one assets dir per fork.
pub struct Fixture {
    pub dir: TempDir,
    pub params: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("params");
        std::fs::create_dir_all(&params).unwrap();
        for d in CHUNK_DEGREES.iter().chain(AGG_DEGREES) {
            std::fs::write(params.join(params_file_name(*d)), format!("params-{d}")).unwrap();
        }
        Self { dir, params }
    }

    /// Assets dir for `fork`, with verifying keys unique to the fork.
    pub fn assets(&self, fork: &str) -> PathBuf {
        let a = self.dir.path().join("assets").join(fork);
        if !a.exists() {
            std::fs::create_dir_all(&a).unwrap();
            for level in ProofLevel::ALL {
                let vk = zkagg_crypto::commit(
                    zkagg_crypto::Label::VkKey,
                    &[fork.as_bytes(), level.as_str().as_bytes()],
                );
                std::fs::write(a.join(vk_file_name(level)), vk).unwrap();
            }
        }
        a
    }

    /// Load every level of both roles for each fork.
    pub fn service(&self, forks: &[&str]) -> Service {
        self.service_with(forks, ServiceOptions::default())
    }

    pub fn service_with(&self, forks: &[&str], options: ServiceOptions) -> Service {
        let svc = Service::new(options);
        for fork in forks {
            self.load(&svc, fork);
        }
        svc
    }

    pub fn load<B: ProofBackend>(&self, svc: &ProofService<B>, fork: &str) {
        let assets = self.assets(fork);
        for role in [Role::Prover, Role::Verifier] {
            for level in ProofLevel::ALL {
                svc.init(role, level, VersionContext::fork(fork), &self.params, &assets)
                    .unwrap();
            }
        }
    }

    pub fn params(&self) -> &Path {
        &self.params
    }
}

/// `n_chunks` contiguous chunks of `blocks_per_chunk` blocks each.
pub fn chunks(n_chunks: usize, blocks_per_chunk: usize) -> Vec<Vec<BlockTrace>> {
    let mut g = TraceGenerator::new(GeneratorConfig::default());
    (0..n_chunks).map(|_| g.next_blocks(blocks_per_chunk)).collect()
}

/// Chunk proofs, their infos and the batch header over them.
pub fn batch_inputs(
    svc: &Service,
    fork: &str,
    chunks: &[Vec<BlockTrace>],
    batch_index: u64,
) -> (Vec<ChunkInfo>, Vec<Proof>, BatchHeader) {
    let proofs: Vec<Proof> = chunks
        .iter()
        .map(|c| svc.prover().prove_chunk_for(c, Some(fork), None).unwrap())
        .collect();
    let infos: Vec<ChunkInfo> = proofs
        .iter()
        .map(|p| p.chunk_info.clone().unwrap())
        .collect();
    let blocks: Vec<BlockTrace> = chunks.iter().flatten().cloned().collect();
    let header = batch_header(batch_index, H256::ZERO, &infos, &blocks);
    (infos, proofs, header)
}
