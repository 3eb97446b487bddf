// crates/zkagg-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{bail, ensure, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zkagg_core::{
    io::{read_batch_header_auto, read_proof_auto, write_auto, write_proof_auto},
    load_config_auto, BatchHeader, BlockTrace, ChunkInfo, DigestBackend, Proof, ProofLevel,
    ProofService, ServiceConfig, H256,
};
use zkagg_trace::{
    generator::{generate_traces, GeneratorConfig},
    io::{read_trace_auto, write_trace_auto},
    format::TraceFile,
    partition::{batch_header, chunk_infos, split_into_chunks},
};

type Service = ProofService<DigestBackend>;

#[derive(Parser, Debug)]
#[command(
    name = "zkagg",
    about = "Chunk → batch → bundle proof aggregation CLI",
    long_about = "zkagg CLI.\n\nGenerate synthetic block traces, derive chunk infos, prove chunks, \
                  aggregate them into batch and bundle proofs, and verify proofs against the \
                  artifacts listed in a config file.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

/// Fork/version selection shared by proving and verifying commands.
#[derive(clap::Args, Debug, Clone)]
struct Ctx {
    /// Service config (TOML/JSON) listing params/assets per fork
    #[arg(long, default_value = "zkagg.toml")]
    config: PathBuf,

    /// Fork to use; required when the config loads several forks for a level
    #[arg(long)]
    fork: Option<String>,

    /// Circuit version within the fork
    #[arg(long)]
    circuit_version: Option<String>,
}

impl Ctx {
    fn fork(&self) -> Option<&str> {
        self.fork.as_deref()
    }

    fn version(&self) -> Option<&str> {
        self.circuit_version.as_deref()
    }
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Generate a contiguous synthetic chain and write it as a trace file
    Simulate {
        /// Number of blocks (>0)
        #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u64).range(1..))]
        blocks: u64,

        /// Transactions per block
        #[arg(long, default_value_t = 4)]
        txs_per_block: usize,

        /// Chain id stamped on every block
        #[arg(long, default_value_t = 534_352)]
        chain_id: u64,

        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output path (CBOR/JSON)
        #[arg(long, default_value = "traces.json")]
        out: PathBuf,
    },

    /// Derive the chunk info (and chunk hash) of each chunk of a trace file
    ChunkInfo {
        /// Input trace file (CBOR/JSON)
        #[arg(long)]
        traces: PathBuf,

        /// Blocks per chunk; the whole file is one chunk when omitted
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Also write the chunk infos here (CBOR/JSON)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Prove every chunk of a trace file
    ProveChunk {
        #[command(flatten)]
        ctx: Ctx,

        /// Input trace file (CBOR/JSON)
        #[arg(long)]
        traces: PathBuf,

        /// Blocks per chunk; the whole file is one chunk when omitted
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Directory for `chunk_<first block>.json` proofs
        #[arg(long, default_value = "proofs")]
        out_dir: PathBuf,
    },

    /// Aggregate chunk proofs, in the given order, into a batch proof
    ProveBatch {
        #[command(flatten)]
        ctx: Ctx,

        /// Chunk proof files, in batch order
        #[arg(long, num_args = 1.., required = true)]
        chunk_proofs: Vec<PathBuf>,

        /// Batch header (CBOR/JSON); built from the chunk proofs when omitted
        #[arg(long)]
        header: Option<PathBuf>,

        /// Batch index for a built header
        #[arg(long, default_value_t = 0)]
        index: u64,

        /// Parent batch hash (hex) for a built header
        #[arg(long)]
        parent: Option<H256>,

        /// Trace file the chunks came from, for L1 message counts in a built header
        #[arg(long)]
        traces: Option<PathBuf>,

        /// Output path for the batch proof (CBOR/JSON)
        #[arg(long, default_value = "batch.json")]
        out: PathBuf,
    },

    /// Aggregate batch proofs, in the given order, into a bundle proof
    ProveBundle {
        #[command(flatten)]
        ctx: Ctx,

        /// Batch proof files, in bundle order
        #[arg(long, num_args = 1.., required = true)]
        batch_proofs: Vec<PathBuf>,

        /// Output path for the bundle proof (CBOR/JSON)
        #[arg(long, default_value = "bundle.json")]
        out: PathBuf,
    },

    /// Verify a proof at a level; exits non-zero when it does not verify
    Verify {
        #[command(flatten)]
        ctx: Ctx,

        /// Proof level: chunk, batch or bundle
        #[arg(long)]
        level: ProofLevel,

        /// Proof file (CBOR/JSON)
        #[arg(long)]
        proof: PathBuf,
    },

    /// Print the verifying keys of the loaded provers
    Vk {
        #[command(flatten)]
        ctx: Ctx,

        /// Only this level
        #[arg(long)]
        level: Option<ProofLevel>,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Simulate {
            blocks,
            txs_per_block,
            chain_id,
            seed,
            out,
        } => simulate(blocks, txs_per_block, chain_id, seed, &out),

        Cmd::ChunkInfo {
            traces,
            chunk_size,
            out,
        } => chunk_info(&traces, chunk_size, out.as_deref()),

        Cmd::ProveChunk {
            ctx,
            traces,
            chunk_size,
            out_dir,
        } => prove_chunk(&ctx, &traces, chunk_size, &out_dir),

        Cmd::ProveBatch {
            ctx,
            chunk_proofs,
            header,
            index,
            parent,
            traces,
            out,
        } => prove_batch(
            &ctx,
            &chunk_proofs,
            header.as_deref(),
            index,
            parent.unwrap_or(H256::ZERO),
            traces.as_deref(),
            &out,
        ),

        Cmd::ProveBundle {
            ctx,
            batch_proofs,
            out,
        } => prove_bundle(&ctx, &batch_proofs, &out),

        Cmd::Verify { ctx, level, proof } => verify(&ctx, level, &proof),

        Cmd::Vk { ctx, level } => vk(&ctx, level),
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Ensure the parent directory for a file exists.
fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", dir.display()))?;
        }
    }
    Ok(())
}

fn load_service(config: &Path) -> Result<Service> {
    let cfg: ServiceConfig = load_config_auto(config)
        .with_context(|| format!("loading config {}", config.display()))?;
    ensure!(
        !cfg.circuits.is_empty(),
        "config {} lists no circuits",
        config.display()
    );
    Service::from_config(&cfg).context("initializing artifact registries")
}

fn print_json<T: Serialize + ?Sized>(v: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

fn read_chunks(traces: &Path, chunk_size: Option<usize>) -> Result<Vec<Vec<BlockTrace>>> {
    let file = read_trace_auto(traces)
        .with_context(|| format!("reading traces from {}", traces.display()))?;
    ensure!(!file.is_empty(), "{} holds no blocks", traces.display());
    let n = chunk_size.unwrap_or(file.len());
    split_into_chunks(&file.blocks, n)
}

fn simulate(blocks: u64, txs_per_block: usize, chain_id: u64, seed: u64, out: &Path) -> Result<()> {
    let n = usize::try_from(blocks).context("block count does not fit in memory")?;
    let cfg = GeneratorConfig {
        chain_id,
        txs_per_block,
        seed,
        ..GeneratorConfig::default()
    };
    info!(blocks, txs_per_block, chain_id, seed, "generating synthetic chain");
    let file = TraceFile::new(generate_traces(cfg, n));

    ensure_parent_dir(out)?;
    write_trace_auto(out, &file).with_context(|| format!("writing traces to {}", out.display()))?;

    println!("Simulated {} blocks → {}", file.len(), out.display());
    Ok(())
}

fn chunk_info(traces: &Path, chunk_size: Option<usize>, out: Option<&Path>) -> Result<()> {
    let chunks = read_chunks(traces, chunk_size)?;
    let infos = chunk_infos(&chunks).context("deriving chunk infos")?;

    #[derive(Serialize)]
    struct Row<'a> {
        chunk_hash: H256,
        info: &'a ChunkInfo,
    }
    let rows: Vec<Row<'_>> = infos
        .iter()
        .map(|info| Row {
            chunk_hash: info.hash(),
            info,
        })
        .collect();
    print_json(&rows)?;

    if let Some(out) = out {
        ensure_parent_dir(out)?;
        write_auto(out, &infos).with_context(|| format!("writing chunk infos to {}", out.display()))?;
    }
    Ok(())
}

fn prove_chunk(ctx: &Ctx, traces: &Path, chunk_size: Option<usize>, out_dir: &Path) -> Result<()> {
    let chunks = read_chunks(traces, chunk_size)?;
    let svc = load_service(&ctx.config)?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    for chunk in &chunks {
        let proof = svc
            .prover()
            .prove_chunk_for(chunk, ctx.fork(), ctx.version())
            .context("chunk proving failed")?;
        let first = chunk.first().map_or(0, BlockTrace::number);
        let path = out_dir.join(format!("chunk_{first}.json"));
        write_proof_auto(&path, &proof)
            .with_context(|| format!("writing proof to {}", path.display()))?;
        println!(
            "Proved chunk of {} blocks ({}), wrote {}",
            chunk.len(),
            proof.public_input,
            path.display()
        );
    }
    Ok(())
}

fn read_proofs(paths: &[PathBuf]) -> Result<Vec<Proof>> {
    paths
        .iter()
        .map(|p| read_proof_auto(p).with_context(|| format!("reading proof from {}", p.display())))
        .collect()
}

fn prove_batch(
    ctx: &Ctx,
    chunk_proofs: &[PathBuf],
    header: Option<&Path>,
    index: u64,
    parent: H256,
    traces: Option<&Path>,
    out: &Path,
) -> Result<()> {
    let proofs = read_proofs(chunk_proofs)?;
    let infos = proofs
        .iter()
        .zip(chunk_proofs)
        .map(|(p, path)| {
            p.chunk_info
                .clone()
                .with_context(|| format!("{} carries no chunk info", path.display()))
        })
        .collect::<Result<Vec<ChunkInfo>>>()?;

    let header: BatchHeader = match header {
        Some(h) => read_batch_header_auto(h)
            .with_context(|| format!("reading batch header from {}", h.display()))?,
        None => {
            let blocks = match traces {
                Some(t) => read_trace_auto(t)?.blocks,
                None => Vec::new(),
            };
            batch_header(index, parent, &infos, &blocks)
        }
    };

    let svc = load_service(&ctx.config)?;
    let proof = svc
        .prover()
        .prove_batch_for(&infos, &proofs, &header, ctx.fork(), ctx.version())
        .context("batch proving failed")?;

    ensure_parent_dir(out)?;
    write_proof_auto(out, &proof).with_context(|| format!("writing proof to {}", out.display()))?;
    println!(
        "Aggregated {} chunk proofs into batch {} ({}), wrote {}",
        proofs.len(),
        header.batch_index,
        header.batch_hash(),
        out.display()
    );
    Ok(())
}

fn prove_bundle(ctx: &Ctx, batch_proofs: &[PathBuf], out: &Path) -> Result<()> {
    let proofs = read_proofs(batch_proofs)?;
    let svc = load_service(&ctx.config)?;
    let proof = svc
        .prover()
        .prove_bundle_for(&proofs, ctx.fork(), ctx.version())
        .context("bundle proving failed")?;

    ensure_parent_dir(out)?;
    write_proof_auto(out, &proof).with_context(|| format!("writing proof to {}", out.display()))?;
    println!(
        "Aggregated {} batch proofs into a bundle, wrote {}",
        proofs.len(),
        out.display()
    );
    Ok(())
}

fn verify(ctx: &Ctx, level: ProofLevel, proof: &Path) -> Result<()> {
    let svc = load_service(&ctx.config)?;
    let p = read_proof_auto(proof)
        .with_context(|| format!("reading proof from {}", proof.display()))?;
    info!(%level, proof = %proof.display(), "verifying proof");

    if !svc.verify(level, &p, ctx.fork(), ctx.version())? {
        bail!("{level} proof {} does not verify", proof.display());
    }
    println!("OK: {level} proof verified");
    Ok(())
}

fn vk(ctx: &Ctx, level: Option<ProofLevel>) -> Result<()> {
    let svc = load_service(&ctx.config)?;
    let levels = level.map_or_else(|| ProofLevel::ALL.to_vec(), |l| vec![l]);
    for level in levels {
        let vk = if ctx.fork.is_some() {
            svc.prover()
                .registry()
                .resolve(level, ctx.fork(), ctx.version())?
                .vk()
                .to_vec()
        } else {
            svc.get_vk(level)?
        };
        println!("{level}: {}", hex::encode(vk));
    }
    Ok(())
}
