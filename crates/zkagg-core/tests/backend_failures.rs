mod common;

use common::{chunks, Fixture};
use zkagg_core::{
    ArtifactSet, ErrorKind, ProofBackend, ProofLevel, ProofService, Witness, H256,
};

struct PanickingBackend;

impl ProofBackend for PanickingBackend {
    const NAME: &'static str = "panicking";

    fn prove(_: &ArtifactSet, _: &Witness) -> anyhow::Result<Vec<u8>> {
        panic!("out of GPU memory")
    }

    fn verify(_: &ArtifactSet, _: ProofLevel, _: &H256, _: &[u8]) -> anyhow::Result<bool> {
        Ok(true)
    }
}

struct FailingBackend;

impl ProofBackend for FailingBackend {
    const NAME: &'static str = "failing";

    fn prove(_: &ArtifactSet, _: &Witness) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("constraint system unsatisfied")
    }

    fn verify(_: &ArtifactSet, _: ProofLevel, _: &H256, _: &[u8]) -> anyhow::Result<bool> {
        anyhow::bail!("verifier engine unavailable")
    }
}

#[test]
fn backend_panic_is_a_backend_error() {
    let fx = Fixture::new();
    let svc = ProofService::<PanickingBackend>::default();
    fx.load(&svc, "bernoulli");
    let err = svc.prover().prove_chunk(&chunks(1, 1)[0]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(err.to_string().contains("out of GPU memory"));
}

#[test]
fn backend_failures_are_backend_errors() {
    let fx = Fixture::new();
    let digest = fx.service(&["bernoulli"]);
    let proof = digest.prover().prove_chunk(&chunks(1, 1)[0]).unwrap();

    let svc = ProofService::<FailingBackend>::default();
    fx.load(&svc, "bernoulli");
    let err = svc.prover().prove_chunk(&chunks(1, 1)[0]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);

    let err = svc
        .verifier()
        .verify_chunk(&proof, Some("bernoulli"), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);

    let err = svc.prover().check_chunk_proofs(&[proof]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
}
