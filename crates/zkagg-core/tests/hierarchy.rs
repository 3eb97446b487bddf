mod common;

use common::{batch_inputs, chunks, Fixture, Service};
use zkagg_core::{
    chunk_hash, BatchHeader, ChunkInfo, ConfigurationError, Error, ErrorKind,
    MalformedInputError, Proof, ProofLevel, ServiceOptions, VersionContext, H256,
};

#[test]
fn derive_is_stable_for_identical_input() {
    let c = chunks(1, 3).remove(0);
    assert_eq!(c.len(), 3);
    let h1 = chunk_hash(&c).unwrap();
    let h2 = chunk_hash(&c.clone()).unwrap();
    assert_eq!(h1, h2);
}

#[test]
fn full_hierarchy_verifies_at_every_level() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli"]);
    let fork = Some("bernoulli");

    let c = chunks(1, 3);
    let (infos, chunk_proofs, header) = batch_inputs(&svc, "bernoulli", &c, 1);
    assert!(svc.verifier().verify_chunk(&chunk_proofs[0], fork, None).unwrap());

    let batch = svc.prover().prove_batch(&infos, &chunk_proofs, &header).unwrap();
    assert_eq!(batch.batch_hash, Some(header.batch_hash()));
    assert!(svc.verifier().verify_batch(&batch, fork, None).unwrap());

    let bundle = svc.prover().prove_bundle(std::slice::from_ref(&batch)).unwrap();
    assert!(svc.verifier().verify_bundle(&bundle, fork, None).unwrap());

    assert_eq!(bundle.transition.prev_state_root, infos[0].prev_state_root);
    assert_eq!(bundle.transition.post_state_root, infos[0].post_state_root);
    assert_eq!(bundle.git_version.as_deref(), Some(zkagg_core::GIT_VERSION));
}

#[test]
fn multi_chunk_multi_batch_bundle() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli"]);
    let all = chunks(4, 2);

    let (i1, p1, h1) = batch_inputs(&svc, "bernoulli", &all[..2], 1);
    let (i2, p2, mut h2) = batch_inputs(&svc, "bernoulli", &all[2..], 2);
    let b1 = svc.prover().prove_batch(&i1, &p1, &h1).unwrap();
    h2.parent_batch_hash = h1.batch_hash();
    let b2 = svc.prover().prove_batch(&i2, &p2, &h2).unwrap();

    let bundle = svc.prover().prove_bundle(&[b1.clone(), b2.clone()]).unwrap();
    assert!(svc.verifier().verify_bundle(&bundle, Some("bernoulli"), None).unwrap());
    assert_eq!(bundle.transition.prev_state_root, b1.transition.prev_state_root);
    assert_eq!(bundle.transition.post_state_root, b2.transition.post_state_root);

    // Batches out of order do not chain.
    let err = svc.prover().prove_bundle(&[b2, b1]).unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedInput(MalformedInputError::NonContiguous { index: 1, .. })
    ));
}

#[test]
fn batch_verified_against_unloaded_fork_is_unknown_artifact() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli"]);
    let (infos, proofs, header) = batch_inputs(&svc, "bernoulli", &chunks(1, 3), 1);
    let batch = svc.prover().prove_batch(&infos, &proofs, &header).unwrap();

    let err = svc.verifier().verify_batch(&batch, Some("curie"), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownArtifact);
}

#[test]
fn cross_fork_verification_fails_closed() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli", "curie"]);
    let c = chunks(1, 2).remove(0);

    let proof = svc.prover().prove_chunk_for(&c, Some("bernoulli"), None).unwrap();
    assert!(svc.verifier().verify_chunk(&proof, Some("bernoulli"), None).unwrap());
    assert!(!svc.verifier().verify_chunk(&proof, Some("curie"), None).unwrap());

    // Relabelling the proof does not help: the key it was made with differs.
    let mut relabelled = proof;
    relabelled.context = zkagg_core::VersionContext::fork("curie");
    assert!(!svc.verifier().verify_chunk(&relabelled, Some("curie"), None).unwrap());
}

#[test]
fn ambiguous_prover_needs_a_fork() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli", "curie"]);
    let err = svc.prover().prove_chunk(&chunks(1, 1)[0]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn size_mismatch_is_reported() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli"]);
    let (infos, proofs, header) = batch_inputs(&svc, "bernoulli", &chunks(3, 1), 1);

    let err = svc
        .prover()
        .prove_batch(&infos[..2], &proofs, &header)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedInput(MalformedInputError::SizeMismatch {
            expected: 2,
            actual: 3,
            ..
        })
    ));
}

#[test]
fn swapped_chunks_are_out_of_order() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli"]);
    let (mut infos, mut proofs, header) = batch_inputs(&svc, "bernoulli", &chunks(2, 2), 1);
    infos.swap(0, 1);
    proofs.swap(0, 1);

    let err = svc.prover().prove_batch(&infos, &proofs, &header).unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedInput(MalformedInputError::OutOfOrder { index: 0, .. })
    ));
}

#[test]
fn tampered_chunk_proof_fails_pre_check_and_batch() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli"]);
    let (infos, mut proofs, header) = batch_inputs(&svc, "bernoulli", &chunks(3, 1), 1);
    proofs[1].proof[50] ^= 0xff;

    assert!(!svc.verifier().verify_chunk(&proofs[1], Some("bernoulli"), None).unwrap());

    let err = svc.prover().check_chunk_proofs(&proofs).unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedInput(MalformedInputError::InvalidChunkProof { index: 1, .. })
    ));
    let err = svc.prover().prove_batch(&infos, &proofs, &header).unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedInput(MalformedInputError::InvalidChunkProof { index: 1, .. })
    ));
}

#[test]
fn chunk_proof_from_other_fork_fails_pre_check() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli", "curie"]);
    let c = chunks(1, 2);
    let foreign = svc.prover().prove_chunk_for(&c[0], Some("curie"), None).unwrap();
    let err = svc
        .prover()
        .check_chunk_proofs_for(&[foreign], Some("bernoulli"), None)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedInput(MalformedInputError::InvalidChunkProof { index: 0, .. })
    ));
}

/// Pre-check and batch aggregation both reject `proofs[index]` at `index`.
fn assert_pre_check_rejects(
    svc: &Service,
    infos: &[ChunkInfo],
    proofs: &[Proof],
    header: &BatchHeader,
    index: usize,
) {
    assert!(matches!(
        svc.verifier().verify_chunk(&proofs[index], Some("bernoulli"), None),
        Ok(false)
    ));
    let err = svc.prover().check_chunk_proofs(proofs).unwrap_err();
    assert!(
        matches!(
            err,
            Error::MalformedInput(MalformedInputError::InvalidChunkProof { index: i, .. }) if i == index
        ),
        "{err}"
    );
    let err = svc.prover().prove_batch(infos, proofs, header).unwrap_err();
    assert!(
        matches!(
            err,
            Error::MalformedInput(MalformedInputError::InvalidChunkProof { index: i, .. }) if i == index
        ),
        "{err}"
    );
}

#[test]
fn chunk_proof_with_edited_transition_fails_pre_check() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli"]);
    let (infos, mut proofs, header) = batch_inputs(&svc, "bernoulli", &chunks(2, 1), 1);
    proofs[1].transition.post_state_root = H256([0x42; 32]);
    assert_pre_check_rejects(&svc, &infos, &proofs, &header, 1);
}

#[test]
fn chunk_proof_with_edited_context_fails_pre_check() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli"]);
    let (infos, mut proofs, header) = batch_inputs(&svc, "bernoulli", &chunks(2, 1), 1);
    proofs[0].context = VersionContext::default();
    assert_pre_check_rejects(&svc, &infos, &proofs, &header, 0);

    proofs[0].context = VersionContext::versioned("bernoulli", "v9");
    assert_pre_check_rejects(&svc, &infos, &proofs, &header, 0);
}

#[test]
fn chunk_proof_with_foreign_key_fails_pre_check() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli"]);
    let (infos, mut proofs, header) = batch_inputs(&svc, "bernoulli", &chunks(2, 1), 1);
    proofs[1].vk = vec![0x33; 32];
    assert_pre_check_rejects(&svc, &infos, &proofs, &header, 1);
}

#[test]
fn bundle_recheck_rejects_batch_with_edited_context() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli"]);
    let (infos, proofs, header) = batch_inputs(&svc, "bernoulli", &chunks(1, 2), 1);
    let mut batch = svc.prover().prove_batch(&infos, &proofs, &header).unwrap();
    batch.context = VersionContext::default();

    assert!(!svc.verifier().verify_batch(&batch, Some("bernoulli"), None).unwrap());
    let err = svc.prover().prove_bundle(&[batch]).unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedInput(MalformedInputError::InvalidBatchProof { index: 0, .. })
    ));
}

#[test]
fn bundle_recheck_rejects_tampered_batch_unless_disabled() {
    let fx = Fixture::new();
    let strict = fx.service(&["bernoulli"]);
    let (infos, proofs, header) = batch_inputs(&strict, "bernoulli", &chunks(1, 2), 1);
    let mut batch = strict.prover().prove_batch(&infos, &proofs, &header).unwrap();
    batch.proof[0] ^= 1;

    let err = strict.prover().prove_bundle(std::slice::from_ref(&batch)).unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedInput(MalformedInputError::InvalidBatchProof { index: 0, .. })
    ));

    let lax_fx = Fixture::new();
    let lax = lax_fx.service_with(
        &["bernoulli"],
        ServiceOptions {
            recheck_batch_proofs: false,
            output_dir: None,
        },
    );
    assert!(lax.prover().prove_bundle(&[batch]).is_ok());
}

#[test]
fn wrong_level_and_tampered_fields_verify_false() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli"]);
    let (infos, proofs, header) = batch_inputs(&svc, "bernoulli", &chunks(1, 2), 1);
    let batch = svc.prover().prove_batch(&infos, &proofs, &header).unwrap();

    // A batch proof presented to the chunk verifier.
    let mut as_chunk = batch.clone();
    as_chunk.chunk_info = Some(infos[0].clone());
    assert!(!svc.verifier().verify_chunk(&as_chunk, Some("bernoulli"), None).unwrap());

    let mut moved = batch;
    moved.transition.post_state_root = zkagg_core::H256([9; 32]);
    assert!(!svc.verifier().verify_batch(&moved, Some("bernoulli"), None).unwrap());
}

#[test]
fn malformed_envelopes_are_errors_not_false() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli"]);
    let mut p = svc.prover().prove_chunk(&chunks(1, 1)[0]).unwrap();
    p.proof.truncate(33);
    let err = svc.verifier().verify_chunk(&p, Some("bernoulli"), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);

    let err = svc
        .verifier()
        .verify_json(ProofLevel::Chunk, b"not json", Some("bernoulli"), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
}

#[test]
fn uninitialized_levels_always_report_configuration_error() {
    let svc = Service::default();
    let err = svc.prover().prove_chunk(&[]).unwrap_err();
    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::Uninitialized { .. })
    ));
    assert_eq!(
        svc.prover().prove_batch(&[], &[], &common_header()).unwrap_err().kind(),
        ErrorKind::Configuration
    );
    assert_eq!(svc.prover().prove_bundle(&[]).unwrap_err().kind(), ErrorKind::Configuration);
    assert_eq!(svc.prover().check_chunk_proofs(&[]).unwrap_err().kind(), ErrorKind::Configuration);
    for level in ProofLevel::ALL {
        let err = svc
            .verifier()
            .verify_json(level, b"garbage", Some("bernoulli"), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(svc.get_vk(level).unwrap_err().kind(), ErrorKind::Configuration);
    }
}

#[test]
fn partially_initialized_service_guards_other_levels() {
    let fx = Fixture::new();
    let svc = Service::default();
    svc.init(
        zkagg_core::Role::Prover,
        ProofLevel::Chunk,
        zkagg_core::VersionContext::fork("bernoulli"),
        fx.params(),
        &fx.assets("bernoulli"),
    )
    .unwrap();
    let proof = svc.prover().prove_chunk(&chunks(1, 1)[0]).unwrap();
    let err = svc.verifier().verify_chunk(&proof, Some("bernoulli"), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn reinitialization_is_refused() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli"]);
    let err = svc
        .init(
            zkagg_core::Role::Verifier,
            ProofLevel::Batch,
            zkagg_core::VersionContext::fork("bernoulli"),
            fx.params(),
            &fx.assets("bernoulli"),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::AlreadyInitialized { .. })
    ));
}

#[test]
fn missing_assets_are_configuration_errors() {
    let fx = Fixture::new();
    let svc = Service::default();
    let empty = fx.dir.path().join("nothing-here");
    let err = svc
        .init(
            zkagg_core::Role::Verifier,
            ProofLevel::Chunk,
            zkagg_core::VersionContext::fork("bernoulli"),
            fx.params(),
            &empty,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::AssetLoad { .. })
    ));
    assert_eq!(
        svc.state(zkagg_core::Role::Verifier, ProofLevel::Chunk),
        zkagg_core::LevelState::Uninitialized
    );
}

#[test]
fn vk_listing_returns_loaded_keys() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli"]);
    let on_disk = std::fs::read(fx.assets("bernoulli").join("vk_batch.vkey")).unwrap();
    assert_eq!(svc.get_vk(ProofLevel::Batch).unwrap(), on_disk);
}

#[test]
fn output_dir_receives_proof_dumps() {
    let fx = Fixture::new();
    let out = fx.dir.path().join("dump");
    let svc = fx.service_with(
        &["bernoulli"],
        ServiceOptions {
            recheck_batch_proofs: true,
            output_dir: Some(out.clone()),
        },
    );
    let c = chunks(1, 2);
    svc.prover().prove_chunk(&c[0]).unwrap();
    let first = c[0][0].number();
    assert!(out.join(format!("chunk_{first}.json")).exists());
}

fn common_header() -> zkagg_core::BatchHeader {
    zkagg_core::BatchHeader {
        version: 3,
        batch_index: 0,
        parent_batch_hash: zkagg_core::H256::ZERO,
        l1_message_popped: 0,
        total_l1_message_popped: 0,
        last_block_timestamp: 0,
        chunk_hashes: Vec::new(),
    }
}
