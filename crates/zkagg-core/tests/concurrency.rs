mod common;

use common::{batch_inputs, chunks, Fixture};

#[test]
fn concurrent_prove_and_verify_share_one_service() {
    let fx = Fixture::new();
    let svc = fx.service(&["bernoulli", "curie"]);
    let all = chunks(8, 2);

    std::thread::scope(|s| {
        let handles: Vec<_> = all
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let svc = &svc;
                s.spawn(move || {
                    let fork = if i % 2 == 0 { "bernoulli" } else { "curie" };
                    let p = svc.prover().prove_chunk_for(c, Some(fork), None).unwrap();
                    assert!(svc.verifier().verify_chunk(&p, Some(fork), None).unwrap());
                    p
                })
            })
            .collect();
        let proofs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(proofs.len(), 8);
    });

    // Results do not depend on interleaving.
    let (infos, proofs, header) = batch_inputs(&svc, "bernoulli", &all[..2], 1);
    let a = svc.prover().prove_batch(&infos, &proofs, &header).unwrap();
    let b = std::thread::scope(|s| {
        s.spawn(|| svc.prover().prove_batch(&infos, &proofs, &header).unwrap())
            .join()
            .unwrap()
    });
    assert_eq!(a.proof, b.proof);
    assert_eq!(a.public_input, b.public_input);
}
