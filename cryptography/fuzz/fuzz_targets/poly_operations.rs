#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rand::{rngs::StdRng, SeedableRng};
use tessera_cryptography::primitives::{
    group::{Ed25519, Group, Point},
    poly::{recover_pub_poly, recover_secret, PriPoly},
};

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    seed: u64,
    threshold: u8,
    extra: u8,
    skip: u8,
}

fn fuzz(input: FuzzInput) {
    let threshold = (input.threshold % 16) as u32 + 2;
    let n = threshold + (input.extra % 8) as u32;
    let mut rng = StdRng::seed_from_u64(input.seed);
    let Ok(private) = PriPoly::<Ed25519>::new(threshold, None, &mut rng) else {
        return;
    };
    let public = private.commit(None);

    // Any `threshold` shares recover the secret and the public polynomial
    let skip = (input.skip as u32) % (n - threshold + 1);
    let shares: Vec<_> = private.shares(n).into_iter().skip(skip as usize).collect();
    let secret = recover_secret::<Ed25519>(&shares, threshold).unwrap();
    assert_eq!(&secret, private.secret());
    for share in &shares {
        assert!(public.check(share));
    }

    let public_shares: Vec<_> = public.shares(n).into_iter().skip(skip as usize).collect();
    let recovered = recover_pub_poly::<Ed25519>(&public_shares, threshold).unwrap();
    assert_eq!(recovered.commits(), public.commits());
    assert_eq!(
        recovered.commit(),
        &<Ed25519 as Group>::Point::mul_base(&secret)
    );

    // Fewer shares do not
    assert!(recover_secret::<Ed25519>(&shares[..threshold as usize - 1], threshold).is_err());
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
