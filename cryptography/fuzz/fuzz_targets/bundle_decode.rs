#![no_main]

use arbitrary::Arbitrary;
use commonware_codec::{Decode, Encode, Read};
use libfuzzer_sys::fuzz_target;
use std::fmt::Debug;
use tessera_cryptography::{
    dkg::{DealBundle, JustificationBundle, ResponseBundle},
    primitives::group::{Ed25519, P256},
};

#[derive(Arbitrary, Debug)]
enum Bundle {
    DealEd25519,
    DealP256,
    Response,
    JustificationEd25519,
    JustificationP256,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    bundle: Bundle,
    max_nodes: u8,
    data: Vec<u8>,
}

fn round_trip<T: Read<Cfg = usize> + Encode + PartialEq + Debug>(data: &[u8], max_nodes: usize) {
    if let Ok(bundle) = T::decode_cfg(data, &max_nodes) {
        assert_eq!(T::decode_cfg(bundle.encode(), &max_nodes).unwrap(), bundle);
    }
}

fn fuzz(input: FuzzInput) {
    let max_nodes = input.max_nodes as usize;
    let data = &input.data[..];
    match input.bundle {
        Bundle::DealEd25519 => round_trip::<DealBundle<Ed25519>>(data, max_nodes),
        Bundle::DealP256 => round_trip::<DealBundle<P256>>(data, max_nodes),
        Bundle::Response => round_trip::<ResponseBundle>(data, max_nodes),
        Bundle::JustificationEd25519 => round_trip::<JustificationBundle<Ed25519>>(data, max_nodes),
        Bundle::JustificationP256 => round_trip::<JustificationBundle<P256>>(data, max_nodes),
    }
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
