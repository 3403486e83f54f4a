use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const LENGTH: usize = 40;

pub(crate) fn generate_replid() -> String {
    let time =
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0);
    let pid = process::id() as u64;

    // pid and clock land in mostly distinct bit ranges of the seed
    let mut rng = StdRng::seed_from_u64((pid << 32) ^ time);
    (0..LENGTH).map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char).collect()
}

#[test]
fn test_generate_replid() {
    let replid = generate_replid();
    assert_eq!(replid.len(), 40);
    assert!(replid.bytes().all(|b| CHARSET.contains(&b)));
}
