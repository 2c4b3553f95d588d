use chrono::Utc;
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;
use uuid::Builder;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const FALLBACK_SUFFIX_LEN: usize = 9;

static FALLBACK_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Unique task identifier: a random (v4) UUID drawn from the OS entropy source.
///
/// When the OS source is unavailable the id degrades to `<unix-millis>-<9 base-36 chars>`
/// from a time-seeded generator. Those ids are only probabilistically unique: two ids
/// minted in the same millisecond collide with probability about 36^-9.
pub fn generate_id() -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => Builder::from_random_bytes(bytes).into_uuid().to_string(),
        Err(error) => {
            warn!(%error, "secure random source unavailable; using timestamp id");
            fallback_id()
        }
    }
}

fn fallback_id() -> String {
    let now = Utc::now();
    let sequence = FALLBACK_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let seed = now.timestamp_nanos_opt().unwrap_or_default() as u64 ^ sequence.rotate_left(32);
    let mut rng = StdRng::seed_from_u64(seed);
    let suffix = (0..FALLBACK_SUFFIX_LEN)
        .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
        .collect::<String>();
    format!("{}-{suffix}", now.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_uuids_and_unique() {
        let ids = (0..1_000).map(|_| generate_id()).collect::<HashSet<_>>();
        assert_eq!(ids.len(), 1_000);
        for id in &ids {
            let parsed = uuid::Uuid::parse_str(id).expect("uuid formatted id");
            assert_eq!(parsed.get_version_num(), 4);
        }
    }

    #[test]
    fn fallback_ids_use_millis_and_base36_suffix() {
        let id = fallback_id();
        let (millis, suffix) = id.split_once('-').expect("separator");
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), FALLBACK_SUFFIX_LEN);
        assert!(suffix.bytes().all(|byte| BASE36.contains(&byte)));
        assert_ne!(fallback_id(), fallback_id());
    }
}
