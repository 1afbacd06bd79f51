//! Random identifier generation for cached items.

use rand::Rng;

/// Length of a generated item identifier.
pub const RAND_ID_LENGTH: usize = 16;

const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate an opaque 16-character alphanumeric identifier.
///
/// The identifier is stable across item mutations and doubles as the
/// member value inside sorted indices.
pub fn rand_id() -> String {
    let mut rng = rand::thread_rng();
    (0..RAND_ID_LENGTH)
        .map(|_| ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rand_id_length() {
        assert_eq!(rand_id().len(), RAND_ID_LENGTH);
    }

    #[test]
    fn test_rand_id_charset() {
        let id = rand_id();
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_rand_id_varies() {
        let a = rand_id();
        let b = rand_id();
        // Collisions over a 62^16 space are not a realistic concern.
        assert_ne!(a, b);
    }
}
