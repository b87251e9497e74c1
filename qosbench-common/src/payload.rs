//! Random field payloads

use rand::Rng;

/// Generate a random printable ASCII string (`' '..='~'`) of `length` bytes
pub fn ascii_string<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length).map(|_| rng.random_range(b' '..=b'~') as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_ascii_string_length_and_range() {
        let mut rng = SmallRng::seed_from_u64(7);
        let s = ascii_string(&mut rng, 100);
        assert_eq!(s.len(), 100);
        assert!(s.bytes().all(|b| (b' '..=b'~').contains(&b)));
    }

    #[test]
    fn test_ascii_string_empty() {
        let mut rng = SmallRng::seed_from_u64(7);
        assert!(ascii_string(&mut rng, 0).is_empty());
    }

    #[test]
    fn test_ascii_string_seeded_is_reproducible() {
        let a = ascii_string(&mut SmallRng::seed_from_u64(99), 32);
        let b = ascii_string(&mut SmallRng::seed_from_u64(99), 32);
        assert_eq!(a, b);
    }
}
