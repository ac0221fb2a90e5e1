use rand::Rng;

/// Uniform in-place Fisher–Yates shuffle.
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in [0_usize, 1, 2, 5, 40] {
            let original: Vec<usize> = (0..len).map(|i| i % 4).collect();
            let mut shuffled = original.clone();
            fisher_yates(&mut shuffled, &mut rng);

            assert_eq!(shuffled.len(), original.len());
            let mut a = original.clone();
            let mut b = shuffled.clone();
            a.sort_unstable();
            b.sort_unstable();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn shuffle_reaches_every_ordering_of_three() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..600 {
            let mut items = [1, 2, 3];
            fisher_yates(&mut items, &mut rng);
            seen.insert(items);
        }
        assert_eq!(seen.len(), 6);
    }
}
