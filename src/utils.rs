/// [Szudzik pairing function][szudzik-pairing].
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// Arithmetic wraps, which is fine for hashing.
///
/// [szudzik-pairing]: http://szudzik.com/ElegantPairing.pdf
pub fn pairing_szudzik(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

/// [Pairing function][pairing] for two `u64` values.
///
/// [pairing]: https://en.wikipedia.org/wiki/Pairing_function
pub fn pairing2(a: u64, b: u64) -> u64 {
    pairing_szudzik(a, b)
}

/// Pairing function for three `u64` values.
pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

/// Fold a sequence through [`pairing2`].
pub fn pairing_seq(items: impl IntoIterator<Item = u64>) -> u64 {
    items.into_iter().fold(0, pairing2)
}

/// Rearrange `items` into the next lexicographically greater permutation.
///
/// Returns `false` (leaving `items` sorted ascending) once the last
/// permutation has been passed.
pub fn next_permutation<T: Ord>(items: &mut [T]) -> bool {
    let Some(i) = items.windows(2).rposition(|w| w[0] < w[1]) else {
        items.reverse();
        return false;
    };
    let Some(j) = items.iter().rposition(|x| *x > items[i]) else {
        return false;
    };
    items.swap(i, j);
    items[i + 1..].reverse();
    true
}

pub trait MyHash {
    fn hash(&self) -> u64;
}

impl MyHash for (u64, u64) {
    fn hash(&self) -> u64 {
        pairing2(self.0, self.1)
    }
}

impl MyHash for (u64, u64, u64) {
    fn hash(&self) -> u64 {
        pairing3(self.0, self.1, self.2)
    }
}

impl MyHash for Vec<u32> {
    fn hash(&self) -> u64 {
        pairing_seq(self.iter().map(|&x| x as u64))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_szudzik() {
        // a\b  0  1  2  3  4
        // ------------------
        // 0    0  1  4  9 16
        // 1    2  3  5 10 17
        // 2    6  7  8 11 18
        // 3   12 13 14 15 19
        // 4   20 21 22 23 24
        assert_eq!(pairing_szudzik(0, 0), 0);
        assert_eq!(pairing_szudzik(0, 1), 1);
        assert_eq!(pairing_szudzik(1, 0), 2);
        assert_eq!(pairing_szudzik(1, 1), 3);
        assert_eq!(pairing_szudzik(0, 2), 4);
        assert_eq!(pairing_szudzik(1, 2), 5);
        assert_eq!(pairing_szudzik(2, 0), 6);
        assert_eq!(pairing_szudzik(2, 2), 8);
        assert_eq!(pairing_szudzik(4, 4), 24);
    }

    #[test]
    fn test_next_permutation() {
        let mut xs = [1, 2, 3];
        let mut seen = vec![xs];
        while next_permutation(&mut xs) {
            seen.push(xs);
        }
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[1], [1, 3, 2]);
        assert_eq!(seen[5], [3, 2, 1]);
        assert_eq!(xs, [1, 2, 3]);

        let mut from_middle = [2, 1, 3];
        assert!(next_permutation(&mut from_middle));
        assert_eq!(from_middle, [2, 3, 1]);
        let mut single = [7];
        assert!(!next_permutation(&mut single));
    }

    #[test]
    fn test_pairing_wraps_instead_of_overflowing() {
        let _ = pairing3(u64::MAX, u64::MAX - 1, 7);
        assert_ne!(vec![1u32, 2, 3].hash(), vec![3u32, 2, 1].hash());
    }
}
