// Seeded train/test split stratified on equal-width target bins.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices of each side of a split, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Assign each target to one of `bins` equal-width bins over its range.
pub fn target_bins(targets: &[f64], bins: usize) -> Vec<usize> {
    let bins = bins.max(1);
    let min = targets.iter().copied().fold(f64::INFINITY, f64::min);
    let max = targets.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / bins as f64;
    targets
        .iter()
        .map(|&t| {
            if width.is_nan() || width <= 0.0 {
                return 0;
            }
            (((t - min) / width).floor() as usize).min(bins - 1)
        })
        .collect()
}

/// Split rows so each target bin contributes to the test side in proportion
/// to its size.
///
/// The test side holds `ceil(test_fraction * n)` rows. Per-bin quotas are
/// floored and the remainder goes to the bins with the largest fractional
/// parts (lower bin first on ties). Within a bin, rows are drawn after a
/// seeded shuffle, so the same seed always gives the same split.
pub fn stratified_split(targets: &[f64], test_fraction: f64, bins: usize, seed: u64) -> SplitIndices {
    let n = targets.len();
    let n_test = ((test_fraction * n as f64).ceil() as usize).min(n);
    let labels = target_bins(targets, bins);

    let n_bins = labels.iter().copied().max().map_or(0, |m| m + 1);
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_bins];
    for (i, &b) in labels.iter().enumerate() {
        members[b].push(i);
    }

    let mut quotas: Vec<usize> = Vec::with_capacity(n_bins);
    let mut remainders: Vec<(usize, f64)> = Vec::with_capacity(n_bins);
    for (b, rows) in members.iter().enumerate() {
        let exact = n_test as f64 * rows.len() as f64 / n as f64;
        quotas.push(exact.floor() as usize);
        remainders.push((b, exact - exact.floor()));
    }
    remainders.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let mut missing = n_test.saturating_sub(quotas.iter().sum());
    for &(b, _) in &remainders {
        if missing == 0 {
            break;
        }
        if quotas[b] < members[b].len() {
            quotas[b] += 1;
            missing -= 1;
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (rows, quota) in members.iter_mut().zip(quotas) {
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..quota]);
        train.extend_from_slice(&rows[quota..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    SplitIndices { train, test }
}
