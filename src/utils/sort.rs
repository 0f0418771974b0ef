/// Below this length insertion sort beats allocating scratch buffers.
const SMALL_SORT_LEN: usize = 32;

/// Stable LSD radix sort of parallel `inds`/`vals` slices by `inds` ascending.
///
/// Feature indices of a vocabulary rarely exceed 16 bits, so only the
/// low two byte passes run in that case. The pass count is always even,
/// which leaves the result in the caller's slices.
pub fn radix_sort_u32_soa<N: Copy>(inds: &mut [u32], vals: &mut [N]) {
    assert_eq!(inds.len(), vals.len());
    let n = inds.len();
    if n <= 1 {
        return;
    }
    if n <= SMALL_SORT_LEN {
        insertion_sort_u32_soa(inds, vals);
        return;
    }

    let max_key = inds.iter().copied().max().unwrap_or(0);
    let shifts: &[u32] = if max_key <= u16::MAX as u32 { &[0, 8] } else { &[0, 8, 16, 24] };

    let mut tmp_inds = vec![0u32; n];
    let mut tmp_vals = vals.to_vec();
    for (pass, &shift) in shifts.iter().enumerate() {
        if pass % 2 == 0 {
            scatter_pass(inds, vals, &mut tmp_inds, &mut tmp_vals, shift);
        } else {
            scatter_pass(&tmp_inds, &tmp_vals, inds, vals, shift);
        }
    }
}

/// One counting-sort pass on the byte at `shift`.
fn scatter_pass<N: Copy>(src_inds: &[u32], src_vals: &[N], dst_inds: &mut [u32], dst_vals: &mut [N], shift: u32) {
    let mut count = [0usize; 256];
    for &k in src_inds {
        count[((k >> shift) & 0xFF) as usize] += 1;
    }
    // prefix sum -> start positions
    let mut sum = 0usize;
    for c in count.iter_mut() {
        let tmp = *c;
        *c = sum;
        sum += tmp;
    }
    for (&k, &v) in src_inds.iter().zip(src_vals) {
        let bucket = ((k >> shift) & 0xFF) as usize;
        let pos = count[bucket];
        count[bucket] = pos + 1;
        dst_inds[pos] = k;
        dst_vals[pos] = v;
    }
}

#[inline]
fn insertion_sort_u32_soa<N: Copy>(inds: &mut [u32], vals: &mut [N]) {
    for i in 1..inds.len() {
        let mut j = i;
        while j > 0 && inds[j] < inds[j - 1] {
            inds.swap(j, j - 1);
            vals.swap(j, j - 1);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// sort by key, equal keys keep original order
    fn baseline_stable_sort<N: Copy>(inds: &[u32], vals: &[N]) -> (Vec<u32>, Vec<N>) {
        let mut pairs: Vec<(u32, usize, N)> = inds
            .iter()
            .copied()
            .enumerate()
            .map(|(i, k)| (k, i, vals[i]))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        pairs.into_iter().map(|(k, _, v)| (k, v)).unzip()
    }

    /// xorshift32
    struct Rng(u32);
    impl Rng {
        fn next_u32(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            x
        }
    }

    #[test]
    fn radix_sort_handles_empty_and_single() {
        let mut inds: Vec<u32> = vec![];
        let mut vals: Vec<f32> = vec![];
        radix_sort_u32_soa(&mut inds, &mut vals);
        assert!(inds.is_empty());

        let mut inds = vec![42u32];
        let mut vals = vec![0.5f32];
        radix_sort_u32_soa(&mut inds, &mut vals);
        assert_eq!(inds, vec![42]);
        assert_eq!(vals, vec![0.5]);
    }

    #[test]
    fn radix_sort_matches_baseline_for_small_and_wide_keys() {
        let mut rng = Rng(0x1234_5678);
        for &(n, mask) in &[(7usize, 0xFFu32), (33, 0xFFFF), (129, 0xFFFF), (1024, 0x00FF_FFFF), (64, u32::MAX)] {
            let mut inds: Vec<u32> = (0..n).map(|_| rng.next_u32() & mask).collect();
            let mut vals: Vec<u32> = (0..n as u32).collect();
            let (base_k, base_v) = baseline_stable_sort(&inds, &vals);

            radix_sort_u32_soa(&mut inds, &mut vals);

            assert_eq!(inds, base_k, "keys mismatch at n={n}");
            assert_eq!(vals, base_v, "vals mismatch at n={n}");
        }
    }
}
