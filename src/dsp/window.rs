/// Symmetric Hann window: `w[n] = 0.5 - 0.5 * cos(2πn / (L - 1))`.
pub fn hann_window(size: usize) -> Vec<f32> {
    if size == 1 {
        return vec![1.0];
    }
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (size - 1) as f64).cos()) as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tapers_to_zero_at_both_ends() {
        let w = hann_window(2048);
        assert_eq!(w.len(), 2048);
        assert!(w[0].abs() < 1e-7);
        assert!(w[2047].abs() < 1e-7);
        assert!(w[1023] > 0.999);
    }

    #[test]
    fn is_symmetric() {
        let w = hann_window(101);
        for i in 0..101 {
            assert!((w[i] - w[100 - i]).abs() < 1e-6);
        }
        assert!((w[50] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_sizes() {
        assert!(hann_window(0).is_empty());
        assert_eq!(hann_window(1), vec![1.0]);
    }
}
