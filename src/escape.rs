//! Escape-time evaluation for the Mandelbrot iteration `z <- z^2 + c`.

use num_complex::Complex64;

/// Squared escape radius.
const ESCAPE_NORM_SQR: f64 = 4.0;

/// Returns the normalized escape intensity of `c` for the iteration cap `max_iterations`.
///
/// The output is `0` if `c` did not escape within `max_iterations` steps (i.e., it is
/// considered to be in the set) and `i / max_iterations` otherwise, where `i` is the number
/// of completed iterations. Thus, the output is always in `[0, 1)`.
///
/// `max_iterations` is expected to be positive; `0` is treated as `1`.
#[inline]
pub fn escape_intensity(c: Complex64, max_iterations: u32) -> f64 {
    let max_iterations = max_iterations.max(1);
    let mut z = Complex64::new(0.0, 0.0);
    let mut iterations = 0;

    while z.norm_sqr() < ESCAPE_NORM_SQR && iterations < max_iterations {
        z = z * z + c;
        iterations += 1;
    }

    if iterations == max_iterations {
        0.0
    } else {
        f64::from(iterations) / f64::from(max_iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_is_in_the_set() {
        for max_iterations in [1, 2, 10, 100, 1_000] {
            assert_eq!(escape_intensity(Complex64::new(0.0, 0.0), max_iterations), 0.0);
        }
    }

    #[test]
    fn points_far_outside_escape_immediately() {
        // The first iteration maps `0` to `c`, which is already outside the escape radius.
        let intensity = escape_intensity(Complex64::new(3.0, 0.0), 10);
        assert_eq!(intensity, 0.1);
        let intensity = escape_intensity(Complex64::new(0.0, -2.5), 4);
        assert_eq!(intensity, 0.25);
    }

    #[test]
    fn escape_count_is_exact() {
        // 0 -> 1 -> 2; |2|^2 == 4 is not below the escape radius, so the loop stops at 2.
        let intensity = escape_intensity(Complex64::new(1.0, 0.0), 10);
        assert_eq!(intensity, 0.2);
    }

    #[test]
    fn escape_at_last_iteration_counts_as_in_set() {
        // `c = 1` needs 2 iterations to reach |z|^2 >= 4.
        assert_eq!(escape_intensity(Complex64::new(1.0, 0.0), 2), 0.0);
        assert_eq!(escape_intensity(Complex64::new(1.0, 0.0), 3), 2.0 / 3.0);
    }

    #[test]
    fn intensity_is_quantized_and_below_one() {
        let max_iterations = 17;
        for i in -30..=10 {
            for j in -15..=15 {
                let c = Complex64::new(f64::from(i) / 10.0, f64::from(j) / 10.0);
                let intensity = escape_intensity(c, max_iterations);
                assert!((0.0..1.0).contains(&intensity), "{c}: {intensity}");
                let steps = intensity * f64::from(max_iterations);
                assert!((steps - steps.round()).abs() < 1e-9, "{c}: {intensity}");
            }
        }
    }

    #[test]
    fn zero_iterations_are_clamped() {
        assert_eq!(escape_intensity(Complex64::new(5.0, 0.0), 0), 0.0);
    }
}
