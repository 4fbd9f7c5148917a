//! # Displacement Policy
//!
//! A height offset as a pure function of position and time:
//!
//! ```text
//! offset = sin(time * speed + (6 - |position|)) * amplitude
//! ```
//!
//! Rings of equal phase spread outward from the origin. The function has no
//! state, so any number of workers may evaluate it at once.
//!
//! The math runs in `f64` with the distance summed component by component,
//! so a given input produces the same bits on every thread.

use glam::Vec3;

/// Phase offset at the origin, in radians.
pub const WAVE_PHASE: f64 = 6.0;

/// Computes the height offset for `position` at `time`.
#[inline]
#[must_use]
pub fn displace(position: Vec3, time: f64, speed: f64, amplitude: f64) -> f64 {
    let x = f64::from(position.x);
    let y = f64::from(position.y);
    let z = f64::from(position.z);
    let distance = (x * x + y * y + z * z).sqrt();
    (time * speed + (WAVE_PHASE - distance)).sin() * amplitude
}

/// A height-offset policy. Must be pure: same inputs, same output.
pub trait Displacement: Send + Sync {
    /// Height offset for `position` at `time`.
    fn offset(&self, position: Vec3, time: f64, speed: f64, amplitude: f64) -> f64;
}

/// The radial sine wave of [`displace`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RadialSine;

impl Displacement for RadialSine {
    #[inline]
    fn offset(&self, position: Vec3, time: f64, speed: f64, amplitude: f64) -> f64 {
        displace(position, time, speed, amplitude)
    }
}

impl<F> Displacement for F
where
    F: Fn(Vec3, f64, f64, f64) -> f64 + Send + Sync,
{
    #[inline]
    fn offset(&self, position: Vec3, time: f64, speed: f64, amplitude: f64) -> f64 {
        self(position, time, speed, amplitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-3;

    #[test]
    fn test_reference_offsets() {
        let origin = displace(Vec3::new(0.0, 0.0, 0.0), 0.0, 2.0, 0.25);
        let unit = displace(Vec3::new(1.0, 0.0, 0.0), 0.0, 2.0, 0.25);
        let ring = displace(Vec3::new(0.0, 0.0, 6.0), 0.0, 2.0, 0.25);

        assert_eq!(origin, 6.0_f64.sin() * 0.25);
        assert_eq!(unit, 5.0_f64.sin() * 0.25);
        assert!((origin - (-0.0697)).abs() < EPSILON, "origin: {origin}");
        assert!((unit - (-0.2397)).abs() < EPSILON, "unit: {unit}");
        assert_eq!(ring, 0.0);
    }

    #[test]
    fn test_time_and_speed_shift_phase() {
        let p = Vec3::new(1.0, 0.0, 0.0);
        // time * speed = 1 puts the unit vertex at phase 6
        let shifted = displace(p, 0.5, 2.0, 0.25);
        let origin = displace(Vec3::ZERO, 0.0, 2.0, 0.25);
        assert_eq!(shifted, origin);
    }

    #[test]
    fn test_zero_amplitude_is_flat() {
        for i in 0..100 {
            let p = Vec3::new(i as f32 * 0.37, -1.0, 2.5);
            assert_eq!(displace(p, f64::from(i), 2.0, 0.0).abs(), 0.0);
        }
    }

    #[test]
    fn test_deterministic_across_threads() {
        let inputs: Vec<Vec3> = (0..256)
            .map(|i| Vec3::new(i as f32 * 0.1, (i % 7) as f32, -(i as f32) * 0.05))
            .collect();
        let expected: Vec<u64> = inputs
            .iter()
            .map(|&p| displace(p, 12.345, 2.0, 0.25).to_bits())
            .collect();

        std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        inputs
                            .iter()
                            .map(|&p| displace(p, 12.345, 2.0, 0.25).to_bits())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            for worker in workers {
                assert_eq!(worker.join().expect("worker panicked"), expected);
            }
        });
    }

    #[test]
    fn test_closure_policy() {
        let flat = |_: Vec3, _: f64, _: f64, amplitude: f64| amplitude;
        assert_eq!(flat.offset(Vec3::ONE, 1.0, 1.0, 0.5), 0.5);
        assert_eq!(
            RadialSine.offset(Vec3::X, 0.0, 2.0, 0.25),
            displace(Vec3::X, 0.0, 2.0, 0.25)
        );
    }
}
