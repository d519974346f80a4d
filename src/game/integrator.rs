//! Fixed-step time integrators
//!
//! Works on any system that can hand out its state as a keyed map of flat
//! numeric vectors and evaluate the derivative of such a map. Vectors may
//! have any length as long as state and derivative agree per key. No
//! clamping happens here; limits belong to the derivative evaluator.

use std::hash::Hash;

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;

/// Inline capacity for state vectors (attack particles use 6 slots)
pub const STATE_INLINE: usize = 8;

/// Flat, consistently ordered state (or derivative) of one entity
pub type StateVector = SmallVec<[f32; STATE_INLINE]>;

/// State of a whole system, keyed by entity
pub type StateMap<K> = HashMap<K, StateVector, FxBuildHasher>;

/// A system the integrators can step
pub trait Integrable {
    type Key: Copy + Eq + Hash;

    fn get_state(&self) -> StateMap<Self::Key>;

    fn set_state(&mut self, state: StateMap<Self::Key>);

    /// Derivative per key, same shape as `state`
    fn eval_deriv(&mut self, state: &StateMap<Self::Key>) -> StateMap<Self::Key>;
}

/// Forward Euler: state += deriv * dt
pub fn euler_step<S: Integrable>(system: &mut S, dt: f32) {
    let state = system.get_state();
    let deriv = system.eval_deriv(&state);
    system.set_state(advance(&state, &deriv, dt));
}

/// Trapezoidal (improved Euler / Heun) step:
/// state += (deriv(state) + deriv(euler_trial)) * dt / 2
pub fn trapezoidal_step<S: Integrable>(system: &mut S, dt: f32) {
    let state = system.get_state();
    let deriv = system.eval_deriv(&state);
    let trial = advance(&state, &deriv, dt);
    let deriv_next = system.eval_deriv(&trial);

    let half_dt = 0.5 * dt;
    let next = state
        .iter()
        .map(|(key, current)| {
            let updated = match (deriv.get(key), deriv_next.get(key)) {
                (Some(d0), Some(d1)) => {
                    debug_assert_eq!(current.len(), d0.len(), "derivative shape mismatch");
                    debug_assert_eq!(current.len(), d1.len(), "derivative shape mismatch");
                    current
                        .iter()
                        .zip(d0.iter().zip(d1.iter()))
                        .map(|(s, (a, b))| s + (a + b) * half_dt)
                        .collect()
                }
                _ => current.clone(),
            };
            (*key, updated)
        })
        .collect();

    system.set_state(next);
}

/// state + deriv * dt for every key; keys without a derivative are left as-is
fn advance<K: Copy + Eq + Hash>(state: &StateMap<K>, deriv: &StateMap<K>, dt: f32) -> StateMap<K> {
    state
        .iter()
        .map(|(key, current)| {
            let updated = match deriv.get(key) {
                Some(d) => {
                    debug_assert_eq!(current.len(), d.len(), "derivative shape mismatch");
                    current.iter().zip(d.iter()).map(|(s, d)| s + d * dt).collect()
                }
                None => current.clone(),
            };
            (*key, updated)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    const EPSILON: f32 = 1e-5;

    /// Every key has the same constant derivative
    struct Constant {
        state: StateMap<u32>,
        rate: StateVector,
        evaluations: usize,
    }

    impl Integrable for Constant {
        type Key = u32;

        fn get_state(&self) -> StateMap<u32> {
            self.state.clone()
        }

        fn set_state(&mut self, state: StateMap<u32>) {
            self.state = state;
        }

        fn eval_deriv(&mut self, state: &StateMap<u32>) -> StateMap<u32> {
            self.evaluations += 1;
            state.keys().map(|k| (*k, self.rate.clone())).collect()
        }
    }

    /// x' = -x, one scalar per key
    struct Decay {
        state: StateMap<u8>,
    }

    impl Integrable for Decay {
        type Key = u8;

        fn get_state(&self) -> StateMap<u8> {
            self.state.clone()
        }

        fn set_state(&mut self, state: StateMap<u8>) {
            self.state = state;
        }

        fn eval_deriv(&mut self, state: &StateMap<u8>) -> StateMap<u8> {
            state
                .iter()
                .map(|(k, s)| (*k, s.iter().map(|x| -x).collect()))
                .collect()
        }
    }

    fn constant_system() -> Constant {
        let mut state = StateMap::default();
        state.insert(1, smallvec![0.0, 10.0, -2.0]);
        state.insert(2, smallvec![5.0, 5.0, 5.0]);
        Constant {
            state,
            rate: smallvec![1.0, -0.5, 2.0],
            evaluations: 0,
        }
    }

    #[test]
    fn test_euler_constant_derivative() {
        let mut system = constant_system();
        euler_step(&mut system, 0.5);

        assert_eq!(system.evaluations, 1);
        let one = &system.state[&1];
        assert!((one[0] - 0.5).abs() < EPSILON);
        assert!((one[1] - 9.75).abs() < EPSILON);
        assert!((one[2] - -1.0).abs() < EPSILON);
    }

    #[test]
    fn test_trapezoidal_matches_euler_for_constant_derivative() {
        let mut euler = constant_system();
        let mut trapezoid = constant_system();
        euler_step(&mut euler, 0.25);
        trapezoidal_step(&mut trapezoid, 0.25);

        assert_eq!(trapezoid.evaluations, 2);
        for key in [1, 2] {
            for (a, b) in euler.state[&key].iter().zip(trapezoid.state[&key].iter()) {
                assert!((a - b).abs() < EPSILON);
            }
        }
    }

    #[test]
    fn test_trapezoidal_is_more_accurate_on_decay() {
        let dt: f32 = 0.1;
        let exact = (-dt).exp();

        let initial: StateMap<u8> = [(0u8, smallvec![1.0])].into_iter().collect();
        let mut euler = Decay { state: initial.clone() };
        let mut trapezoid = Decay { state: initial };
        euler_step(&mut euler, dt);
        trapezoidal_step(&mut trapezoid, dt);

        let euler_err = (euler.state[&0][0] - exact).abs();
        let trapezoid_err = (trapezoid.state[&0][0] - exact).abs();
        assert!((trapezoid.state[&0][0] - 0.905).abs() < EPSILON);
        assert!(trapezoid_err < euler_err);
    }

    #[test]
    fn test_empty_system_is_a_no_op() {
        let mut system = Decay { state: StateMap::default() };
        trapezoidal_step(&mut system, 1.0);
        assert!(system.state.is_empty());
    }
}
