//! Simulated annealing over orderings.
//!
//! A step swaps two distinct positions. At every temperature the walk takes
//! [`SaParams::iterations`] steps, accepting a worse ordering with
//! probability `exp(-dE / (k * T))`, and the temperature is then divided by
//! [`SaParams::damp`] until it drops below [`SaParams::t_min`]. The best
//! ordering seen on the walk is returned.
//!
//! Runs restart from the best ordering so far; with `runs == 0` they repeat
//! until the energy has been stable three times. Parallel runs anneal one
//! copy per CPU with consecutive seeds and keep the best.

use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::bound::Bound;
use crate::deadline::Deadline;
use crate::types::Variable;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SaParams {
    /// Unused by the fixed-step walk.
    pub tries: usize,
    /// Steps per temperature.
    pub iterations: usize,
    pub step_size: f64,
    /// Boltzmann constant.
    pub k: f64,
    pub t_initial: f64,
    /// Cooling factor applied after each temperature.
    pub damp: f64,
    pub t_min: f64,
    pub seed: u64,
    pub runs: usize,
    pub parallel: bool,
}

impl Default for SaParams {
    fn default() -> Self {
        Self {
            tries: 200,
            iterations: 100,
            step_size: 1.0,
            k: 1.0,
            t_initial: 5000.0,
            damp: 1.002,
            t_min: 0.5,
            seed: 0,
            runs: 1,
            parallel: false,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Energy {
    /// Chain weight bound over the number of CPT entries.
    Ratio,
    /// Pseudo-tree node bound.
    TreeNodes,
    /// Logarithm of the pseudo-tree level widths.
    TreeScore,
}

impl Energy {
    pub fn evaluate(self, bound: &Bound, ordering: &[Variable]) -> f64 {
        match self {
            Energy::Ratio => bound.compute_ratio(ordering),
            Energy::TreeNodes => bound.compute_tree_approx(ordering),
            Energy::TreeScore => bound.compute_tree_score(ordering),
        }
    }
}

/// Anneal `ordering` and return the best ordering found.
pub fn anneal(
    bound: &Bound,
    mut ordering: Vec<Variable>,
    energy: Energy,
    params: &SaParams,
    deadline: &Deadline,
) -> Vec<Variable> {
    if ordering.len() < 2 {
        return ordering;
    }

    let workers = if params.parallel { num_cpus::get().max(1) } else { 1 };
    let mut best_energy = f64::MAX;
    let mut stable = 0;
    let mut run = 0;
    while params.runs == 0 || run < params.runs {
        let base = params.seed.wrapping_add((run * workers) as u64);
        let initial = energy.evaluate(bound, &ordering);

        let (walked, e) = if workers == 1 {
            walk(bound, ordering.clone(), energy, params, base, deadline)
        } else {
            std::thread::scope(|s| {
                let handles: Vec<_> = (0..workers)
                    .map(|i| {
                        let start = ordering.clone();
                        s.spawn(move || walk(bound, start, energy, params, base.wrapping_add(i as u64), deadline))
                    })
                    .collect();
                handles
                    .into_iter()
                    .filter_map(|h| h.join().ok())
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .unwrap_or_else(|| (ordering.clone(), initial))
            })
        };
        if e <= initial {
            ordering = walked;
        }
        info!("anneal run {}: energy {:.3} -> {:.3}", run + 1, initial, e.min(initial));

        if params.runs == 0 {
            let current = e.min(initial);
            if current < best_energy {
                best_energy = current;
                stable = 1;
            } else if current == best_energy {
                stable += 1;
            }
            debug!("anneal stability {}/3", stable);
            if stable >= 3 {
                break;
            }
        }
        if deadline.expired() {
            warn!("annealing stopped at the deadline after {} runs", run + 1);
            break;
        }
        run += 1;
    }
    ordering
}

/// One annealing walk from `x`, returning the best state and its energy.
fn walk(
    bound: &Bound,
    mut x: Vec<Variable>,
    energy: Energy,
    params: &SaParams,
    seed: u64,
    deadline: &Deadline,
) -> (Vec<Variable>, f64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n = x.len();
    let mut e = energy.evaluate(bound, &x);
    let mut best = x.clone();
    let mut best_e = e;
    let mut t = params.t_initial;
    let mut temperatures = 0usize;

    while t >= params.t_min && !deadline.expired() {
        for _ in 0..params.iterations {
            let i = rng.random_range(0..n);
            let mut j = rng.random_range(0..n - 1);
            if j >= i {
                j += 1;
            }
            x.swap(i, j);
            let new_e = energy.evaluate(bound, &x);
            if new_e <= best_e {
                best_e = new_e;
                best.clone_from(&x);
            }
            if new_e < e || rng.random::<f64>() < (-(new_e - e) / (params.k * t)).exp() {
                e = new_e;
            } else {
                x.swap(i, j);
            }
        }
        t /= params.damp;
        temperatures += 1;
    }
    debug!("anneal walk (seed {}): {} temperatures, best {:.3}", seed, temperatures, best_e);
    (best, best_e)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::bayesnet::BayesNet;

    /// A -> B -> C -> D -> E, binary.
    fn chain() -> BayesNet {
        let mut bn = BayesNet::new();
        let names = ["A", "B", "C", "D", "E"];
        let vars: Vec<Variable> = names.iter().map(|n| bn.add_variable(n, &["0", "1"])).collect();
        for w in vars.windows(2) {
            bn.set_potential(w[1], &[w[0]], vec![0.5; 4]).unwrap();
        }
        bn
    }

    fn quick() -> SaParams {
        SaParams {
            iterations: 50,
            t_initial: 2.0,
            damp: 1.2,
            t_min: 0.01,
            ..SaParams::default()
        }
    }

    #[test]
    fn test_anneal_never_worsens() {
        let bound = Bound::new(&chain());
        let start = vec![4, 0, 3, 1, 2];
        for energy in [Energy::Ratio, Energy::TreeNodes, Energy::TreeScore] {
            let result = anneal(&bound, start.clone(), energy, &quick(), &Deadline::none());
            let mut sorted = result.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
            assert!(energy.evaluate(&bound, &result) <= energy.evaluate(&bound, &start));
        }
    }

    #[test]
    fn test_seeded_walk_is_reproducible() {
        let bound = Bound::new(&chain());
        let start = vec![2, 4, 0, 3, 1];
        let a = walk(&bound, start.clone(), Energy::Ratio, &quick(), 7, &Deadline::none());
        let b = walk(&bound, start, Energy::Ratio, &quick(), 7, &Deadline::none());
        assert_eq!(a, b);
    }

    #[test]
    fn test_parallel_and_repeated_runs() {
        let bound = Bound::new(&chain());
        let params = SaParams {
            parallel: true,
            runs: 0,
            ..quick()
        };
        let result = anneal(&bound, vec![3, 1, 4, 0, 2], Energy::TreeScore, &params, &Deadline::none());
        assert_eq!(result.len(), 5);
    }

    #[test]
    fn test_short_orderings_untouched() {
        let bound = Bound::new(&chain());
        assert_eq!(anneal(&bound, vec![3], Energy::Ratio, &quick(), &Deadline::none()), vec![3]);
    }
}
