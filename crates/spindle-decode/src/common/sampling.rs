use super::error::{GenerationError, GenerationResult};
use super::{GREEDY_TEMPERATURE_THRESHOLD, GenerationConfig};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A token sampling strategy together with its parameters and RNG state.
///
/// Each variant owns its own generator, so two strategies built from the same
/// seed produce the same choices for the same sequence of logits.
#[derive(Debug, Clone)]
pub enum SamplingStrategy {
    /// Argmax. Ties go to the lowest index.
    Greedy,
    /// Softmax over the full vocabulary after temperature scaling.
    Temperature { temperature: f32, rng: StdRng },
    /// Softmax over the `k` highest logits only.
    TopK {
        k: usize,
        temperature: f32,
        rng: StdRng,
    },
    /// Softmax over the smallest prefix of ranked tokens whose mass reaches `p`.
    TopP { p: f32, temperature: f32, rng: StdRng },
}

impl SamplingStrategy {
    pub fn greedy() -> Self {
        Self::Greedy
    }

    pub fn temperature(temperature: f32, seed: Option<u64>) -> GenerationResult<Self> {
        validate_temperature(temperature)?;
        Ok(Self::Temperature {
            temperature,
            rng: make_rng(seed),
        })
    }

    pub fn top_k(k: usize, temperature: f32, seed: Option<u64>) -> GenerationResult<Self> {
        if k == 0 {
            return Err(GenerationError::InvalidConfiguration(
                "top_k must be positive".to_string(),
            ));
        }
        validate_temperature(temperature)?;
        Ok(Self::TopK {
            k,
            temperature,
            rng: make_rng(seed),
        })
    }

    pub fn top_p(p: f32, temperature: f32, seed: Option<u64>) -> GenerationResult<Self> {
        if !(p > 0.0 && p <= 1.0) {
            return Err(GenerationError::InvalidConfiguration(format!(
                "top_p must be in (0, 1], got {}",
                p
            )));
        }
        validate_temperature(temperature)?;
        Ok(Self::TopP {
            p,
            temperature,
            rng: make_rng(seed),
        })
    }

    /// Human-readable description for logs.
    pub fn name(&self) -> String {
        match self {
            Self::Greedy => "greedy".to_string(),
            Self::Temperature { temperature, .. } => format!("temperature({})", temperature),
            Self::TopK { k, temperature, .. } => format!("top_k({}, temp={})", k, temperature),
            Self::TopP { p, temperature, .. } => format!("top_p({}, temp={})", p, temperature),
        }
    }

    /// Picks a token index from `logits`. The input is never modified.
    ///
    /// `logits` must be non-empty; the result is always in `0..logits.len()`.
    pub fn sample(&mut self, logits: &Array1<f32>) -> usize {
        debug_assert!(!logits.is_empty(), "cannot sample from empty logits");
        match self {
            Self::Greedy => argmax(logits),
            Self::Temperature { temperature, rng } => {
                let scaled = logits / *temperature;
                let probs = softmax(&scaled);
                sample_from_probs(&probs, rng)
            }
            Self::TopK { k, temperature, rng } => {
                let effective_k = (*k).min(logits.len());
                let ranked = ranked_indices(logits);
                let top = &ranked[..effective_k];

                let scaled: Array1<f32> = top.iter().map(|&i| logits[i] / *temperature).collect();
                let probs = softmax(&scaled);
                top[sample_from_probs(&probs, rng)]
            }
            Self::TopP { p, temperature, rng } => {
                let scaled = logits / *temperature;
                let probs = softmax(&scaled);
                let nucleus = nucleus_indices(&probs, *p);

                let mass: f32 = nucleus.iter().map(|&i| probs[i]).sum();
                let renormalized: Array1<f32> = nucleus.iter().map(|&i| probs[i] / mass).collect();
                nucleus[sample_from_probs(&renormalized, rng)]
            }
        }
    }
}

/// Maps a generation config to exactly one strategy.
///
/// Priority: greedy (sampling off or near-zero temperature), then top-p, then
/// top-k, then plain temperature. Top-p wins when both truncations are active.
pub fn select_strategy(config: &GenerationConfig) -> GenerationResult<SamplingStrategy> {
    if !config.do_sample || config.temperature < GREEDY_TEMPERATURE_THRESHOLD {
        return Ok(SamplingStrategy::greedy());
    }

    if config.top_p > 0.0 && config.top_p < 1.0 {
        return SamplingStrategy::top_p(config.top_p, config.temperature, config.seed);
    }

    match config.top_k {
        Some(k) if k > 0 => SamplingStrategy::top_k(k, config.temperature, config.seed),
        _ => SamplingStrategy::temperature(config.temperature, config.seed),
    }
}

fn validate_temperature(temperature: f32) -> GenerationResult<()> {
    if temperature > 0.0 && temperature.is_finite() {
        Ok(())
    } else {
        Err(GenerationError::InvalidConfiguration(format!(
            "temperature must be positive, got {}",
            temperature
        )))
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Index of the first maximum, scanning left to right.
pub fn argmax(logits: &Array1<f32>) -> usize {
    let mut best = 0;
    let mut best_value = logits[0];
    for (i, &value) in logits.iter().enumerate().skip(1) {
        if value > best_value {
            best_value = value;
            best = i;
        }
    }
    best
}

/// Numerically stable softmax: the maximum is subtracted before exponentiating.
pub fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    let max_logit = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let mut probs = logits.mapv(|x| (x - max_logit).exp());
    let sum = probs.sum();
    probs /= sum;
    probs
}

/// Draws one index from a categorical distribution.
///
/// Walks the cumulative sum until it first reaches the uniform draw `r`.
/// If rounding leaves the total short of `r`, the last index is returned.
pub fn sample_from_probs<R: Rng>(probs: &Array1<f32>, rng: &mut R) -> usize {
    let r: f32 = rng.r#gen();
    let mut cumulative = 0.0;
    for (idx, &prob) in probs.iter().enumerate() {
        cumulative += prob;
        if prob > 0.0 && cumulative >= r {
            return idx;
        }
    }
    probs.len().saturating_sub(1)
}

/// Indices sorted by descending value. Equal values keep ascending index order.
pub fn ranked_indices(values: &Array1<f32>) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| values[b].total_cmp(&values[a]).then(a.cmp(&b)));
    indices
}

/// The nucleus of a probability vector, in descending probability order.
///
/// Accumulates ranked probabilities until the running sum first reaches `p`,
/// including the element that crosses the threshold. When rounding keeps the
/// total below `p`, the whole vocabulary is returned.
pub fn nucleus_indices(probs: &Array1<f32>, p: f32) -> Vec<usize> {
    let mut ranked = ranked_indices(probs);
    let mut cumulative = 0.0;
    let mut size = ranked.len();
    for (i, &idx) in ranked.iter().enumerate() {
        cumulative += probs[idx];
        if cumulative >= p {
            size = i + 1;
            break;
        }
    }
    ranked.truncate(size);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::collections::HashSet;

    /// Shannon entropy in nats of an empirical distribution of counts.
    fn empirical_entropy(counts: &[usize]) -> f64 {
        let total: usize = counts.iter().sum();
        if total == 0 {
            return 0.0;
        }
        counts
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let p = c as f64 / total as f64;
                -p * p.ln()
            })
            .sum()
    }

    fn draw(strategy: &mut SamplingStrategy, logits: &Array1<f32>, n: usize) -> Vec<usize> {
        (0..n).map(|_| strategy.sample(logits)).collect()
    }

    fn counts(samples: &[usize], vocab: usize) -> Vec<usize> {
        let mut counts = vec![0; vocab];
        for &s in samples {
            counts[s] += 1;
        }
        counts
    }

    // ============== softmax ==============

    #[test]
    fn test_softmax_basic() {
        let probs = softmax(&array![1.0, 2.0, 3.0]);
        assert_abs_diff_eq!(probs.sum(), 1.0, epsilon = 1e-6);
        assert!(probs[2] > probs[1]);
        assert!(probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_numerical_stability() {
        let probs = softmax(&array![1000.0, 1001.0, 1002.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert_abs_diff_eq!(probs.sum(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_softmax_uniform() {
        let probs = softmax(&array![3.0, 3.0, 3.0, 3.0]);
        for &p in probs.iter() {
            assert_abs_diff_eq!(p, 0.25, epsilon = 1e-6);
        }
    }

    // ============== sample_from_probs ==============

    #[test]
    fn test_sample_from_probs_point_mass() {
        let mut rng = StdRng::seed_from_u64(0);
        let probs = array![0.0, 0.0, 1.0, 0.0];
        for _ in 0..20 {
            assert_eq!(sample_from_probs(&probs, &mut rng), 2);
        }
    }

    #[test]
    fn test_sample_from_probs_short_sum_falls_back_to_last() {
        let mut rng = StdRng::seed_from_u64(0);
        let probs = array![0.0, 0.0, 0.0];
        assert_eq!(sample_from_probs(&probs, &mut rng), 2);
    }

    #[test]
    fn test_sample_from_empty_probs_does_not_underflow() {
        let mut rng = StdRng::seed_from_u64(0);
        let probs: Array1<f32> = Array1::zeros(0);
        assert_eq!(sample_from_probs(&probs, &mut rng), 0);
    }

    // ============== greedy ==============

    #[test]
    fn test_greedy_picks_max() {
        let mut greedy = SamplingStrategy::greedy();
        assert_eq!(greedy.sample(&array![1.0, 5.0, 2.0, 3.0]), 1);
    }

    #[test]
    fn test_greedy_tie_lowest_index() {
        let mut greedy = SamplingStrategy::greedy();
        assert_eq!(greedy.sample(&array![5.0, 5.0, 3.0]), 0);
        assert_eq!(greedy.sample(&array![1.0, 7.0, 7.0, 7.0]), 1);
    }

    #[test]
    fn test_greedy_negative_logits() {
        let mut greedy = SamplingStrategy::greedy();
        assert_eq!(greedy.sample(&array![-3.0, -1.0, -2.0]), 1);
    }

    #[test]
    fn test_sample_does_not_mutate_input() {
        let logits = array![1.0, 4.0, 2.0, 3.0];
        let before = logits.clone();
        let mut strategies = vec![
            SamplingStrategy::greedy(),
            SamplingStrategy::temperature(0.7, Some(1)).unwrap(),
            SamplingStrategy::top_k(2, 0.7, Some(1)).unwrap(),
            SamplingStrategy::top_p(0.5, 0.7, Some(1)).unwrap(),
        ];
        for s in strategies.iter_mut() {
            s.sample(&logits);
            assert_eq!(logits, before);
        }
    }

    // ============== construction ==============

    #[test]
    fn test_invalid_temperature() {
        assert!(matches!(
            SamplingStrategy::temperature(0.0, None),
            Err(GenerationError::InvalidConfiguration(_))
        ));
        assert!(SamplingStrategy::temperature(-1.0, None).is_err());
        assert!(SamplingStrategy::temperature(f32::NAN, None).is_err());
        assert!(SamplingStrategy::top_k(5, 0.0, None).is_err());
        assert!(SamplingStrategy::top_p(0.5, -0.1, None).is_err());
    }

    #[test]
    fn test_invalid_top_k() {
        assert!(matches!(
            SamplingStrategy::top_k(0, 1.0, None),
            Err(GenerationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_invalid_top_p() {
        assert!(SamplingStrategy::top_p(0.0, 1.0, None).is_err());
        assert!(SamplingStrategy::top_p(-0.5, 1.0, None).is_err());
        assert!(SamplingStrategy::top_p(1.5, 1.0, None).is_err());
        assert!(SamplingStrategy::top_p(f32::NAN, 1.0, None).is_err());
        assert!(SamplingStrategy::top_p(1.0, 1.0, None).is_ok());
    }

    #[test]
    fn test_names() {
        assert_eq!(SamplingStrategy::greedy().name(), "greedy");
        assert_eq!(
            SamplingStrategy::temperature(0.5, None).unwrap().name(),
            "temperature(0.5)"
        );
        assert_eq!(
            SamplingStrategy::top_k(40, 0.7, None).unwrap().name(),
            "top_k(40, temp=0.7)"
        );
        assert_eq!(
            SamplingStrategy::top_p(0.9, 0.7, None).unwrap().name(),
            "top_p(0.9, temp=0.7)"
        );
    }

    // ============== determinism ==============

    #[test]
    fn test_seeded_strategies_are_deterministic() {
        let sequence: Vec<Array1<f32>> = (0..50)
            .map(|step| {
                (0..16)
                    .map(|i| ((i * 7 + step * 3) % 11) as f32 * 0.4 - 1.5)
                    .collect()
            })
            .collect();

        let builders: Vec<fn() -> SamplingStrategy> = vec![
            || SamplingStrategy::temperature(1.3, Some(42)).unwrap(),
            || SamplingStrategy::top_k(6, 1.3, Some(42)).unwrap(),
            || SamplingStrategy::top_p(0.8, 1.3, Some(42)).unwrap(),
        ];

        for build in builders {
            let mut a = build();
            let mut b = build();
            let first: Vec<usize> = sequence.iter().map(|l| a.sample(l)).collect();
            let second: Vec<usize> = sequence.iter().map(|l| b.sample(l)).collect();
            assert_eq!(first, second, "strategy {} diverged", a.name());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let logits = Array1::from_elem(32, 0.0f32);
        let mut a = SamplingStrategy::temperature(1.0, Some(1)).unwrap();
        let mut b = SamplingStrategy::temperature(1.0, Some(2)).unwrap();
        assert_ne!(draw(&mut a, &logits, 50), draw(&mut b, &logits, 50));
    }

    // ============== top-k ==============

    #[test]
    fn test_top_k_containment() {
        let logits = array![0.3, 2.5, -1.0, 1.7, 0.9, 3.1, -0.2, 2.2];
        let ranked = ranked_indices(&logits);

        for k in 1..=logits.len() {
            let allowed: HashSet<usize> = ranked[..k].iter().copied().collect();
            let mut sampler = SamplingStrategy::top_k(k, 2.0, Some(k as u64)).unwrap();
            for s in draw(&mut sampler, &logits, 500) {
                assert!(allowed.contains(&s), "k={} sampled {} outside top set", k, s);
            }
        }
    }

    #[test]
    fn test_top_k_one_is_argmax() {
        let logits = array![1.0, 2.0, 10.0, 0.5, 0.1];
        let mut sampler = SamplingStrategy::top_k(1, 5.0, None).unwrap();
        assert!(draw(&mut sampler, &logits, 50).iter().all(|&s| s == 2));
    }

    #[test]
    fn test_top_k_ties_prefer_lower_index() {
        let logits = array![1.0, 3.0, 3.0, 0.0];
        let mut sampler = SamplingStrategy::top_k(1, 1.0, Some(9)).unwrap();
        assert!(draw(&mut sampler, &logits, 50).iter().all(|&s| s == 1));
    }

    #[test]
    fn test_top_k_larger_than_vocab() {
        let logits = array![0.0, 0.0, 0.0];
        let mut sampler = SamplingStrategy::top_k(100, 1.0, Some(3)).unwrap();
        let seen: HashSet<usize> = draw(&mut sampler, &logits, 300).into_iter().collect();
        assert_eq!(seen.len(), 3);
    }

    // ============== top-p ==============

    #[test]
    fn test_nucleus_coverage_and_minimality() {
        let cases = [
            (array![0.5, 0.3, 0.15, 0.05], 0.75),
            (array![0.05, 0.15, 0.3, 0.5], 0.9),
            (array![0.25, 0.25, 0.25, 0.25], 0.6),
            (array![0.7, 0.1, 0.1, 0.1], 0.5),
            (array![0.4, 0.35, 0.2, 0.05], 1.0),
        ];

        for (probs, p) in cases {
            let nucleus = nucleus_indices(&probs, p);
            let mass: f32 = nucleus.iter().map(|&i| probs[i]).sum();
            assert!(mass >= p - 1e-6, "mass {} below p {}", mass, p);

            let without_last: f32 = nucleus[..nucleus.len() - 1].iter().map(|&i| probs[i]).sum();
            assert!(without_last < p, "nucleus for p={} is not minimal", p);
        }
    }

    #[test]
    fn test_nucleus_includes_crossing_element() {
        let probs = array![0.5, 0.3, 0.2];
        assert_eq!(nucleus_indices(&probs, 0.6), vec![0, 1]);
        assert_eq!(nucleus_indices(&probs, 0.5), vec![0]);
    }

    #[test]
    fn test_top_p_stays_in_nucleus() {
        let logits = array![0.0, 1.0, 2.0, 3.0, 4.0];
        let probs = softmax(&logits);
        let allowed: HashSet<usize> = nucleus_indices(&probs, 0.8).into_iter().collect();

        let mut sampler = SamplingStrategy::top_p(0.8, 1.0, Some(11)).unwrap();
        for s in draw(&mut sampler, &logits, 500) {
            assert!(allowed.contains(&s));
        }
    }

    #[test]
    fn test_top_p_tiny_keeps_dominant_token() {
        let logits = array![1.0, 2.0, 10.0];
        let mut sampler = SamplingStrategy::top_p(0.01, 1.0, Some(5)).unwrap();
        assert!(draw(&mut sampler, &logits, 50).iter().all(|&s| s == 2));
    }

    // ============== temperature ==============

    #[test]
    fn test_temperature_monotonicity() {
        let logits = array![1.0, 10.0, 2.0, 3.0];

        let mut cold = SamplingStrategy::temperature(0.01, Some(7)).unwrap();
        let mut hot = SamplingStrategy::temperature(2.0, Some(7)).unwrap();

        let cold_counts = counts(&draw(&mut cold, &logits, 1000), 4);
        let hot_counts = counts(&draw(&mut hot, &logits, 1000), 4);

        assert!(cold_counts[1] >= 990, "cold draws not concentrated: {:?}", cold_counts);
        let distinct = hot_counts.iter().filter(|&&c| c > 0).count();
        assert!(distinct >= 3, "hot draws too concentrated: {:?}", hot_counts);
        assert!(empirical_entropy(&hot_counts) >= empirical_entropy(&cold_counts));
    }


    // ============== select_strategy ==============

    #[test]
    fn test_select_greedy_when_sampling_disabled() {
        let config = GenerationConfig {
            do_sample: false,
            temperature: 1.5,
            ..Default::default()
        };
        assert!(matches!(select_strategy(&config).unwrap(), SamplingStrategy::Greedy));
    }

    #[test]
    fn test_select_greedy_when_temperature_tiny() {
        let config = GenerationConfig {
            temperature: 0.005,
            ..Default::default()
        };
        assert!(matches!(select_strategy(&config).unwrap(), SamplingStrategy::Greedy));
    }

    #[test]
    fn test_select_top_p_takes_precedence() {
        let config = GenerationConfig {
            top_p: 0.9,
            top_k: Some(50),
            ..Default::default()
        };
        assert!(matches!(
            select_strategy(&config).unwrap(),
            SamplingStrategy::TopP { .. }
        ));
    }

    #[test]
    fn test_select_top_k_when_top_p_inactive() {
        let config = GenerationConfig {
            top_p: 1.0,
            top_k: Some(50),
            ..Default::default()
        };
        assert!(matches!(
            select_strategy(&config).unwrap(),
            SamplingStrategy::TopK { k: 50, .. }
        ));
    }

    #[test]
    fn test_select_temperature_fallback() {
        for top_k in [None, Some(0)] {
            let config = GenerationConfig {
                top_p: 1.0,
                top_k,
                temperature: 0.8,
                ..Default::default()
            };
            assert!(matches!(
                select_strategy(&config).unwrap(),
                SamplingStrategy::Temperature { .. }
            ));
        }
    }

    #[test]
    fn test_select_out_of_range_top_p_is_ignored() {
        let config = GenerationConfig {
            top_p: 0.0,
            top_k: None,
            ..Default::default()
        };
        assert!(matches!(
            select_strategy(&config).unwrap(),
            SamplingStrategy::Temperature { .. }
        ));
    }

    #[test]
    fn test_selected_strategy_uses_seed() {
        let config = GenerationConfig {
            seed: Some(123),
            ..Default::default()
        };
        let logits: Array1<f32> = (0..20).map(|i| (i % 5) as f32).collect();
        let mut a = select_strategy(&config).unwrap();
        let mut b = select_strategy(&config).unwrap();
        assert_eq!(draw(&mut a, &logits, 100), draw(&mut b, &logits, 100));
    }
}
