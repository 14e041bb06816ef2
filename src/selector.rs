use rand::Rng;
use std::collections::HashMap;

/// Weighted random choice over `candidates` using the live weight map.
///
/// `w_i = max(0, weights[candidate])`, defaulting to 0 when absent. Samples
/// with probability `w_i / sum(w)` when the sum is positive; falls back to
/// a uniform draw over `candidates` otherwise. Uses prefix-sum + binary
/// search, same technique as a weighted load balancer, but computed fresh
/// per call since the candidate set shrinks on every dispatch retry.
///
/// Panics if `candidates` is empty — callers must check non-emptiness first.
pub fn choose<'a>(candidates: &'a [String], weights: &HashMap<String, f64>) -> &'a str {
    assert!(!candidates.is_empty(), "choose requires a non-empty candidate set");

    let mut prefix_sum = Vec::with_capacity(candidates.len());
    let mut sum = 0.0_f64;
    for c in candidates {
        let w = weights.get(c).copied().unwrap_or(0.0).max(0.0);
        sum += w;
        prefix_sum.push(sum);
    }

    if sum <= 0.0 {
        let idx = rand::thread_rng().gen_range(0..candidates.len());
        return &candidates[idx];
    }

    let target = rand::thread_rng().gen_range(0.0..sum);
    let idx = prefix_sum.partition_point(|&s| s <= target);
    &candidates[idx.min(candidates.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn weighted_distribution_matches_ratio() {
        let c = candidates(&["A", "B"]);
        let w: HashMap<String, f64> = [("A".to_string(), 1.0), ("B".to_string(), 3.0)]
            .into_iter()
            .collect();

        let mut counts: HashMap<&str, u32> = HashMap::new();
        for _ in 0..10_000 {
            let pick = choose(&c, &w);
            *counts.entry(pick).or_insert(0) += 1;
        }

        let b = *counts.get("B").unwrap_or(&0) as f64;
        let share = b / 10_000.0;
        assert!((0.73..=0.77).contains(&share), "B share: {share}");
    }

    #[test]
    fn zero_weights_are_uniform() {
        let c = candidates(&["A", "B"]);
        let w: HashMap<String, f64> = [("A".to_string(), 0.0), ("B".to_string(), 0.0)]
            .into_iter()
            .collect();

        let mut counts: HashMap<&str, u32> = HashMap::new();
        for _ in 0..10_000 {
            *counts.entry(choose(&c, &w)).or_insert(0) += 1;
        }
        let a = *counts.get("A").unwrap_or(&0) as f64 / 10_000.0;
        assert!((0.45..=0.55).contains(&a), "A share: {a}");
    }

    #[test]
    fn absent_candidate_defaults_to_zero_weight() {
        let c = candidates(&["A", "B"]);
        let w: HashMap<String, f64> = [("A".to_string(), 5.0)].into_iter().collect();
        for _ in 0..1000 {
            assert_eq!(choose(&c, &w), "A");
        }
    }

    #[test]
    fn single_candidate_always_chosen() {
        let c = candidates(&["only"]);
        let w = HashMap::new();
        assert_eq!(choose(&c, &w), "only");
    }

    #[test]
    fn negative_weight_treated_as_zero() {
        let c = candidates(&["A", "B"]);
        let w: HashMap<String, f64> = [("A".to_string(), -5.0), ("B".to_string(), 2.0)]
            .into_iter()
            .collect();
        for _ in 0..1000 {
            assert_eq!(choose(&c, &w), "B");
        }
    }
}
