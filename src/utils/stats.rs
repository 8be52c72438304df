//! Descriptive statistics over observed values

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median; the average of the two middle values for even lengths
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Population variance (divides by n)
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Sample variance (divides by n - 1), `None` for fewer than two values
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    Some(values.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64)
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> Option<f64> {
    population_variance(values).map(f64::sqrt)
}

/// Frequency table of `items`, keeping first-seen order of distinct keys
pub fn frequencies<K: Eq + Hash + Clone>(items: impl IntoIterator<Item = K>) -> Vec<(K, usize)> {
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, usize)> = Vec::new();
    for item in items {
        match index.get(&item) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                index.insert(item.clone(), counts.len());
                counts.push((item, 1));
            }
        }
    }
    counts
}

/// Mode outcome over a frequency table
#[derive(Debug, Clone, PartialEq)]
pub enum Mode<K> {
    /// No values were observed
    Empty,
    /// A single most frequent value
    Unique(K),
    /// Several values share the highest count; first-seen order
    Tied(Vec<K>),
}

/// Most frequent value of `items`
pub fn mode<K: Eq + Hash + Clone>(items: impl IntoIterator<Item = K>) -> Mode<K> {
    let counts = frequencies(items);
    let Some(best) = counts.iter().map(|(_, c)| *c).max() else {
        return Mode::Empty;
    };
    let mut winners: Vec<K> = counts
        .into_iter()
        .filter(|(_, c)| *c == best)
        .map(|(k, _)| k)
        .collect();
    if winners.len() == 1 {
        Mode::Unique(winners.remove(0))
    } else {
        Mode::Tied(winners)
    }
}

impl<K> Mode<K> {
    /// The unique mode, or the first-seen of the tied values
    pub fn first(self) -> Option<K> {
        match self {
            Mode::Empty => None,
            Mode::Unique(k) => Some(k),
            Mode::Tied(ks) => ks.into_iter().next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_median() {
        assert_eq!(mean(&[1.0, 2.0, 4.0, 5.0]), Some(3.0));
        assert_eq!(median(&[5.0, 1.0, 4.0, 2.0]), Some(3.0));
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_variances() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((std_dev(&v).unwrap() - 2.0).abs() < 1e-12);
        assert!((sample_variance(&v).unwrap() - 32.0 / 7.0).abs() < 1e-12);
        assert_eq!(sample_variance(&[1.0]), None);
    }

    #[test]
    fn test_mode_variants() {
        assert_eq!(mode(vec!["a", "b", "a"]), Mode::Unique("a"));
        assert_eq!(mode(vec!["b", "a", "a", "b"]), Mode::Tied(vec!["b", "a"]));
        assert_eq!(mode(Vec::<&str>::new()), Mode::Empty);
        assert_eq!(mode(vec![1, 2]).first(), Some(1));
    }
}
