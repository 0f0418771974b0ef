use std::hash::Hash;

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Occurrence counts in first-encounter order.
pub fn count_in_order<T>(items: &[T]) -> IndexMap<T, usize>
where
    T: Copy + Eq + Hash,
{
    let mut counts: IndexMap<T, usize> = IndexMap::new();
    for &item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    counts
}

/// The `k` most frequent values of `predicted`, most frequent first.
///
/// Counting walks `predicted` front to back and the sort is stable, so
/// values with equal counts keep the order in which they first appear.
/// Fails with [`Error::InsufficientClasses`] if fewer than `k` distinct
/// values were predicted.
pub fn aggregate<T>(predicted: &[T], k: usize) -> Result<Vec<T>>
where
    T: Copy + Eq + Hash,
{
    let counts = count_in_order(predicted);
    if k > counts.len() {
        return Err(Error::InsufficientClasses { requested: k, available: counts.len() });
    }
    let mut ranked: Vec<(T, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(ranked.into_iter().take(k).map(|(value, _)| value).collect())
}
