//! Fixed-size grouping of iterators

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("batch size must be at least 1, got {0}")]
    InvalidSize(usize),
}

/// Iterator adapter yielding `Vec`s of at most `size` items.
#[derive(Debug, Clone)]
pub struct Batched<I> {
    inner: I,
    size: usize,
}

/// Split `iter` into groups of `size`; only the last group may be shorter.
///
/// # Errors
///
/// Returns [`BatchError::InvalidSize`] if `size` is zero.
///
/// # Example
///
/// ```
/// use crucible_common::utils::batch::batched;
///
/// let groups: Vec<Vec<u32>> = batched(1..=5, 2).unwrap().collect();
/// assert_eq!(groups, vec![vec![1, 2], vec![3, 4], vec![5]]);
/// ```
pub fn batched<I>(iter: I, size: usize) -> Result<Batched<I::IntoIter>, BatchError>
where
    I: IntoIterator,
{
    if size < 1 {
        return Err(BatchError::InvalidSize(size));
    }
    Ok(Batched { inner: iter.into_iter(), size })
}

impl<I: Iterator> Iterator for Batched<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch: Vec<I::Item> = self.inner.by_ref().take(self.size).collect();
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lower, upper) = self.inner.size_hint();
        (lower.div_ceil(self.size), upper.map(|u| u.div_ceil(self.size)))
    }
}
