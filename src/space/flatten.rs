//! 1-D flattened coverage intervals, and a generic greedy union/merge pass
//! used both to fold adjacent `FlattenSegment`s and to fold adjacent
//! `AlignedSpace`s along one dimension.
//!
//! The original's `simplify(*args)` forwarded a duck-typed variadic to
//! `Mergeable.can_merge`/`get_start_index`/`merge`; the REDESIGN FLAGS call
//! for two concrete, type-safe merge contexts instead of `*args`. `OneDim`
//! is what `FlattenSegment` uses; `MultiDim { target_dim }` is what
//! `AlignedSpace` uses.

use std::collections::HashSet;

/// The context a `Mergeable` needs to locate itself and decide adjacency.
/// `FlattenSegment` ignores it (always `OneDim`); `AlignedSpace` reads
/// `target_dim` out of `MultiDim`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeContext {
    OneDim,
    MultiDim { target_dim: usize },
}

impl MergeContext {
    pub fn target_dim(&self) -> usize {
        match self {
            MergeContext::OneDim => 0,
            MergeContext::MultiDim { target_dim } => *target_dim,
        }
    }
}

/// The narrow contract `simplify` needs: locate a start index, decide if
/// two items can merge, and fold them into one.
pub trait Mergeable: Sized + Clone {
    fn start_index(&self, ctx: MergeContext) -> i64;
    fn can_merge(&self, other: &Self, ctx: MergeContext) -> bool;
    fn merge(&self, other: &Self, ctx: MergeContext) -> Self;
}

/// A 1-D `[start, start+size)` interval in the row-major flattening of an
/// ambient grid. `size = None` means unbounded (the tail of an infinite
/// axis-0 space).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlattenSegment {
    pub start: i64,
    pub size: Option<i64>,
}

impl FlattenSegment {
    pub fn new(start: i64, size: Option<i64>) -> Self {
        Self { start, size }
    }

    /// `start + size`; panics if called on an unbounded segment — callers
    /// only call this once `size` is known finite (see `find_least_division`).
    pub fn next_start_index(&self) -> i64 {
        self.start
            + self
                .size
                .expect("next_start_index on an unbounded FlattenSegment")
    }
}

impl Mergeable for FlattenSegment {
    fn start_index(&self, _ctx: MergeContext) -> i64 {
        self.start
    }

    fn can_merge(&self, other: &Self, _ctx: MergeContext) -> bool {
        let (smaller, larger) = if self.start <= other.start {
            (self, other)
        } else {
            (other, self)
        };
        match smaller.size {
            None => false,
            Some(size) => smaller.start + size >= larger.start,
        }
    }

    /// `end = max(end(self), end(other))`, infinite if either end is
    /// infinite; `size = end - start`. (The original's arithmetic here
    /// read `smaller.size + larger.start`, almost certainly a typo for
    /// `larger.size`; this is the corrected form per the design notes.)
    fn merge(&self, other: &Self, _ctx: MergeContext) -> Self {
        let (smaller, larger) = if self.start <= other.start {
            (self, other)
        } else {
            (other, self)
        };
        let start = smaller.start;
        let end = match (smaller.size, larger.size) {
            (Some(s), Some(l)) => Some((smaller.start + s).max(larger.start + l)),
            _ => None,
        };
        let size = end.map(|e| e - start);
        Self { start, size }
    }
}

/// Pairwise `can_merge`, union into connected components, fold each
/// component left-to-right after sorting by start index, and return all
/// results (merged and untouched) sorted by start index.
pub fn simplify<T: Mergeable>(items: &[T], ctx: MergeContext) -> Vec<T> {
    let n = items.len();
    let mut mergeable_to: Vec<HashSet<usize>> = vec![HashSet::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            if items[i].can_merge(&items[j], ctx) {
                mergeable_to[i].insert(j);
            }
        }
    }

    let mut groups: Vec<HashSet<usize>> = Vec::new();
    for i in 0..n {
        if mergeable_to[i].is_empty() {
            continue;
        }
        let mut grouplet: HashSet<usize> = mergeable_to[i].clone();
        grouplet.insert(i);
        if let Some(existing) = groups.iter_mut().find(|g| !g.is_disjoint(&grouplet)) {
            existing.extend(grouplet);
        } else {
            groups.push(grouplet);
        }
    }

    let grouped: HashSet<usize> = groups.iter().flatten().copied().collect();
    let mut result: Vec<T> = (0..n)
        .filter(|i| !grouped.contains(i))
        .map(|i| items[i].clone())
        .collect();

    for group in groups {
        let mut members: Vec<&T> = group.iter().map(|&i| &items[i]).collect();
        members.sort_by_key(|item| item.start_index(ctx));
        let mut merged = members[0].clone();
        for member in &members[1..] {
            merged = merged.merge(member, ctx);
        }
        result.push(merged);
    }

    result.sort_by_key(|item| item.start_index(ctx));
    result
}

/// Buckets each aligned space by its `lower_not_universal_dim()` into keys
/// `-1..dim-1` (`-1` meaning fully universal). Used after `simplify` lifts a
/// once-partial region to full coverage at `target_dim`: it may now belong
/// in a shallower bucket.
pub fn remap_space<T>(
    spaces: Vec<T>,
    dim: usize,
    lower_not_universal_dim: impl Fn(&T) -> i64,
) -> std::collections::HashMap<i64, Vec<T>> {
    let mut buckets: std::collections::HashMap<i64, Vec<T>> =
        (-1..dim as i64).map(|d| (d, Vec::new())).collect();
    for space in spaces {
        let key = lower_not_universal_dim(&space);
        buckets.entry(key).or_default().push(space);
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_touching_segments() {
        let a = FlattenSegment::new(0, Some(10));
        let b = FlattenSegment::new(10, Some(5));
        assert!(a.can_merge(&b, MergeContext::OneDim));
        let merged = a.merge(&b, MergeContext::OneDim);
        assert_eq!(merged, FlattenSegment::new(0, Some(15)));
    }

    #[test]
    fn merge_overlap() {
        let a = FlattenSegment::new(0, Some(10));
        let b = FlattenSegment::new(5, Some(10));
        let merged = a.merge(&b, MergeContext::OneDim);
        assert_eq!(merged, FlattenSegment::new(0, Some(15)));
    }

    #[test]
    fn no_merge_on_gap() {
        let a = FlattenSegment::new(0, Some(10));
        let b = FlattenSegment::new(50, Some(10));
        assert!(!a.can_merge(&b, MergeContext::OneDim));
    }

    #[test]
    fn infinite_segment_cannot_be_the_smaller() {
        let a = FlattenSegment::new(0, None);
        let b = FlattenSegment::new(5, Some(10));
        assert!(!a.can_merge(&b, MergeContext::OneDim));
        let merged = a.merge(&b, MergeContext::OneDim);
        assert_eq!(merged, FlattenSegment::new(0, None));
    }

    #[test]
    fn simplify_idempotent() {
        let items = vec![
            FlattenSegment::new(0, Some(10)),
            FlattenSegment::new(50, Some(10)),
            FlattenSegment::new(10, Some(10)),
        ];
        let once = simplify(&items, MergeContext::OneDim);
        let twice = simplify(&once, MergeContext::OneDim);
        assert_eq!(once, twice);
        assert_eq!(once, vec![FlattenSegment::new(0, Some(20)), FlattenSegment::new(50, Some(10))]);
    }

    #[test]
    fn simplify_standalone_items_survive() {
        let items = vec![FlattenSegment::new(0, Some(1)), FlattenSegment::new(100, Some(1))];
        let result = simplify(&items, MergeContext::OneDim);
        assert_eq!(result.len(), 2);
    }
}
