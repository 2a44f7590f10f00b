use std::collections::HashSet;
use std::hash::Hash;

/// Merge a saved ordering with the items currently tracked.
///
/// The result is every id of `saved` that is still in `current`, in saved
/// order, followed by the ids of `current` that `saved` did not mention, in
/// the order `current` lists them. Duplicates in either input keep their
/// first occurrence only.
///
/// # Examples
///
/// ```
/// use anilog::ranking::reconcile_order;
///
/// assert_eq!(reconcile_order(&[3, 1, 2], &[1, 2, 4]), vec![1, 2, 4]);
/// ```
pub fn reconcile_order<T>(saved: &[T], current: &[T]) -> Vec<T>
where
    T: Copy + Eq + Hash,
{
    let current_set: HashSet<T> = current.iter().copied().collect();
    let mut seen: HashSet<T> = HashSet::with_capacity(current_set.len());
    let mut result = Vec::with_capacity(current_set.len());

    for id in saved {
        if current_set.contains(id) && seen.insert(*id) {
            result.push(*id);
        }
    }
    for id in current {
        if seen.insert(*id) {
            result.push(*id);
        }
    }

    result
}

/// Move the element at `from` so it ends up at index `to`.
///
/// Returns `order` unchanged when either index is missing or out of bounds,
/// or when they are equal. The input is never mutated.
///
/// # Examples
///
/// ```
/// use anilog::ranking::move_item;
///
/// assert_eq!(move_item(&[10, 20, 30], Some(0), Some(2)), vec![20, 30, 10]);
/// assert_eq!(move_item(&[10, 20, 30], Some(1), Some(1)), vec![10, 20, 30]);
/// ```
pub fn move_item<T: Clone>(order: &[T], from: Option<usize>, to: Option<usize>) -> Vec<T> {
    let mut next = order.to_vec();
    let (Some(from), Some(to)) = (from, to) else {
        return next;
    };
    if from == to || from >= order.len() || to >= order.len() {
        return next;
    }

    let moved = next.remove(from);
    next.insert(to, moved);
    next
}
