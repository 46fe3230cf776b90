use std::cmp::Ordering;

#[derive(Debug, Clone, Copy)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// argsort returns the indices that would sort an array. The sort is stable, i.e. equal values
/// keep their original order. Incomparable values (NaN) are treated as equal.
pub fn argsort<T: std::cmp::PartialOrd>(x: &[T], order: SortOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..x.len()).collect();
    match order {
        SortOrder::Ascending => {
            indices.sort_by(|&a, &b| x[a].partial_cmp(&x[b]).unwrap_or(Ordering::Equal))
        }
        SortOrder::Descending => {
            indices.sort_by(|&a, &b| x[b].partial_cmp(&x[a]).unwrap_or(Ordering::Equal))
        }
    }
    indices
}

/// reverse_head reverses the first `n` elements of x in place (all elements if x is shorter) and
/// leaves the rest untouched.
pub fn reverse_head<T>(x: &mut [T], n: usize) {
    let n = n.min(x.len());
    x[..n].reverse();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argsort_ascending_puts_infinity_last() {
        let x = [3.0, f64::INFINITY, 1.0, 2.0];
        assert_eq!(argsort(&x, SortOrder::Ascending), vec![2, 3, 0, 1]);
    }

    #[test]
    fn argsort_is_stable_for_ties() {
        let x = [5, 7, 5, 7];
        assert_eq!(argsort(&x, SortOrder::Descending), vec![1, 3, 0, 2]);
    }

    #[test]
    fn reverse_head_handles_short_slices() {
        let mut x = vec![1, 2, 3];
        reverse_head(&mut x, 10);
        assert_eq!(x, vec![3, 2, 1]);

        let mut y = vec![1, 2, 3, 4, 5];
        reverse_head(&mut y, 3);
        assert_eq!(y, vec![3, 2, 1, 4, 5]);
    }
}
