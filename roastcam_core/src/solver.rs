//! Dense linear solve for the small normal-equation systems of the fitter.

/// Pivots smaller than this in magnitude mark the system as singular.
pub const PIVOT_EPSILON: f64 = 1e-12;

/// Solve `a · x = b` by Gaussian elimination with partial pivoting.
///
/// `a` must be square with `b.len()` rows. Returns None when a pivot falls
/// below [`PIVOT_EPSILON`] or the shapes disagree.
pub fn solve(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }
    // Augmented matrix [A | b]
    let mut m: Vec<Vec<f64>> = a
        .iter()
        .zip(b)
        .map(|(row, &rhs)| {
            let mut r = row.clone();
            r.push(rhs);
            r
        })
        .collect();

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))?;
        let p = m[pivot][col].abs();
        if p.is_nan() || p < PIVOT_EPSILON {
            return None;
        }
        m.swap(col, pivot);
        for row in col + 1..n {
            let (upper, lower) = m.split_at_mut(row);
            let pivot_row = &upper[col];
            let target = &mut lower[0];
            let factor = target[col] / pivot_row[col];
            if factor == 0.0 {
                continue;
            }
            for (t, p) in target[col..].iter_mut().zip(&pivot_row[col..]) {
                *t -= factor * p;
            }
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| m[row][k] * x[k]).sum();
        x[row] = (m[row][n] - tail) / m[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}
