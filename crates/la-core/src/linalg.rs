//! Dense linear-algebra kernels over `Matrix`.
//!
//! Determinants use LU decomposition with partial pivoting (Doolittle form,
//! each row swap flips the sign). Inverses use Gauss-Jordan elimination on
//! `[A | I]`, again with partial pivoting. Both are deterministic and O(n³).
//! Callers are responsible for shape checks; these functions assume them.

use crate::constants::SINGULAR_EPSILON;
use crate::value::Matrix;

pub fn transpose(m: &Matrix) -> Matrix {
    let (rows, cols) = (m.rows(), m.cols());
    let mut data = Vec::with_capacity(rows * cols);
    for c in 0..cols {
        for r in 0..rows {
            data.push(m.get(r, c));
        }
    }
    Matrix::from_parts(cols, rows, data)
}

/// `a.cols()` must equal `b.rows()`.
pub fn matmul(a: &Matrix, b: &Matrix) -> Matrix {
    let (n, inner, p) = (a.rows(), a.cols(), b.cols());
    let mut data = vec![0.0; n * p];
    for i in 0..n {
        for k in 0..inner {
            let aik = a.get(i, k);
            for j in 0..p {
                data[i * p + j] += aik * b.get(k, j);
            }
        }
    }
    Matrix::from_parts(n, p, data)
}

/// Matrix times column vector.
pub fn mat_vec(m: &Matrix, v: &[f64]) -> Vec<f64> {
    (0..m.rows())
        .map(|r| m.row(r).iter().zip(v).map(|(a, b)| a * b).sum())
        .collect()
}

/// Row vector times matrix.
pub fn vec_mat(v: &[f64], m: &Matrix) -> Vec<f64> {
    (0..m.cols())
        .map(|c| v.iter().enumerate().map(|(r, x)| x * m.get(r, c)).sum())
        .collect()
}

/// Sum of the diagonal of a square matrix.
pub fn trace(m: &Matrix) -> f64 {
    (0..m.rows()).map(|i| m.get(i, i)).sum()
}

/// Row index of the largest absolute entry in `col`, at or below `from`.
fn pivot_row(a: &[f64], n: usize, width: usize, col: usize, from: usize) -> usize {
    let mut best = from;
    for r in (from + 1)..n {
        if a[r * width + col].abs() > a[best * width + col].abs() {
            best = r;
        }
    }
    best
}

fn swap_rows(a: &mut [f64], width: usize, r1: usize, r2: usize) {
    if r1 == r2 {
        return;
    }
    for c in 0..width {
        a.swap(r1 * width + c, r2 * width + c);
    }
}

/// Determinant of a square matrix. The 0x0 determinant is 1.
pub fn det(m: &Matrix) -> f64 {
    let n = m.rows();
    let mut a = m.data().to_vec();
    let mut det = 1.0;

    for col in 0..n {
        let p = pivot_row(&a, n, n, col, col);
        if a[p * n + col] == 0.0 {
            return 0.0;
        }
        if p != col {
            swap_rows(&mut a, n, p, col);
            det = -det;
        }
        let pivot = a[col * n + col];
        det *= pivot;
        for r in (col + 1)..n {
            let factor = a[r * n + col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for c in col..n {
                a[r * n + c] -= factor * a[col * n + c];
            }
        }
    }

    det
}

/// Inverse of a square matrix, or `None` when `|det| < SINGULAR_EPSILON`.
pub fn inverse(m: &Matrix) -> Option<Matrix> {
    let n = m.rows();
    if det(m).abs() < SINGULAR_EPSILON {
        return None;
    }

    // Augmented [A | I], width 2n.
    let width = 2 * n;
    let mut a = vec![0.0; n * width];
    for r in 0..n {
        a[r * width..r * width + n].copy_from_slice(m.row(r));
        a[r * width + n + r] = 1.0;
    }

    for col in 0..n {
        let p = pivot_row(&a, n, width, col, col);
        swap_rows(&mut a, width, p, col);
        let pivot = a[col * width + col];
        // Singularity was settled by the determinant; only an exact zero
        // pivot is unusable.
        if pivot == 0.0 {
            return None;
        }
        for c in 0..width {
            a[col * width + c] /= pivot;
        }
        for r in 0..n {
            if r == col {
                continue;
            }
            let factor = a[r * width + col];
            if factor == 0.0 {
                continue;
            }
            for c in 0..width {
                a[r * width + c] -= factor * a[col * width + c];
            }
        }
    }

    let mut data = Vec::with_capacity(n * n);
    for r in 0..n {
        data.extend_from_slice(&a[r * width + n..(r + 1) * width]);
    }
    Some(Matrix::from_parts(n, n, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mat(rows: usize, cols: usize, data: &[f64]) -> Matrix {
        Matrix::new(rows, cols, data.to_vec()).unwrap()
    }

    #[test]
    fn test_det_2x2() {
        assert_relative_eq!(det(&mat(2, 2, &[1.0, 2.0, 3.0, 4.0])), -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_det_needs_pivot() {
        // Zero in the leading position forces a row swap.
        let m = mat(3, 3, &[0.0, 1.0, 2.0, 1.0, 0.0, 3.0, 4.0, -3.0, 8.0]);
        assert_relative_eq!(det(&m), -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_det_singular_and_empty() {
        assert_eq!(det(&mat(2, 2, &[1.0, 2.0, 2.0, 4.0])), 0.0);
        assert_eq!(det(&mat(0, 0, &[])), 1.0);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let m = mat(3, 3, &[2.0, 0.0, 1.0, 1.0, 3.0, 2.0, 1.0, 1.0, 1.0]);
        let inv = inverse(&m).unwrap();
        let product = matmul(&m, &inv);
        let identity = Matrix::identity(3);
        for (a, b) in product.data().iter().zip(identity.data()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_inverse_singular() {
        assert!(inverse(&mat(2, 2, &[1.0, 2.0, 2.0, 4.0])).is_none());
    }

    #[test]
    fn test_inverse_badly_scaled() {
        // det = 1, but the second pivot is far below machine epsilon.
        let inv = inverse(&mat(2, 2, &[1e20, 0.0, 0.0, 1e-20])).unwrap();
        for (a, b) in inv.data().iter().zip(&[1e-20, 0.0, 0.0, 1e20]) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_matmul_and_transpose() {
        let a = mat(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = transpose(&a);
        assert_eq!(b.rows(), 3);
        assert_eq!(b.cols(), 2);
        let p = matmul(&a, &b);
        assert_eq!(p.data(), &[14.0, 32.0, 32.0, 77.0]);
    }

    #[test]
    fn test_trace() {
        assert_eq!(trace(&mat(2, 2, &[1.0, 9.0, 9.0, 4.0])), 5.0);
    }
}
