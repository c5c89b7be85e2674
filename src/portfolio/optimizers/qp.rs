//! # Simplex QP
//!
//! $$
//! \min_{\mathbf y}\ \tfrac12(\mathbf y-\mathbf x)^\top B(\mathbf y-\mathbf x)
//! + \mathbf g^\top(\mathbf y-\mathbf x)
//! \quad\text{s.t.}\quad \mathbf 1^\top\mathbf y = 1,\ \mathbf y \ge 0
//! $$
//!
//! Primal active-set method for the SQP subproblem. `B` must be symmetric
//! positive definite and the starting point `x` feasible.

use nalgebra::DMatrix;
use nalgebra::DVector;

const STEP_TOLERANCE: f64 = 1e-12;
const MULTIPLIER_TOLERANCE: f64 = 1e-12;

#[derive(Clone, Debug)]
pub(crate) struct QpSolution {
  /// Minimizer on the simplex.
  pub y: DVector<f64>,
  pub iterations: usize,
  /// False when the iteration cap was hit before the KKT conditions held.
  pub optimal: bool,
}

/// Active-set iteration budget for an `n`-asset subproblem.
pub(crate) fn default_max_iters(n: usize) -> usize {
  10 * n + 10
}

/// Solve the subproblem starting from the feasible point `x`, taking at most
/// `max_iters` active-set steps. A capped solve returns the last feasible
/// iterate with `optimal == false`.
pub(crate) fn solve_simplex_qp(
  b: &DMatrix<f64>,
  g: &DVector<f64>,
  x: &DVector<f64>,
  max_iters: usize,
) -> Result<QpSolution, String> {
  let n = x.len();
  if b.nrows() != n || b.ncols() != n || g.len() != n {
    return Err(format!(
      "qp dimension mismatch: B is {}x{}, g has {}, x has {n}",
      b.nrows(),
      b.ncols(),
      g.len()
    ));
  }

  let mut y = x.clone();
  let mut active: Vec<bool> = y.iter().map(|&v| v <= 0.0).collect();
  if active.iter().all(|&a| a) {
    return Err("qp start point has no positive component".to_string());
  }

  for iter in 0..max_iters {
    let grad = b * (&y - x) + g;
    let free: Vec<usize> = (0..n).filter(|&i| !active[i]).collect();
    let (p, lambda) = equality_step(b, &grad, &free)?;

    if p.amax() <= STEP_TOLERANCE {
      // Bound multipliers mu_i = grad_i + lambda must be non-negative.
      let scale = 1.0 + grad.amax();
      let release = (0..n)
        .filter(|&i| active[i])
        .map(|i| (i, grad[i] + lambda))
        .filter(|(_, mu)| *mu < -MULTIPLIER_TOLERANCE * scale)
        .min_by(|l, r| l.1.total_cmp(&r.1));

      match release {
        Some((i, _)) => active[i] = false,
        None => {
          return Ok(QpSolution {
            y,
            iterations: iter + 1,
            optimal: true,
          })
        }
      }
      continue;
    }

    let mut alpha = 1.0;
    let mut blocking = None;
    for (k, &i) in free.iter().enumerate() {
      if p[k] < 0.0 {
        let ratio = (-y[i] / p[k]).max(0.0);
        if ratio < alpha {
          alpha = ratio;
          blocking = Some(i);
        }
      }
    }

    for (k, &i) in free.iter().enumerate() {
      y[i] += alpha * p[k];
    }
    if let Some(i) = blocking {
      y[i] = 0.0;
      active[i] = true;
    }
  }

  Ok(QpSolution {
    y,
    iterations: max_iters,
    optimal: false,
  })
}

/// Step on the free components keeping `sum(p) = 0`:
/// `[B_FF 1; 1^T 0] [p; lambda] = [-grad_F; 0]`.
fn equality_step(
  b: &DMatrix<f64>,
  grad: &DVector<f64>,
  free: &[usize],
) -> Result<(DVector<f64>, f64), String> {
  let m = free.len();
  let mut kkt = DMatrix::<f64>::zeros(m + 1, m + 1);
  let mut rhs = DVector::<f64>::zeros(m + 1);

  for (r, &i) in free.iter().enumerate() {
    for (c, &j) in free.iter().enumerate() {
      kkt[(r, c)] = b[(i, j)];
    }
    kkt[(r, m)] = 1.0;
    kkt[(m, r)] = 1.0;
    rhs[r] = -grad[i];
  }

  let sol = kkt
    .lu()
    .solve(&rhs)
    .ok_or_else(|| "singular KKT system in qp subproblem".to_string())?;

  if sol.iter().any(|v| !v.is_finite()) {
    return Err("non-finite KKT solution in qp subproblem".to_string());
  }

  Ok((sol.rows(0, m).into_owned(), sol[m]))
}
