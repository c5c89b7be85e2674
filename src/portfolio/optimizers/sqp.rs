//! # Simplex SQP
//!
//! $$
//! \mathbf x_{k+1} = \mathbf x_k + \alpha_k \mathbf d_k,\qquad
//! \mathbf d_k = \arg\min_{\mathbf 1^\top(\mathbf x_k+\mathbf d)=1,\ \mathbf x_k+\mathbf d\ge0}
//! \tfrac12\mathbf d^\top B_k\mathbf d + \nabla f_k^\top\mathbf d
//! $$
//!
//! Sequential quadratic programming on the unit simplex with a damped BFGS
//! Hessian approximation and an Armijo backtracking line search.

use nalgebra::DMatrix;
use nalgebra::DVector;
use tracing::trace;
use tracing::warn;

use crate::portfolio::types::SolverStatus;
use super::qp::default_max_iters;
use super::qp::solve_simplex_qp;

const ARMIJO_C: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 20;
const POWELL_DAMPING: f64 = 0.2;

#[derive(Clone, Copy, Debug)]
pub(crate) struct SqpOptions {
  pub max_iters: usize,
  pub ftol: f64,
  pub xtol: f64,
  pub fd_step: f64,
  /// Active-set budget per QP subproblem, `None` for `10n + 10`.
  pub qp_max_iters: Option<usize>,
}

#[derive(Clone, Debug)]
pub(crate) struct SqpOutcome {
  pub x: Vec<f64>,
  pub fx: f64,
  pub iterations: usize,
  pub evaluations: usize,
  /// Subproblems that hit their iteration cap before optimality.
  pub qp_capped: usize,
  pub status: SolverStatus,
}

/// Objective wrapper counting every evaluation.
struct Counted<F> {
  f: F,
  count: usize,
}

impl<F: FnMut(&[f64]) -> f64> Counted<F> {
  fn call(&mut self, x: &DVector<f64>) -> f64 {
    self.count += 1;
    (self.f)(x.as_slice())
  }

  /// Central differences. A partial whose probes are not both finite is 0.
  fn gradient(&mut self, x: &DVector<f64>, h: f64) -> DVector<f64> {
    let mut g = DVector::<f64>::zeros(x.len());
    let mut probe = x.clone();
    for i in 0..x.len() {
      probe[i] = x[i] + h;
      let up = self.call(&probe);
      probe[i] = x[i] - h;
      let down = self.call(&probe);
      probe[i] = x[i];

      let d = (up - down) / (2.0 * h);
      g[i] = if d.is_finite() { d } else { 0.0 };
    }
    g
  }
}

/// Minimize `f` over `{x >= 0, sum(x) = 1}` from the feasible point `x0`.
pub(crate) fn minimize_on_simplex<F>(f: F, x0: Vec<f64>, opts: SqpOptions) -> SqpOutcome
where
  F: FnMut(&[f64]) -> f64,
{
  let n = x0.len();
  let mut obj = Counted { f, count: 0 };
  let mut x = DVector::from_vec(x0);
  let mut fx = obj.call(&x);

  // The simplex of one asset is a single point.
  if n <= 1 {
    return SqpOutcome {
      x: x.as_slice().to_vec(),
      fx,
      iterations: 0,
      evaluations: obj.count,
      qp_capped: 0,
      status: finite_or(fx, SolverStatus::Converged),
    };
  }

  let mut g = obj.gradient(&x, opts.fd_step);
  let mut b = DMatrix::<f64>::identity(n, n);
  let mut status = SolverStatus::MaxIterations;
  let mut iterations = 0;
  let mut qp_capped = 0;
  let qp_max_iters = opts.qp_max_iters.unwrap_or_else(|| default_max_iters(n));

  for k in 0..opts.max_iters {
    iterations = k + 1;

    let qp = match solve_simplex_qp(&b, &g, &x, qp_max_iters) {
      Ok(qp) => qp,
      Err(e) => {
        status = SolverStatus::Failed(e);
        break;
      }
    };
    if !qp.optimal {
      qp_capped += 1;
      trace!(iter = iterations, qp_max_iters, "qp subproblem stopped at its cap");
    }

    let d = &qp.y - &x;
    if d.amax() < opts.xtol {
      status = SolverStatus::Converged;
      break;
    }

    let slope = g.dot(&d);
    let mut alpha = 1.0;
    let mut accepted = None;
    for _ in 0..MAX_BACKTRACKS {
      let trial = &x + &d * alpha;
      let ft = obj.call(&trial);
      let sufficient = !fx.is_finite() || ft <= fx + ARMIJO_C * alpha * slope;
      if ft.is_finite() && sufficient {
        accepted = Some((trial, ft));
        break;
      }
      alpha *= 0.5;
    }

    let Some((x_new, f_new)) = accepted else {
      status = SolverStatus::LineSearchFailed;
      break;
    };

    let g_new = obj.gradient(&x_new, opts.fd_step);
    let s = &x_new - &x;
    let y = &g_new - &g;
    damped_bfgs_update(&mut b, &s, &y);

    let delta_f = (f_new - fx).abs();
    let prev_finite = fx.is_finite();
    x = x_new;
    fx = f_new;
    g = g_new;

    trace!(
      iter = iterations,
      objective = fx,
      step = s.amax(),
      alpha,
      qp_iters = qp.iterations,
      "sqp iteration"
    );

    if (prev_finite && delta_f < opts.ftol) || s.amax() < opts.xtol {
      status = SolverStatus::Converged;
      break;
    }
  }

  if qp_capped > 0 {
    warn!(qp_capped, qp_max_iters, "sqp continued from capped qp subproblems");
  }

  SqpOutcome {
    x: x.as_slice().to_vec(),
    fx,
    iterations,
    evaluations: obj.count,
    qp_capped,
    status: finite_or(fx, status),
  }
}

fn finite_or(fx: f64, status: SolverStatus) -> SolverStatus {
  if fx.is_finite() {
    status
  } else {
    SolverStatus::NonFiniteObjective
  }
}

/// Powell-damped BFGS update, keeping `b` positive definite.
fn damped_bfgs_update(b: &mut DMatrix<f64>, s: &DVector<f64>, y: &DVector<f64>) {
  let bs = &*b * s;
  let sbs = s.dot(&bs);
  let sy = s.dot(y);
  if !(sbs.is_finite() && sbs > 0.0 && sy.is_finite()) {
    return;
  }

  let r = if sy < POWELL_DAMPING * sbs {
    let theta = (1.0 - POWELL_DAMPING) * sbs / (sbs - sy);
    y * theta + &bs * (1.0 - theta)
  } else {
    y.clone()
  };

  let sr = s.dot(&r);
  if !(sr.is_finite() && sr > 0.0) {
    return;
  }

  let update = &r * r.transpose() / sr - &bs * bs.transpose() / sbs;
  if update.iter().all(|v| v.is_finite()) {
    *b += update;
  }
}
