//! # Quadratic Programs
//!
//! $$
//! \min_x \tfrac12 x^\top P x + q^\top x
//! \quad\text{s.t.}\quad A_{eq}x = b_{eq},\; A_{in}x \le b_{in}
//! $$
//!
//! Dense QP front-end for the Clarabel interior-point solver.

use clarabel::algebra::CscMatrix;
use clarabel::solver::DefaultSettingsBuilder;
use clarabel::solver::DefaultSolver;
use clarabel::solver::IPSolver;
use clarabel::solver::SolverStatus;
use clarabel::solver::SupportedConeT;
use nalgebra::DMatrix;
use nalgebra::DVector;
use tracing::debug;

use crate::error::FrontierError;
use crate::error::Result;

/// Interior-point solver settings.
#[derive(Clone, Debug)]
pub struct SolverSettings {
  /// Maximum interior-point iterations.
  pub max_iter: u32,
  /// Absolute duality gap tolerance.
  pub tol_gap_abs: f64,
  /// Relative duality gap tolerance.
  pub tol_gap_rel: f64,
  /// Primal/dual feasibility tolerance.
  pub tol_feas: f64,
  /// Print solver progress.
  pub verbose: bool,
}

impl Default for SolverSettings {
  fn default() -> Self {
    Self {
      max_iter: 200,
      tol_gap_abs: 1e-9,
      tol_gap_rel: 1e-9,
      tol_feas: 1e-9,
      verbose: false,
    }
  }
}

/// Dense convex QP. `p` must be symmetric positive semidefinite.
#[derive(Clone, Debug)]
pub(crate) struct QuadraticProgram {
  pub p: DMatrix<f64>,
  pub q: DVector<f64>,
  pub a_eq: DMatrix<f64>,
  pub b_eq: DVector<f64>,
  pub a_in: DMatrix<f64>,
  pub b_in: DVector<f64>,
}

impl QuadraticProgram {
  /// Objective `½ x' P x` with no linear term and no constraints yet.
  pub fn quadratic(p: DMatrix<f64>) -> Self {
    let n = p.ncols();
    Self {
      p,
      q: DVector::zeros(n),
      a_eq: DMatrix::zeros(0, n),
      b_eq: DVector::zeros(0),
      a_in: DMatrix::zeros(0, n),
      b_in: DVector::zeros(0),
    }
  }

  /// Append the row constraint `a' x = b`.
  pub fn equal(mut self, a: &[f64], b: f64) -> Self {
    let (a_eq, b_eq) = push_row(&self.a_eq, &self.b_eq, a, b);
    self.a_eq = a_eq;
    self.b_eq = b_eq;
    self
  }

  /// Append the row constraint `a' x <= b`.
  pub fn at_most(mut self, a: &[f64], b: f64) -> Self {
    let (a_in, b_in) = push_row(&self.a_in, &self.b_in, a, b);
    self.a_in = a_in;
    self.b_in = b_in;
    self
  }

  /// Append `x >= 0`.
  pub fn non_negative(self) -> Self {
    let n = self.p.ncols();
    (0..n).fold(self, |qp, i| {
      let mut row = vec![0.0; n];
      row[i] = -1.0;
      qp.at_most(&row, 0.0)
    })
  }

  pub fn dim(&self) -> usize {
    self.p.ncols()
  }
}

fn push_row(a: &DMatrix<f64>, b: &DVector<f64>, row: &[f64], rhs: f64) -> (DMatrix<f64>, DVector<f64>) {
  let m = a.nrows();
  let mut a = a.clone().insert_row(m, 0.0);
  for (j, &v) in row.iter().enumerate() {
    a[(m, j)] = v;
  }
  let b = b.clone().push(rhs);
  (a, b)
}

/// Convert a dense matrix to CSC, keeping only the upper triangle if asked.
fn dense_to_csc(m: &DMatrix<f64>, upper_only: bool) -> CscMatrix<f64> {
  let mut colptr = Vec::with_capacity(m.ncols() + 1);
  let mut rowval = Vec::new();
  let mut nzval = Vec::new();
  colptr.push(0);

  for j in 0..m.ncols() {
    let last = if upper_only {
      (j + 1).min(m.nrows())
    } else {
      m.nrows()
    };
    for i in 0..last {
      let v = m[(i, j)];
      if v != 0.0 {
        rowval.push(i);
        nzval.push(v);
      }
    }
    colptr.push(rowval.len());
  }

  CscMatrix::new(m.nrows(), m.ncols(), colptr, rowval, nzval)
}

/// Solve the QP and return the primal solution.
///
/// Primal infeasibility maps to [`FrontierError::Infeasible`]; every other
/// non-optimal status maps to [`FrontierError::IllConditioned`].
pub(crate) fn solve(qp: &QuadraticProgram, settings: &SolverSettings) -> Result<DVector<f64>> {
  let n = qp.dim();
  let m_eq = qp.a_eq.nrows();
  let m_in = qp.a_in.nrows();

  let mut a = DMatrix::zeros(m_eq + m_in, n);
  a.rows_mut(0, m_eq).copy_from(&qp.a_eq);
  a.rows_mut(m_eq, m_in).copy_from(&qp.a_in);
  let b: Vec<f64> = qp.b_eq.iter().chain(qp.b_in.iter()).copied().collect();

  let mut cones = Vec::new();
  if m_eq > 0 {
    cones.push(SupportedConeT::ZeroConeT(m_eq));
  }
  if m_in > 0 {
    cones.push(SupportedConeT::NonnegativeConeT(m_in));
  }

  let p = dense_to_csc(&qp.p, true);
  let a = dense_to_csc(&a, false);
  let q: Vec<f64> = qp.q.iter().copied().collect();

  let clarabel_settings = DefaultSettingsBuilder::default()
    .verbose(settings.verbose)
    .max_iter(settings.max_iter)
    .tol_gap_abs(settings.tol_gap_abs)
    .tol_gap_rel(settings.tol_gap_rel)
    .tol_feas(settings.tol_feas)
    .build()
    .map_err(|e| FrontierError::InvalidArgument(format!("solver settings: {e:?}")))?;

  let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, clarabel_settings);
  solver.solve();

  let status = solver.solution.status;
  debug!(
    ?status,
    iterations = solver.info.iterations,
    n,
    m_eq,
    m_in,
    "qp solved"
  );

  match status {
    SolverStatus::Solved | SolverStatus::AlmostSolved => {
      let x = DVector::from_vec(solver.solution.x.clone());
      if x.iter().all(|v| v.is_finite()) {
        Ok(x)
      } else {
        Err(FrontierError::IllConditioned(
          "solver returned non-finite weights".into(),
        ))
      }
    }
    SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => Err(
      FrontierError::Infeasible("no weight vector satisfies the constraints".into()),
    ),
    other => Err(FrontierError::IllConditioned(format!(
      "solver stopped with status {other:?}"
    ))),
  }
}
