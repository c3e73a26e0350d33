use std::thread;

use alloc::vec::Vec;

use argmin::core::observers::ObserverMode;
use argmin::core::{CostFunction, Executor, Gradient};
use argmin::solver::linesearch::condition::ArmijoCondition;
use argmin::solver::linesearch::{BacktrackingLineSearch, MoreThuenteLineSearch};
use argmin::solver::quasinewton::LBFGS;
use argmin_math::{ArgminAdd, ArgminDot, ArgminMul};
use argmin_observer_slog::SlogLogger;

use crate::emission::EmissionMatrix;
use crate::errors::{CrfError, Result};
use crate::forward_backward;
use crate::model::{self, Crf};
use crate::transition::TransitionMatrix;

/// Number of past updates kept by L-BFGS.
const LBFGS_MEMORY: usize = 7;

/// Represents an emission matrix with its gold tag sequence.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[derive(Clone, Debug)]
pub struct LabeledSequence {
    /// Emission scores.
    pub emission: EmissionMatrix,

    /// Gold tags, one per row of the emission.
    pub tags: Vec<usize>,
}

impl LabeledSequence {
    /// Creates a new labeled sequence.
    #[inline(always)]
    #[must_use]
    pub const fn new(emission: EmissionMatrix, tags: Vec<usize>) -> Self {
        Self { emission, tags }
    }
}

/// Total negative log-likelihood of a set of sequences as a function of the flattened
/// transition scores.
///
/// This implements the argmin [`CostFunction`] and [`Gradient`] traits so that any
/// argmin solver over `Vec<f64>` can fit the transitions. Emission scores are fixed.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
pub struct SequencesLoss<'a> {
    sequences: &'a [LabeledSequence],
    num_tags: usize,
    n_threads: usize,
    l2_lambda: Option<f64>,
}

impl<'a> SequencesLoss<'a> {
    /// Creates a new loss.
    ///
    /// # Errors
    ///
    /// `num_tags` and `n_threads` must not be 0, `l2_lambda` must not be negative, and
    /// every sequence must be valid for `num_tags` tags.
    pub fn new(
        sequences: &'a [LabeledSequence],
        num_tags: usize,
        n_threads: usize,
        l2_lambda: Option<f64>,
    ) -> Result<Self> {
        if num_tags == 0 {
            return Err(CrfError::invalid_argument("num_tags must not be 0"));
        }
        if n_threads == 0 {
            return Err(CrfError::invalid_argument("n_threads must not be 0"));
        }
        if l2_lambda.is_some_and(|lambda| lambda < 0.0) {
            return Err(CrfError::invalid_argument(
                "lambda must be greater than or equal to 0.0",
            ));
        }
        for seq in sequences {
            model::check_emission(num_tags, &seq.emission)?;
            model::check_tags(num_tags, seq.emission.len(), &seq.tags)?;
        }
        Ok(Self {
            sequences,
            num_tags,
            n_threads,
            l2_lambda,
        })
    }

    /// Runs `f` on every sequence over the worker threads and returns the per-thread
    /// accumulators.
    fn map_sequences<T, F>(&self, init: impl Fn() -> T + Sync, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&LabeledSequence, &mut T, &mut Vec<f64>, &mut Vec<f64>) + Sync,
    {
        let (s, r) = crossbeam_channel::unbounded();
        for seq in self.sequences {
            // The receiver outlives this loop.
            let _ = s.send(seq);
        }
        drop(s);
        thread::scope(|scope| {
            let mut threads = vec![];
            for _ in 0..self.n_threads {
                let r = r.clone();
                let init = &init;
                let f = &f;
                threads.push(scope.spawn(move || {
                    let mut alphas = vec![];
                    let mut betas = vec![];
                    let mut acc = init();
                    while let Ok(seq) = r.recv() {
                        f(seq, &mut acc, &mut alphas, &mut betas);
                    }
                    acc
                }));
            }
            threads
                .into_iter()
                .map(|t| t.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
    }
}

impl CostFunction for SequencesLoss<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let trans = TransitionMatrix::from_vec(param.clone(), self.num_tags)?;
        let mut loss_total: f64 = self
            .map_sequences(
                || 0.0f64,
                |seq, loss_total, _, _| {
                    let scores = seq.emission.as_slice();
                    let z = forward_backward::log_partition(&trans, scores);
                    let real = forward_backward::path_score(&trans, scores, &seq.tags);
                    *loss_total += forward_backward::negative_log_likelihood(z, real);
                },
            )
            .into_iter()
            .sum();

        if let Some(lambda) = self.l2_lambda {
            let norm2: f64 = param.dot(param);
            loss_total += lambda * norm2 * 0.5;
        }

        Ok(loss_total)
    }
}

impl Gradient for SequencesLoss<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        let trans = TransitionMatrix::from_vec(param.clone(), self.num_tags)?;
        let mut gradients = vec![0.0; param.len()];
        let local_gradients = self.map_sequences(
            || vec![0.0; param.len()],
            |seq, local_gradients, alphas, betas| {
                let scores = seq.emission.as_slice();
                let z = forward_backward::calculate_alphas_betas(&trans, scores, alphas, betas);
                forward_backward::update_gradient(
                    &trans,
                    scores,
                    &seq.tags,
                    alphas,
                    betas,
                    z,
                    local_gradients,
                );
            },
        );
        for local_gradients in local_gradients {
            for (y, x) in gradients.iter_mut().zip(local_gradients) {
                *y += x;
            }
        }

        if let Some(lambda) = self.l2_lambda {
            gradients = gradients.add(&param.mul(&lambda));
        }

        Ok(gradients)
    }
}

/// L1- or L2- regularization settings
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Regularization {
    /// Performs L1-regularization.
    L1,

    /// Performs L2-regularization.
    L2,
}

/// Trainer that fits the transition scores of a [`Crf`] with L-BFGS.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
pub struct Trainer {
    max_iter: u64,
    n_threads: usize,
    regularization: Regularization,
    lambda: f64,
    logging: bool,
}

impl Trainer {
    /// Creates a new trainer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_iter: 100,
            n_threads: 1,
            regularization: Regularization::L2,
            lambda: 0.1,
            logging: true,
        }
    }

    /// Sets the maximum number of iterations
    ///
    /// # Errors
    ///
    /// `max_iter` must not be 0.
    pub fn max_iter(mut self, max_iter: u64) -> Result<Self> {
        if max_iter == 0 {
            return Err(CrfError::invalid_argument("max_iter must not be 0"));
        }
        self.max_iter = max_iter;
        Ok(self)
    }

    /// Sets regularization settings.
    ///
    /// # Errors
    ///
    /// `lambda` must not be negative.
    pub fn regularization(mut self, regularization: Regularization, lambda: f64) -> Result<Self> {
        if lambda < 0.0 {
            return Err(CrfError::invalid_argument(
                "lambda must be greater than or equal to 0.0",
            ));
        }
        self.regularization = regularization;
        self.lambda = lambda;
        Ok(self)
    }

    /// Sets the number of threads
    ///
    /// # Errors
    ///
    /// `n_threads` must not be 0.
    pub fn n_threads(mut self, n_threads: usize) -> Result<Self> {
        if n_threads == 0 {
            return Err(CrfError::invalid_argument("n_threads must not be 0"));
        }
        self.n_threads = n_threads;
        Ok(self)
    }

    /// Enables or disables the progress log of the solver on the terminal.
    #[must_use]
    pub const fn logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    /// Fits the transitions of `crf` to the given sequences and overwrites them with the
    /// best parameters found.
    ///
    /// # Errors
    ///
    /// `sequences` must not be empty and every sequence must be valid for `crf`. An
    /// error is also returned if the solver fails.
    pub fn train(&self, crf: &mut Crf, sequences: &[LabeledSequence]) -> Result<()> {
        if sequences.is_empty() {
            return Err(CrfError::invalid_argument("sequences must not be empty"));
        }
        let num_tags = crf.num_tags();
        let weights_init = crf.transitions().as_slice().to_vec();
        log::info!(
            "training {}x{} transitions on {} sequences ({:?}, lambda = {})",
            num_tags,
            num_tags,
            sequences.len(),
            self.regularization,
            self.lambda,
        );

        let (weights, best_cost) = match self.regularization {
            Regularization::L1 => {
                let loss_function = SequencesLoss::new(sequences, num_tags, self.n_threads, None)?;
                let linesearch = BacktrackingLineSearch::new(
                    ArmijoCondition::new(1e-4).map_err(optimizer_error)?,
                )
                .rho(0.5)
                .map_err(optimizer_error)?;
                let solver = LBFGS::new(linesearch, LBFGS_MEMORY)
                    .with_l1_regularization(self.lambda)
                    .map_err(optimizer_error)?;
                let executor = Executor::new(loss_function, solver)
                    .configure(|state| state.param(weights_init).max_iters(self.max_iter));
                let res = if self.logging {
                    executor
                        .add_observer(SlogLogger::term(), ObserverMode::Always)
                        .run()
                } else {
                    executor.run()
                }
                .map_err(optimizer_error)?;
                (res.state.best_param.or(res.state.param), res.state.best_cost)
            }
            Regularization::L2 => {
                let loss_function = SequencesLoss::new(
                    sequences,
                    num_tags,
                    self.n_threads,
                    Some(self.lambda),
                )?;
                let linesearch = MoreThuenteLineSearch::new()
                    .with_c(1e-4, 0.9)
                    .map_err(optimizer_error)?;
                let solver = LBFGS::new(linesearch, LBFGS_MEMORY);
                let executor = Executor::new(loss_function, solver)
                    .configure(|state| state.param(weights_init).max_iters(self.max_iter));
                let res = if self.logging {
                    executor
                        .add_observer(SlogLogger::term(), ObserverMode::Always)
                        .run()
                } else {
                    executor.run()
                }
                .map_err(optimizer_error)?;
                (res.state.best_param.or(res.state.param), res.state.best_cost)
            }
        };
        let Some(weights) = weights else {
            return Err(CrfError::optimizer("solver returned no parameters"));
        };
        if weights.len() != num_tags * num_tags {
            return Err(CrfError::optimizer("solver changed the number of parameters"));
        }
        log::info!("training finished (cost = {best_cost})");

        crf.transitions_mut()
            .as_mut_slice()
            .copy_from_slice(&weights);
        Ok(())
    }
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new()
    }
}

fn optimizer_error(e: argmin::core::Error) -> CrfError {
    CrfError::optimizer(format!("{e}"))
}
