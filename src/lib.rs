//! # chaincrf
//!
//! Linear-chain Conditional Random Fields (CRFs) without start and stop tags,
//! implemented in pure Rust.
//!
//! The model holds a `T x T` matrix of transition scores. Emission scores are computed
//! elsewhere (for example by a neural network) and passed to each call as a row-major
//! `L x T` matrix.
#![cfg_attr(
    feature = "std",
    doc = "
## Examples

```rust
use chaincrf::{Crf, EmissionMatrix, TransitionMatrix};

// Two tags that prefer to alternate.
let transitions = TransitionMatrix::from_rows(&[[0.0, 1.0], [1.0, 0.0]]).unwrap();
let crf = Crf::new(transitions);

let emission = EmissionMatrix::new(vec![0.0; 6], 2).unwrap();

let (score, path) = crf.decode(&emission).unwrap();
assert_eq!(vec![0, 1, 0], path);
assert!((score - 2.0).abs() < 1e-12);

// The gold path is the best one, so its loss is the smallest.
let loss = crf.nll_loss(&emission, &[0, 1, 0]).unwrap();
assert!(loss >= 0.0);
assert!(loss < crf.nll_loss(&emission, &[0, 0, 0]).unwrap());
```
"
)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "alloc"))]
compile_error!("`alloc` feature is currently required to build this crate");

#[macro_use]
extern crate alloc;

mod batch;
mod emission;
pub mod errors;
mod forward_backward;
mod math;
mod model;
mod transition;
mod viterbi;

#[cfg(feature = "train")]
mod trainer;

#[cfg(test)]
mod test_utils;

pub use emission::{EmissionBatch, EmissionMatrix, Emissions};
pub use errors::{CrfError, Result};
pub use model::Crf;
pub use transition::TransitionMatrix;

#[cfg(feature = "std")]
pub use batch::BatchDecoder;
#[cfg(feature = "std")]
pub use forward_backward::NllGradient;

#[cfg(feature = "train")]
pub use trainer::{LabeledSequence, Regularization, SequencesLoss, Trainer};
