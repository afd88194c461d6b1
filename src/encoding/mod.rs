//! Categorical encodings shared by the trainer and the feature builder.
//!
//! Two strategies exist and a pipeline run uses exactly one of them: a fitted
//! [`LabelEncoder`] that maps each category to a dense integer code, or the
//! static closed-vocabulary one-hot expansion in [`one_hot`].

mod label;
pub mod one_hot;

use thiserror::Error;

pub use label::{Encoded, LabelEncoder, UNSEEN_CODE};
pub use one_hot::{expand, CategoryMatch};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("cannot fit a label encoder on an empty column")]
    EmptyColumn,
}
