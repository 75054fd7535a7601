//! Dirty-checking change detection

mod detector;

pub use detector::ChangeDetector;

use crate::error::EvalResult;
use crate::expression::Value;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Whether a detector takes part in automatic sweeps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDetectionStrategy {
    #[default]
    Default,
    /// Only checked by explicit calls on the detector itself
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Active,
    /// Terminal
    Disabled,
}

/// Handle returned by [`ChangeDetector::watch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub(crate) usize);

/// Called with `(new_value, old_value)` when a watched value changes
pub type Listener = Rc<dyn Fn(&Value, &Value) -> EvalResult<()>>;
