//! Time over threshold from leading and trailing edges
//!
//! Leading and trailing edges carry their own coarse counter values, which
//! may roll over independently between the two edges. Whole counter turns
//! (`M * T`) are added to the trailing edge until it follows the leading one.

use serde::{Deserialize, Serialize};

use crate::cfg::Timing;
use crate::CalError;

/// What to do with a width that is still negative after unwrapping
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WidthPolicy {
    /// Warn and emit the value
    Keep,
    /// Warn and drop the value
    Discard,
}

impl Default for WidthPolicy {
    fn default() -> Self {
        WidthPolicy::Keep
    }
}

/// Move `trailing` forward by whole `step`s until it is not before `leading`.
/// Non-finite inputs are returned unchanged.
pub fn unwrap_trailing(leading: f64, trailing: f64, step: f64) -> f64 {
    let mut t = trailing;
    if !(leading.is_finite() && t.is_finite() && step.is_finite() && step > 0.) {
        return t;
    }
    while t - leading < 0. {
        t += step;
    }
    t
}

/// `trailing - leading`, flagging a negative result
pub fn checked_width(leading: f64, trailing: f64) -> Result<f64, CalError> {
    let width = trailing - leading;
    if width < 0. {
        return Err(CalError::NegativeWidth { leading, trailing, width });
    }
    Ok(width)
}

/// Calibrated times of one readout end of a physical channel in one event
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EndRecord {
    pub leading: Option<f64>,
    pub trailing: Option<f64>,
    pub width: Option<f64>,
}

/// Pairs edges into widths with a fixed counter-turn step
#[derive(Clone, Copy, Debug)]
pub struct Reducer {
    step: f64,
    policy: WidthPolicy,
}

impl Reducer {
    pub fn new(timing: &Timing, policy: WidthPolicy) -> Self {
        Reducer {
            step: timing.wrap(),
            policy,
        }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Fill in the widths of all ends of one physical channel.
    ///
    /// With a `reference` (e.g. the start counter time of the event) every
    /// end is additionally moved by whole counter turns until its leading
    /// edge is not before the reference, so all ends share one absolute
    /// cycle. Returns the number of negative widths seen.
    pub fn reduce(&self, ends: &mut [EndRecord], reference: Option<f64>) -> u64 {
        let mut negative = 0;
        for end in ends.iter_mut() {
            if let (Some(l), Some(t)) = (end.leading, end.trailing) {
                end.trailing = Some(unwrap_trailing(l, t, self.step));
            }
            if let (Some(r), Some(l)) = (reference, end.leading) {
                let shifted = unwrap_trailing(r, l, self.step);
                let shift = shifted - l;
                end.leading = Some(shifted);
                end.trailing = end.trailing.map(|t| t + shift);
            }
            end.width = match (end.leading, end.trailing) {
                (Some(l), Some(t)) => match checked_width(l, t) {
                    Ok(w) => Some(w),
                    Err(e) => {
                        negative += 1;
                        e.report();
                        match self.policy {
                            WidthPolicy::Keep => Some(t - l),
                            WidthPolicy::Discard => None,
                        }
                    }
                },
                _ => None,
            };
        }
        negative
    }
}
