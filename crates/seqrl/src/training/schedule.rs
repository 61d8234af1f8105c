//! Learning-rate schedules.

use std::f64::consts::PI;

/// Cosine decay from `base` to `floor` over `period` steps, then flat.
#[derive(Clone, Debug, PartialEq)]
pub struct CosineAnnealing {
    base: f64,
    floor: f64,
    period: u64,
    steps: u64,
}

impl CosineAnnealing {
    /// A zero `period` is treated as one step.
    pub fn new(base: f64, floor: f64, period: u64) -> Self {
        Self {
            base,
            floor,
            period: period.max(1),
            steps: 0,
        }
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Rate at the current step
    pub fn learning_rate(&self) -> f64 {
        let progress = self.steps.min(self.period) as f64 / self.period as f64;
        self.floor + (self.base - self.floor) * (1.0 + (PI * progress).cos()) / 2.0
    }

    /// Advance one step and return the new rate
    pub fn step(&mut self) -> f64 {
        self.steps += 1;
        self.learning_rate()
    }
}
