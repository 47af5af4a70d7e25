//! Curiosity model
//!
//! Each enabled driver produces a signal in [0, 1]: an observed value when
//! one has been reported, otherwise a random draw. A driver contributes
//! `signal * weight` only when its signal exceeds its threshold, and the sum
//! is normalized by the weight of the contributing drivers. With no
//! contributing driver the score is 0.

use rand::Rng;
use std::collections::HashMap;

use crate::config::{CuriosityConfig, CuriosityDriverConfig};

#[derive(Debug, Clone)]
pub struct CuriosityModel {
    drivers: Vec<CuriosityDriverConfig>,
    observed: HashMap<String, f64>,
}

impl CuriosityModel {
    pub fn new(drivers: Vec<CuriosityDriverConfig>) -> Self {
        Self {
            drivers,
            observed: HashMap::new(),
        }
    }

    pub fn from_config(config: &CuriosityConfig) -> Self {
        Self::new(config.drivers.clone())
    }

    /// Report an observed signal for a driver, replacing random draws
    pub fn observe(&mut self, driver: &str, signal: f64) {
        self.observed.insert(driver.to_string(), signal.clamp(0.0, 1.0));
    }

    /// Current curiosity score in [0, 1]
    pub fn score<R: Rng>(&self, rng: &mut R) -> f64 {
        let mut contributed = 0.0;
        let mut total_weight = 0.0;

        for driver in self.drivers.iter().filter(|d| d.enabled) {
            let signal = match self.observed.get(&driver.name) {
                Some(value) => *value,
                None => rng.gen::<f64>(),
            };
            if signal > driver.threshold {
                contributed += signal * driver.weight;
                total_weight += driver.weight;
            }
        }

        if total_weight > 0.0 {
            (contributed / total_weight).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn drivers(&self) -> &[CuriosityDriverConfig] {
        &self.drivers
    }
}
