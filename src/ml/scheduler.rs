// ============================================================
// Layer 5 - Plateau Learning-Rate Scheduler
// ============================================================
// Reduce-on-plateau, minimising a monitored loss:
//
//   - an epoch "improves" when loss < best * (1 - threshold)
//   - after more than `patience` epochs without improvement
//     the rate is multiplied by `factor`, floored at `min_lr`
//   - the bad-epoch counter resets after every reduction
//
// Defaults: patience 15, factor 0.5, min_lr 1e-7.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateauConfig {
    pub patience:  usize,
    pub factor:    f64,
    pub min_lr:    f64,
    /// Relative improvement needed to reset patience.
    pub threshold: f64,
    /// Reductions smaller than this are ignored.
    pub eps:       f64,
}

impl Default for PlateauConfig {
    fn default() -> Self {
        Self {
            patience:  15,
            factor:    0.5,
            min_lr:    1e-7,
            threshold: 1e-4,
            eps:       1e-8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlateauScheduler {
    config:      PlateauConfig,
    lr:          f64,
    best:        f64,
    bad_epochs:  usize,
}

impl PlateauScheduler {
    pub fn new(initial_lr: f64, config: PlateauConfig) -> Self {
        Self { config, lr: initial_lr, best: f64::INFINITY, bad_epochs: 0 }
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    /// Record one epoch's loss. Returns the new rate when it was reduced.
    pub fn step(&mut self, loss: f64) -> Option<f64> {
        if !loss.is_finite() {
            tracing::warn!("Loss is not finite ({loss}); skipping plateau update");
            return None;
        }

        if loss < self.best * (1.0 - self.config.threshold) {
            self.best       = loss;
            self.bad_epochs = 0;
            return None;
        }

        self.bad_epochs += 1;
        if self.bad_epochs <= self.config.patience {
            return None;
        }

        self.bad_epochs = 0;
        let next = (self.lr * self.config.factor).max(self.config.min_lr);
        if self.lr - next > self.config.eps {
            tracing::info!(
                "LR plateau: reducing learning rate from {:.3e} to {:.3e} (best={:.6}, cur={:.6})",
                self.lr, next, self.best, loss
            );
            self.lr = next;
            Some(next)
        } else {
            None
        }
    }
}
