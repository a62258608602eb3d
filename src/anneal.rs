/// Linear KL warm-up: beta rises from 0 to 1 over `cutoff_epoch` epochs and
/// then stays at 1.
///
/// The training loop calls [`KlAnnealing::beta_at`] before the first
/// optimizer step of every epoch, so the whole epoch is trained and validated
/// with the same weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KlAnnealing {
    pub cutoff_epoch: usize,
}

impl KlAnnealing {
    pub fn new(cutoff_epoch: usize) -> Self {
        Self { cutoff_epoch }
    }

    /// `min(1, epoch / cutoff_epoch)`; a zero cutoff disables the warm-up.
    pub fn beta_at(&self, epoch: usize) -> f32 {
        if self.cutoff_epoch == 0 || epoch >= self.cutoff_epoch {
            1.0
        } else {
            epoch as f32 / self.cutoff_epoch as f32
        }
    }

    /// Early-stopping patience used alongside this schedule.
    pub fn patience(&self) -> usize {
        200 * self.cutoff_epoch
    }
}
