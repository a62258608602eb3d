use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use csv::Writer;
use serde::Serialize;

/// Appends serialisable records to `metrics.jsonl` and `metrics.csv` under
/// `<log_dir>/<experiment>/`.
pub struct Logger {
    json: File,
    csv: Writer<File>,
    dir: PathBuf,
}

/// Metrics reported once per epoch by the training loop.
#[derive(Clone, Debug, Serialize)]
pub struct MetricRecord {
    pub run: String,
    pub epoch: usize,
    pub step: usize,
    pub loss: f32,
    pub val_loss: f32,
    pub reconstruction: f32,
    pub kl: f32,
    pub beta: f32,
    pub lr: f32,
    pub kind: &'static str,
}

impl Logger {
    pub fn new(log_dir: Option<String>, experiment: Option<String>) -> std::io::Result<Self> {
        let base = log_dir.unwrap_or_else(|| "runs".to_string());
        let exp = experiment.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_else(|_| Duration::from_secs(0))
                .as_secs()
                .to_string()
        });
        let dir = PathBuf::from(base).join(exp);
        std::fs::create_dir_all(&dir)?;
        let json = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("metrics.jsonl"))?;
        let csv_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("metrics.csv"))?;
        let csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(csv_file);
        Ok(Logger { json, csv, dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    pub fn log<T: Serialize>(&mut self, metrics: &T) {
        if let Ok(line) = serde_json::to_string(metrics) {
            if let Err(e) = writeln!(self.json, "{}", line) {
                log::warn!("failed to append metrics: {e}");
            }
        }
        let written = self
            .csv
            .serialize(metrics)
            .and_then(|_| self.csv.flush().map_err(csv::Error::from));
        if let Err(e) = written {
            log::warn!("failed to append csv metrics: {e}");
        }
    }
}

/// Signals returned by callbacks to control training flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackSignal {
    /// Continue training as normal.
    Continue,
    /// Stop training early.
    Stop,
}

/// Trait for hooking into various stages of the training loop.
pub trait Callback {
    /// Called once before training starts.
    fn on_train_begin(&mut self) {}

    /// Called at the beginning of each epoch, after the KL weight for the
    /// epoch has been set.
    fn on_epoch_begin(&mut self, _epoch: usize, _beta: f32) {}

    /// Called after each epoch. Returning `Stop` will end training.
    fn on_epoch_end(&mut self, _metrics: &MetricRecord) -> CallbackSignal {
        CallbackSignal::Continue
    }

    /// Called once after training ends.
    fn on_train_end(&mut self) {}
}

/// Stop training when the validation loss has not improved for `patience`
/// consecutive epochs.
pub struct EarlyStopping {
    patience: usize,
    best: Option<f32>,
    wait: usize,
    stopped_epoch: Option<usize>,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best: None,
            wait: 0,
            stopped_epoch: None,
        }
    }

    pub fn best(&self) -> Option<f32> {
        self.best
    }

    pub fn stopped_epoch(&self) -> Option<usize> {
        self.stopped_epoch
    }
}

impl Callback for EarlyStopping {
    fn on_train_begin(&mut self) {
        self.best = None;
        self.wait = 0;
        self.stopped_epoch = None;
    }

    fn on_epoch_end(&mut self, metrics: &MetricRecord) -> CallbackSignal {
        let current = metrics.val_loss;
        if self.best.map_or(!current.is_nan(), |b| current < b) {
            self.best = Some(current);
            self.wait = 0;
        } else {
            self.wait += 1;
            if self.wait >= self.patience {
                self.stopped_epoch = Some(metrics.epoch);
                log::info!(
                    "epoch {}: early stopping, val_loss has not improved for {} epochs",
                    metrics.epoch,
                    self.wait
                );
                return CallbackSignal::Stop;
            }
        }
        CallbackSignal::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(epoch: usize, val_loss: f32) -> MetricRecord {
        MetricRecord {
            run: "t".into(),
            epoch,
            step: 0,
            loss: val_loss,
            val_loss,
            reconstruction: val_loss,
            kl: 0.0,
            beta: 0.0,
            lr: 0.001,
            kind: "epoch",
        }
    }

    #[test]
    fn early_stopping_waits_for_patience() {
        let mut es = EarlyStopping::new(2);
        es.on_train_begin();
        assert_eq!(es.on_epoch_end(&record(0, 1.0)), CallbackSignal::Continue);
        assert_eq!(es.on_epoch_end(&record(1, 0.5)), CallbackSignal::Continue);
        assert_eq!(es.on_epoch_end(&record(2, 0.6)), CallbackSignal::Continue);
        assert_eq!(es.on_epoch_end(&record(3, 0.5)), CallbackSignal::Stop);
        assert_eq!(es.best(), Some(0.5));
        assert_eq!(es.stopped_epoch(), Some(3));
    }

    #[test]
    fn logger_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = Logger::new(
            Some(dir.path().to_string_lossy().into_owned()),
            Some("exp".into()),
        )
        .unwrap();
        logger.log(&record(0, 1.0));
        let jsonl = std::fs::read_to_string(logger.dir().join("metrics.jsonl")).unwrap();
        assert!(jsonl.contains("\"val_loss\":1.0"));
        let csv = std::fs::read_to_string(logger.dir().join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
