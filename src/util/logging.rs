/// Format a message reporting the total number of matrix operations.
pub fn format_total_ops(count: usize) -> String {
    format!("Total matrix ops: {}", count)
}

/// Log the total number of matrix operations at info level.
pub fn log_total_ops(count: usize) {
    log::info!("{}", format_total_ops(count));
}

/// One-line epoch report in the style of a Keras fit log.
pub fn format_epoch(epoch: usize, epochs: usize, loss: f32, val_loss: f32, beta: f32) -> String {
    format!(
        "Epoch {}/{} - loss: {:.4} - val_loss: {:.4} - beta: {:.3}",
        epoch + 1,
        epochs,
        loss,
        val_loss,
        beta
    )
}

/// Format a sweep improvement message.
pub fn format_new_best(label: &str, loss: f32) -> String {
    format!("New best network {label} with val_loss {loss:.4}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_total_ops() {
        assert_eq!(format_total_ops(42), "Total matrix ops: 42");
    }

    #[test]
    fn test_format_epoch() {
        assert_eq!(
            format_epoch(0, 50, 312.25, 300.5, 0.0),
            "Epoch 1/50 - loss: 312.2500 - val_loss: 300.5000 - beta: 0.000"
        );
    }

    #[test]
    fn test_format_new_best() {
        assert_eq!(
            format_new_best("64 x 128 CUTOFF: 1 LATENT DIM: 20", 0.38),
            "New best network 64 x 128 CUTOFF: 1 LATENT DIM: 20 with val_loss 0.3800"
        );
    }
}
