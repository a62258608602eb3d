use std::env;

use pianoroll_vae::history::read_column;

/// Print ASCII bar charts of the loss curves written for a run.
///
/// Usage: `plot_metrics <name> [dir]` reads `train_loss_<name>.txt` and
/// `val_loss_<name>.txt` from `dir` (default `.`).
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let mut args = env::args().skip(1);
    let name = args.next().unwrap_or_default();
    let dir = args.next().unwrap_or_else(|| ".".to_string());
    let dir = std::path::Path::new(&dir);

    for kind in ["train_loss", "val_loss"] {
        let losses = read_column(dir.join(format!("{kind}_{name}.txt")))?;
        println!("{kind}");
        if losses.is_empty() {
            continue;
        }
        let max_loss = losses.iter().fold(f32::MIN, |a, &b| a.max(b));
        for (i, loss) in losses.iter().enumerate() {
            let bar = if max_loss > 0.0 {
                ((loss / max_loss) * 50.0) as usize
            } else {
                0
            };
            println!("{:5} | {} {:.4}", i, "*".repeat(bar), loss);
        }
    }
    Ok(())
}
