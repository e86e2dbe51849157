use cgrna::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// One progress bar over the input files; build events from the library
/// update its message.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new(total_inputs: u64) -> Self {
        Self::with_target(total_inputs, ProgressDrawTarget::stderr())
    }

    fn with_target(total_inputs: u64, target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::with_draw_target(Some(total_inputs), target).with_style(Self::bar_style());
        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();

        Box::new(move |progress: Progress| {
            let Ok(pb_guard) = pb_clone.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => pb_guard.set_message(name.to_string()),
                Progress::PhaseFinish | Progress::ModelsFinish => {}
                Progress::ModelsStart { total } => {
                    pb_guard.set_message(format!("Fitting {} model(s)", total));
                }
                Progress::ModelFinished { name } => pb_guard.set_message(format!("Fitted {}", name)),
                Progress::Message(msg) => pb_guard.println(format!("  {}", msg)),
            }
        })
    }

    pub fn start_input(&self, path: &Path) {
        if let Ok(pb) = self.pb.lock() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            pb.set_prefix(name);
        }
    }

    pub fn finish_input(&self) {
        if let Ok(pb) = self.pb.lock() {
            pb.inc(1);
        }
    }

    pub fn finish(&self) {
        if let Ok(pb) = self.pb.lock() {
            pb.finish_with_message("✓ Done");
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{prefix:<20} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("##-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}
