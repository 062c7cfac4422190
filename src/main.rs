use anyhow::{Context, Result};
use crossbeam::channel::{bounded, select};
use indicatif::{ProgressBar, ProgressStyle};
use std::{path::PathBuf, sync::Arc, time::Duration};
use structopt::StructOpt;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;

mod capture;
mod classify;
mod error;
mod feedback;
mod history;
mod landmark;
mod monitor;
mod subject;

use feedback::{FeedbackCode, OverallState};

/// Consumes the monitor's output channels for display.
struct Presenter {
    progress: Option<ProgressBar>,
    feedback: Option<FeedbackCode>,
    state: Option<OverallState>,
}

impl Presenter {
    fn feedback(&mut self, code: Option<FeedbackCode>) {
        if let Some(code) = code {
            debug!(message = "posture feedback", %code, key = code.message_key());
            self.feedback = Some(code);
            self.refresh();
        }
    }

    fn state(&mut self, state: OverallState) {
        if self.state != Some(state) {
            info!(message = "overall posture changed", state = state.css_class());
            self.state = Some(state);
        }
        self.refresh();
    }

    fn diagnostics(&self, diagnostics: Option<classify::Diagnostics>) -> Result<(), error::Error> {
        if let Some(diagnostics) = diagnostics {
            let json =
                serde_json::to_string(&diagnostics).map_err(error::Error::SerializeDiagnostics)?;
            debug!(message = "frame diagnostics", diagnostics = %json);
        }
        Ok(())
    }

    fn refresh(&self) {
        if let Some(progress) = self.progress.as_ref() {
            progress.set_message(format!(
                "{} [{}]",
                self.feedback.map_or("", FeedbackCode::message_key),
                self.state.map_or("", OverallState::css_class),
            ));
            progress.inc(1);
        }
    }
}

#[derive(structopt::StructOpt)]
struct Opt {
    /// Newline-delimited JSON pose-model output, one frame per line, or `-` for stdin.
    #[structopt(required = true)]
    landmarks: PathBuf,

    /// Milliseconds between captured frames.
    #[structopt(short, long)]
    interval_ms: Option<u64>,

    /// Maximum vertical distance between the shoulders.
    #[structopt(long, default_value = "0.05")]
    shoulder_alignment: f32,

    /// Shoulder offset from the torso center below which shoulders count as hunched.
    #[structopt(long, default_value = "0.1")]
    shoulder_hunch: f32,

    /// Number of recent frames the overall state is debounced over.
    #[structopt(long, default_value = "10")]
    history: usize,

    /// Overall state turns bad once more than this many recent frames are bad.
    #[structopt(long, default_value = "5")]
    bad_limit: usize,

    #[structopt(short, long, default_value = "info", env = "RUST_LOG")]
    log_level: tracing_subscriber::filter::EnvFilter,

    #[structopt(short, long)]
    show_progress: bool,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(opt.log_level),
    )?;

    let classifier = classify::Classifier::new(classify::Thresholds {
        shoulder_alignment: opt.shoulder_alignment,
        shoulder_hunch: opt.shoulder_hunch,
    });
    let history = history::PostureHistory::with_limits(opt.history, opt.bad_limit)
        .context("failed constructing posture history")?;
    let monitor = Arc::new(monitor::PostureMonitor::new(classifier, history));

    let feedback_rx = monitor.feedback().subscribe();
    let state_rx = monitor.state().subscribe();
    let diagnostics_rx = monitor.diagnostics().subscribe();

    let (interrupt_tx, interrupt_rx) = bounded(1);
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    })
    .context("failed setting Ctrl-C handler")?;

    let mut presenter = Presenter {
        progress: if opt.show_progress {
            Some(
                ProgressBar::new_spinner().with_style(
                    ProgressStyle::default_spinner()
                        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                        .template("{prefix:.bold.dim} {spinner} {wide_msg}"),
                ),
            )
        } else {
            None
        },
        feedback: None,
        state: None,
    };

    let interval = opt
        .interval_ms
        .map(Duration::from_millis)
        .unwrap_or(capture::DEFAULT_INTERVAL);
    let source = capture::replay::Replay::open(&opt.landmarks)
        .context("failed opening landmark replay")?;
    let session = capture::Session::start(
        source,
        capture::Passthrough::default(),
        monitor.clone(),
        interval,
    )
    .context("failed starting capture")?;

    info!(
        message = "capture started",
        interval_ms = interval.as_millis() as u64,
        subscribers = monitor.state().subscriber_count()
    );

    loop {
        select! {
            recv(interrupt_rx) -> _ => {
                info!(message = "interrupted, stopping capture");
                break;
            }
            recv(session.finished()) -> _ => break,
            recv(feedback_rx) -> code => {
                if let Ok(code) = code {
                    presenter.feedback(code);
                }
            }
            recv(state_rx) -> state => {
                if let Ok(state) = state {
                    presenter.state(state);
                }
            }
            recv(diagnostics_rx) -> diagnostics => {
                if let Ok(diagnostics) = diagnostics {
                    presenter.diagnostics(diagnostics)?;
                }
            }
        }
    }

    let capture_stats = session.stop().context("failed stopping capture")?;

    for code in feedback_rx.try_iter() {
        presenter.feedback(code);
    }
    for diagnostics in diagnostics_rx.try_iter() {
        presenter.diagnostics(diagnostics)?;
    }
    for state in state_rx.try_iter() {
        presenter.state(state);
    }

    if let Some(progress) = presenter.progress.as_ref() {
        progress.finish_and_clear();
    }

    let monitor_stats = monitor.stats();
    info!(
        message = "capture stopped",
        submitted = capture_stats.submitted,
        dropped = capture_stats.dropped,
        evaluated = monitor_stats.evaluated,
        skipped = monitor_stats.skipped,
        window = monitor.history_len(),
        state = monitor.state().latest().css_class()
    );

    Ok(())
}
