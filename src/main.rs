use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rand::Rng;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ratewatch::config::{DemoConfig, RatewatchConfig};
use ratewatch::estimator::{Clock, EstimationMethod, RateEstimator, SampleLog};

/// Print live rate estimates for a stream of randomly spaced events.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trailing window in milliseconds
    #[arg(long)]
    window_ms: Option<u64>,

    /// Estimation method (count-samples or average-intervals)
    #[arg(long)]
    method: Option<EstimationMethod>,

    /// Report the rolling estimate
    #[arg(long)]
    smooth: bool,

    /// Decay factor of the rolling estimate
    #[arg(long)]
    decay: Option<f64>,

    /// Number of events to simulate
    #[arg(long)]
    iterations: Option<u64>,
}

impl Cli {
    /// Load the configuration file, if any, and apply command line overrides.
    fn load_config(&self) -> ratewatch::error::Result<RatewatchConfig> {
        let mut config = match &self.config {
            Some(path) => RatewatchConfig::from_file(path)?,
            None => RatewatchConfig::default(),
        };

        if let Some(window_ms) = self.window_ms {
            config.demo.window_ms = window_ms;
        }
        if let Some(method) = self.method {
            config.demo.method = method;
        }
        if self.smooth {
            config.demo.smoothing = true;
        }
        if let Some(decay) = self.decay {
            config.estimator.decay_factor = decay;
        }
        if let Some(iterations) = self.iterations {
            config.demo.iterations = iterations;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("Starting Ratewatch demo");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Cli::parse().load_config()?;
    info!(
        window_ms = config.demo.window_ms,
        method = %config.demo.method,
        smoothing = config.demo.smoothing,
        decay_factor = config.estimator.decay_factor,
        synchronized = config.estimator.synchronized,
        "Configuration loaded"
    );

    let recorded = if config.estimator.synchronized {
        let estimator = RateEstimator::new().with_config(&config.estimator);
        run_until_shutdown(&estimator, &config.demo).await
    } else {
        let estimator = RateEstimator::unsynchronized().with_config(&config.estimator);
        run_until_shutdown(&estimator, &config.demo).await
    };

    info!(recorded, "Ratewatch demo stopped");
    Ok(())
}

/// Run the demo loop until it finishes or a shutdown signal arrives.
///
/// Returns the number of events recorded.
async fn run_until_shutdown<C: Clock, L: SampleLog>(
    estimator: &RateEstimator<C, L>,
    demo: &DemoConfig,
) -> u64 {
    let mut recorded = 0;
    tokio::select! {
        _ = run(estimator, demo, &mut recorded, |line| println!("{}", line)) => {}
        _ = shutdown_signal() => {}
    }
    recorded
}

/// Query, pause for a random interval, record an event; repeat.
///
/// `recorded` counts the events recorded so far, also when the loop is cut short.
async fn run<C, L, F>(
    estimator: &RateEstimator<C, L>,
    demo: &DemoConfig,
    recorded: &mut u64,
    mut report: F,
) where
    C: Clock,
    L: SampleLog,
    F: FnMut(String),
{
    let window = Duration::from_millis(demo.window_ms);

    for i in 0..demo.iterations {
        let rate = estimator.fps(window, demo.smoothing, demo.method);
        report(format!("FPS SAMPLE {}: {}", i, rate));

        let pause = rand::thread_rng().gen_range(demo.min_interval_ms..=demo.max_interval_ms);
        tokio::time::sleep(Duration::from_millis(pause)).await;

        estimator.record_event();
        *recorded += 1;
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratewatch::estimator::{LocalLog, LockedLog, MonotonicClock};

    fn quick_demo(iterations: u64) -> DemoConfig {
        DemoConfig {
            window_ms: 5,
            smoothing: false,
            method: EstimationMethod::AverageIntervals,
            iterations,
            min_interval_ms: 1,
            max_interval_ms: 2,
        }
    }

    #[tokio::test]
    async fn test_run_records_one_event_per_iteration() {
        let estimator = RateEstimator::new();
        let mut lines = Vec::new();

        let mut recorded = 0;
        run(&estimator, &quick_demo(5), &mut recorded, |line| lines.push(line)).await;

        assert_eq!(recorded, 5);
        assert_eq!(estimator.sample_count(), 5);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "FPS SAMPLE 0: -1");
    }

    #[tokio::test]
    async fn test_run_on_unsynchronized_estimator() {
        let estimator = RateEstimator::with_clock_and_log(MonotonicClock, LocalLog::new());

        let mut recorded = 0;
        run(&estimator, &quick_demo(3), &mut recorded, |_| {}).await;

        assert_eq!(recorded, 3);
        assert_eq!(estimator.sample_count(), 3);
    }

    #[tokio::test]
    async fn test_recorded_counts_events_not_retained_samples() {
        let estimator = RateEstimator::new().with_prune_interval(1);
        let demo = DemoConfig {
            window_ms: 2,
            method: EstimationMethod::CountSamples,
            ..quick_demo(20)
        };

        let mut recorded = 0;
        run(&estimator, &demo, &mut recorded, |_| {}).await;

        // Pauses of at least 1ms against a 2ms window: old samples get pruned.
        assert_eq!(recorded, 20);
        assert!(estimator.sample_count() < 20);
    }

    #[tokio::test]
    async fn test_interrupted_run_keeps_count() {
        let estimator = RateEstimator::new();
        let mut demo = quick_demo(1_000);
        demo.min_interval_ms = 5;
        demo.max_interval_ms = 5;

        let mut recorded = 0;
        tokio::select! {
            _ = run(&estimator, &demo, &mut recorded, |_| {}) => {}
            _ = tokio::time::sleep(Duration::from_millis(60)) => {}
        }

        assert!(recorded > 0);
        assert!(recorded < 1_000);
        assert_eq!(recorded, estimator.sample_count() as u64);
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "ratewatch",
            "--window-ms",
            "500",
            "--method",
            "average-intervals",
            "--smooth",
            "--decay",
            "0.9",
            "--iterations",
            "10",
        ]);

        let config = cli.load_config().unwrap();
        assert_eq!(config.demo.window_ms, 500);
        assert_eq!(config.demo.method, EstimationMethod::AverageIntervals);
        assert!(config.demo.smoothing);
        assert_eq!(config.estimator.decay_factor, 0.9);
        assert_eq!(config.demo.iterations, 10);
    }

    #[test]
    fn test_cli_rejects_invalid_decay() {
        let cli = Cli::parse_from(["ratewatch", "--decay", "1.5"]);
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_method() {
        let result = Cli::try_parse_from(["ratewatch", "--method", "median"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_locked_log_is_default_backend() {
        let estimator: RateEstimator<MonotonicClock, LockedLog> = RateEstimator::default();
        assert!(estimator.is_empty());
    }
}
