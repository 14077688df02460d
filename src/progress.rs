use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

/// Progress configuration for determining whether to show progress indicators
#[derive(Debug, Clone, Copy)]
pub enum ProgressConfig {
    /// Auto-detect based on TTY
    Auto,
    /// Force enable progress indicators
    ForceEnable,
    /// Force disable progress indicators
    ForceDisable,
}

impl ProgressConfig {
    /// Create a progress config from CLI flags and config file
    pub fn from_flags(progress_flag: bool, no_progress_flag: bool, config_value: Option<bool>) -> Self {
        if progress_flag {
            ProgressConfig::ForceEnable
        }
        else if no_progress_flag {
            ProgressConfig::ForceDisable
        }
        else if let Some(config_val) = config_value {
            if config_val {
                ProgressConfig::ForceEnable
            }
            else {
                ProgressConfig::ForceDisable
            }
        }
        else {
            ProgressConfig::Auto
        }
    }

    /// Determine if progress should be shown based on configuration
    pub fn should_show_progress(&self) -> bool {
        match self {
            ProgressConfig::Auto => atty::is(atty::Stream::Stderr),
            ProgressConfig::ForceEnable => true,
            ProgressConfig::ForceDisable => false,
        }
    }
}

/// Timer for tracking operation duration
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Create and start a new timer
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time in seconds as a formatted string
    pub fn elapsed_string(&self) -> String {
        let elapsed = self.start.elapsed();
        format!("{:.2}s", elapsed.as_secs_f64())
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Spinner for indeterminate operations
pub struct Spinner {
    bar: Option<ProgressBar>,
    enabled: bool,
}

impl Spinner {
    /// Create a new spinner with a message
    pub fn new(config: ProgressConfig, message: &str) -> Self {
        let enabled = config.should_show_progress();

        let bar = if enabled {
            let pb = ProgressBar::new_spinner();
            pb.set_draw_target(ProgressDrawTarget::stderr());
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .expect("Invalid spinner template"),
            );
            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(100));
            Some(pb)
        }
        else {
            None
        };

        Self { bar, enabled }
    }

    /// Finish and clear the spinner
    pub fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }

    /// Check if spinner is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
