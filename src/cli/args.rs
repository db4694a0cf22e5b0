//! CLI argument parsing using clap.
//!
//! Every flag overrides the matching settings-file value.

use clap::Parser;
use std::path::PathBuf;

use crate::settings::schema::DecisionBackend;
use crate::settings::LedpanelSettings;

/// LED button-panel game server
#[derive(Parser, Debug, Clone)]
#[command(name = "ledpanel-server")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Settings file (default: ~/.ledpanel/settings.toml)
    #[arg(short = 'c', long, env = "LEDPANEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address the HTTP server binds to
    #[arg(long)]
    pub host: Option<String>,

    /// Port the HTTP server listens on (0 picks a free port)
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Serial device of the button panel
    #[arg(short = 'd', long, conflicts_with = "no_device")]
    pub device: Option<String>,

    /// Run without a panel even if one is configured
    #[arg(long)]
    pub no_device: bool,

    /// Fixed RNG seed for reproducible patterns
    #[arg(long)]
    pub seed: Option<u64>,

    /// Prediction service URL (selects the remote decision backend)
    #[arg(long, env = "LEDPANEL_DECISION_URL")]
    pub decision_url: Option<String>,

    /// CSV file receiving one row per finalized round
    #[arg(long)]
    pub rounds_csv: Option<PathBuf>,

    /// Show verbose output (debug information)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Args {
    /// Fold command-line overrides into loaded settings.
    pub fn apply_overrides(&self, settings: &mut LedpanelSettings) {
        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if self.no_device {
            settings.hardware.device = None;
        } else if let Some(device) = &self.device {
            settings.hardware.device = Some(device.clone());
        }
        if let Some(seed) = self.seed {
            settings.game.seed = Some(seed);
        }
        if let Some(url) = &self.decision_url {
            settings.decision.backend = DecisionBackend::Remote;
            settings.decision.url = Some(url.clone());
        }
        if let Some(path) = &self.rounds_csv {
            settings.logging.rounds_csv = Some(path.display().to_string());
        }
    }
}
