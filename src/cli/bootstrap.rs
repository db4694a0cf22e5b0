//! Server bootstrap - wire settings, hardware, decision model and HTTP
//! surface into one running session.
//!
//! Anything that would make the game misbehave later (a malformed level
//! table, an unopenable panel device, a remote backend without a URL) is
//! reported here, before the server starts accepting requests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::coordinator::{CoordinatorConfig, SessionCoordinator};
use crate::decision::model_from_settings;
use crate::game::{LevelTable, PatternGenerator};
use crate::hardware::{open_device, HardwareSink, NullSink};
use crate::listener::{spawn_listener, ListenerStats};
use crate::outcome_log::{CsvRoundLogger, RoundLogger};
use crate::server::start_server;
use crate::settings::schema::{GameSettings, ServerSettings};
use crate::settings::{LedpanelSettings, SettingsManager};

use super::args::Args;

/// Everything started by `initialize`, owned until shutdown.
pub struct ServerContext {
    pub coordinator: SessionCoordinator,

    /// Effective settings (file plus command-line overrides)
    pub settings: LedpanelSettings,

    /// Address the HTTP server is bound to
    pub addr: SocketAddr,

    server_shutdown: CancellationToken,
    listener_shutdown: CancellationToken,
    listener: Option<JoinHandle<ListenerStats>>,
    round_log: Option<Arc<CsvRoundLogger>>,
}

impl ServerContext {
    /// Graceful shutdown - stop the listener, stop serving, flush the log.
    pub async fn shutdown(self) -> Result<()> {
        self.listener_shutdown.cancel();
        if let Some(listener) = self.listener {
            match listener.await {
                Ok(stats) => tracing::debug!("Listener finished: {:?}", stats),
                Err(e) => tracing::warn!("Listener task failed: {}", e),
            }
        }

        self.server_shutdown.cancel();

        if let Some(log) = self.round_log {
            log.flush().await;
        }

        Ok(())
    }
}

/// Initialize tracing. `--verbose` enables debug output for this crate;
/// `RUST_LOG` adds further directives.
pub fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let directive = format!("ledpanel_lib={}", log_level);
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = directive.parse() {
        filter = filter.add_directive(directive);
    }
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Load settings from `--config` (or the default location) and apply
/// command-line overrides.
pub async fn load_settings(args: &Args) -> Result<LedpanelSettings> {
    let manager = match &args.config {
        Some(path) => SettingsManager::with_path(path.clone()).await,
        None => SettingsManager::new().await,
    }
    .context("Failed to initialize settings manager")?;

    // Ensure settings file exists (creates template on first run)
    if let Err(e) = manager.ensure_settings_file().await {
        tracing::warn!("Failed to create settings template: {}", e);
    }

    tracing::debug!("Using settings file {:?}", manager.path());
    let mut settings = manager.get();
    args.apply_overrides(&mut settings);
    Ok(settings)
}

/// Build the pattern generator, rejecting a malformed level table.
pub fn build_generator(game: &GameSettings) -> Result<PatternGenerator> {
    let table = LevelTable::new(game.level_lengths.clone())
        .context("Invalid [game] level_lengths")?;
    if game.seed.is_some() {
        tracing::info!("Using fixed pattern seed {:?}", game.seed);
    }
    Ok(PatternGenerator::new(table, game.seed))
}

async fn resolve_addr(server: &ServerSettings) -> Result<SocketAddr> {
    tokio::net::lookup_host((server.host.as_str(), server.port))
        .await
        .with_context(|| format!("Failed to resolve {}:{}", server.host, server.port))?
        .next()
        .with_context(|| format!("No address for {}", server.host))
}

/// Start the full stack described by `args`.
pub async fn initialize(args: &Args) -> Result<ServerContext> {
    init_logging(args.verbose);

    let settings = load_settings(args).await?;

    let generator = build_generator(&settings.game)?;
    let model = model_from_settings(&settings.decision)?;

    let round_log = settings
        .logging
        .rounds_csv
        .as_ref()
        .map(|path| Arc::new(CsvRoundLogger::spawn(path)));
    if let Some(log) = &round_log {
        tracing::info!("Logging finalized rounds to {:?}", log.path());
    }

    let (sink, source) = match &settings.hardware.device {
        Some(device) => {
            let (sink, source) = open_device(device)
                .await
                .with_context(|| format!("Failed to open panel device {}", device))?;
            let sink: Arc<dyn HardwareSink> = Arc::new(sink);
            (sink, Some(source))
        }
        None => {
            tracing::warn!("No panel device configured; patterns will only be logged");
            let sink: Arc<dyn HardwareSink> = Arc::new(NullSink);
            (sink, None)
        }
    };

    let config = CoordinatorConfig {
        inter_round_delay: Duration::from_millis(settings.game.inter_round_delay_ms),
        decision_timeout: Duration::from_millis(settings.decision.timeout_ms),
    };
    let coordinator = SessionCoordinator::new(
        generator,
        sink,
        model,
        round_log
            .clone()
            .map(|log| log as Arc<dyn RoundLogger>),
        config,
    );

    let listener_shutdown = CancellationToken::new();
    let listener = source
        .map(|source| spawn_listener(coordinator.clone(), source, listener_shutdown.clone()));

    let addr = resolve_addr(&settings.server).await?;
    let (addr, server_shutdown) = start_server(addr, coordinator.clone()).await?;

    Ok(ServerContext {
        coordinator,
        settings,
        addr,
        server_shutdown,
        listener_shutdown,
        listener,
        round_log,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::coordinator::DecisionInput;
    use crate::game::Phase;
    use crate::outcome_log::CSV_HEADER;

    #[test]
    fn malformed_level_table_fails_fast() {
        let game = GameSettings {
            level_lengths: vec![2, 3, 4],
            ..GameSettings::default()
        };
        let err = build_generator(&game).unwrap_err();
        assert!(format!("{:#}", err).contains("Configuration fault"));
    }

    #[test]
    fn seeded_generator_is_reproducible() {
        let game = GameSettings {
            seed: Some(9),
            ..GameSettings::default()
        };
        let mut a = build_generator(&game).unwrap();
        let mut b = build_generator(&game).unwrap();
        assert_eq!(a.generate(4), b.generate(4));
    }

    #[tokio::test]
    async fn load_settings_writes_template_and_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let args = Args::parse_from([
            "ledpanel-server",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "0",
            "--seed",
            "3",
        ]);

        let settings = load_settings(&args).await.unwrap();
        assert!(path.exists());
        assert_eq!(settings.server.port, 0);
        assert_eq!(settings.game.seed, Some(3));
    }

    #[tokio::test]
    async fn initialize_without_panel_serves_and_logs_rounds() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("settings.toml");
        let csv = dir.path().join("rounds.csv");
        tokio::fs::write(
            &config,
            r#"
                [server]
                port = 0

                [game]
                seed = 1

                [decision]
                backend = "fixed"
                fixed = "SUBIR"
            "#,
        )
        .await
        .unwrap();

        let args = Args::parse_from([
            "ledpanel-server",
            "--config",
            config.to_str().unwrap(),
            "--no-device",
            "--rounds-csv",
            csv.to_str().unwrap(),
        ]);
        let ctx = initialize(&args).await.unwrap();
        assert!(ctx.listener.is_none());
        assert_ne!(ctx.addr.port(), 0);

        let c = ctx.coordinator.clone();
        c.start_game(1).await;
        c.start_turn().unwrap();
        for s in c.status().pattern {
            c.submit_button(s);
        }
        assert_eq!(c.status().phase, Phase::Success);
        let response = c.finalize_and_adjust(DecisionInput::Autonomous).await.unwrap();
        assert_eq!(response.level, 2);

        ctx.shutdown().await.unwrap();

        let contents = tokio::fs::read_to_string(&csv).await.unwrap();
        assert!(contents.starts_with(CSV_HEADER));
        assert!(contents.contains(",SUBIR,"));
    }

    #[tokio::test]
    async fn missing_panel_device_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("settings.toml");
        let args = Args::parse_from([
            "ledpanel-server",
            "--config",
            config.to_str().unwrap(),
            "--port",
            "0",
            "--device",
            "/nonexistent/ttyPANEL0",
        ]);

        let err = initialize(&args).await.err().unwrap();
        assert!(format!("{:#}", err).contains("Failed to open panel device"));
    }
}
