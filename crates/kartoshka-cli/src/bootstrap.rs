//! Composition root: settings, backend location and the controller.

use std::path::PathBuf;
use std::sync::Arc;

use kartoshka_controller::{
    CommandEncoder, Controller, ProcessBackend, Timeouts, UiEvent, ViewState, locate_backend,
};
use kartoshka_core::{DownloadOptions, OutputFormat, Quality, Settings, validate_settings};
use tokio::sync::mpsc;

use crate::error::CliError;

/// CLI flags that override environment settings.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub backend: Option<PathBuf>,
    pub download_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Resolve settings: CLI flags, then `KARTOSHKA_*` variables, then defaults.
    pub fn into_settings(self, env: Settings) -> Result<Settings, CliError> {
        let mut settings = Settings::with_defaults();
        settings.merge(&env);
        settings.merge(&Settings {
            backend_path: self.backend,
            download_dir: self.download_dir,
            ..Settings::default()
        });
        validate_settings(&settings)?;
        Ok(settings)
    }
}

/// Everything a handler needs.
pub struct CliContext {
    pub controller: Controller,
    pub events: mpsc::UnboundedReceiver<UiEvent>,
    pub view: ViewState,
    pub settings: Settings,
}

impl CliContext {
    /// Download options from per-command flags, falling back to settings.
    pub fn download_options(
        &self,
        quality: Option<&str>,
        format: Option<&str>,
    ) -> Result<DownloadOptions, CliError> {
        let quality: Quality = match quality {
            Some(q) => q.parse()?,
            None => self.settings.effective_quality()?,
        };
        let format: OutputFormat = match format {
            Some(f) => f.parse()?,
            None => self.settings.effective_format()?,
        };
        let destination = self.settings.effective_download_dir()?;
        Ok(DownloadOptions::new(quality, format, destination))
    }
}

pub fn bootstrap(config: CliConfig) -> Result<CliContext, CliError> {
    let settings = config.into_settings(Settings::from_env()?)?;
    let backend = locate_backend(settings.backend_path.as_deref())?;
    tracing::debug!(backend = %backend.display(), "Located backend");

    let (controller, events) = Controller::new(
        Arc::new(ProcessBackend::new()),
        CommandEncoder::new(backend),
        Timeouts::from_settings(&settings),
    );

    Ok(CliContext {
        controller,
        events,
        view: ViewState::new(),
        settings,
    })
}
