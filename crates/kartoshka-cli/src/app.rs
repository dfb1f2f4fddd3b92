//! The UI loop: drains controller events into the view and the terminal.

use kartoshka_controller::{DownloadDone, Notice, UiEvent};
use kartoshka_core::{MediaInfo, OperationError};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::render::ProgressRenderer;

fn channel_closed() -> CliError {
    CliError::Operation(OperationError::fault("Controller stopped unexpectedly"))
}

/// Wait for the metadata lookup started by `request_info`.
pub async fn wait_for_info(ctx: &mut CliContext) -> Result<MediaInfo, CliError> {
    let spinner = ProgressRenderer::spinner("Loading video information...");

    loop {
        let event = ctx.events.recv().await.ok_or_else(channel_closed)?;
        match event {
            UiEvent::InfoLoaded(info) => {
                spinner.finish();
                ctx.view.apply(UiEvent::InfoLoaded(info.clone()));
                return Ok(info);
            }
            UiEvent::InfoFailed(e) => {
                spinner.finish();
                ctx.view.apply(UiEvent::InfoFailed(e.clone()));
                return Err(e.into());
            }
            UiEvent::Diagnostic(line) => spinner.println(&line),
            other => {
                ctx.view.apply(other);
            }
        }
    }
}

/// Drive the running download to its end. Ctrl-C cancels it, a second
/// Ctrl-C stops waiting.
pub async fn wait_for_download(ctx: &mut CliContext) -> Result<DownloadDone, CliError> {
    let renderer = ProgressRenderer::new("Starting...");
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancelling = false;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                if cancelling || !ctx.controller.cancel() {
                    renderer.finish();
                    return Err(OperationError::fault("Download cancelled").into());
                }
                cancelling = true;
                renderer.println("Cancelling download...");
                ctrl_c.set(tokio::signal::ctrl_c());
            }
            event = ctx.events.recv() => {
                let event = event.ok_or_else(channel_closed)?;
                match &event {
                    UiEvent::Progress(progress) => renderer.update(progress),
                    UiEvent::Diagnostic(line) => renderer.println(line),
                    _ => {}
                }

                let result = match &event {
                    UiEvent::DownloadFinished(result) => Some(result.clone()),
                    _ => None,
                };
                let notice = ctx.view.apply(event);

                if let Some(result) = result {
                    renderer.finish();
                    if let Some(Notice::Success(message)) = notice {
                        println!("{message}");
                    }
                    tracing::debug!(button = ?ctx.view.button, "Download finished");
                    return result.map_err(CliError::from);
                }
            }
        }
    }
}
