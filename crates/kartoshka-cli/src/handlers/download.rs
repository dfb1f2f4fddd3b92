use kartoshka_controller::DownloadMode;

use crate::app::wait_for_download;
use crate::bootstrap::CliContext;
use crate::error::CliError;

pub struct DownloadArgs<'a> {
    pub url: &'a str,
    pub quality: Option<&'a str>,
    pub format: Option<&'a str>,
    pub one_shot: bool,
}

/// Download a single video.
pub async fn execute(ctx: &mut CliContext, args: DownloadArgs<'_>) -> Result<(), CliError> {
    let options = ctx.download_options(args.quality, args.format)?;
    let mode = if args.one_shot {
        DownloadMode::OneShot
    } else {
        DownloadMode::Streaming
    };

    println!(
        "Downloading {} ({}, {}) to {}",
        args.url,
        options.quality,
        options.format,
        options.destination.display()
    );
    ctx.view.begin_download();
    ctx.controller.start_download(args.url, options, mode)?;
    wait_for_download(ctx).await?;
    Ok(())
}
