use kartoshka_core::{MediaInfo, OperationError, PlaylistSelection};

use crate::app::{wait_for_download, wait_for_info};
use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::render::playlist_summary;
use crate::selection::parse_selection;

pub struct PlaylistArgs<'a> {
    pub url: &'a str,
    pub quality: Option<&'a str>,
    pub format: Option<&'a str>,
    pub select: Option<&'a str>,
    pub current: bool,
}

/// Resolve a playlist, apply the selection and download it.
pub async fn execute(ctx: &mut CliContext, args: PlaylistArgs<'_>) -> Result<(), CliError> {
    let options = ctx.download_options(args.quality, args.format)?;

    ctx.view.begin_info();
    ctx.controller.request_info(args.url)?;
    let MediaInfo::Playlist(mut playlist) = wait_for_info(ctx).await? else {
        return Err(CliError::Arguments(
            "URL is not a playlist, use `kartoshka download` instead".to_string(),
        ));
    };
    print!("{}", playlist_summary(&playlist));
    println!();

    ctx.view.begin_download();
    if args.current {
        ctx.controller.download_current_video(&playlist, options)?;
    } else {
        if let Some(spec) = args.select {
            let indices = parse_selection(spec, playlist.videos.len())?;
            playlist.select_only(&indices);
        }
        let selection = PlaylistSelection::from_playlist(&playlist);
        if selection.is_empty() {
            return Err(OperationError::invalid_request("No videos selected for download").into());
        }
        println!(
            "Downloading {} of {} videos to {}",
            selection.len(),
            playlist.videos.len(),
            options.destination.display()
        );
        ctx.controller
            .start_playlist_download(args.url, options, selection)?;
    }

    let done = wait_for_download(ctx).await?;
    if let Some(summary) = done.summary {
        if summary.failed > 0 {
            tracing::warn!(failed = summary.failed, total = summary.total, "Some videos failed");
        }
    }
    Ok(())
}
