use crate::app::wait_for_info;
use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::render::media_summary;

/// Print what a URL resolves to.
pub async fn execute(ctx: &mut CliContext, url: &str) -> Result<(), CliError> {
    ctx.view.begin_info();
    ctx.controller.request_info(url)?;
    let info = wait_for_info(ctx).await?;

    print!("{}", media_summary(&info));
    Ok(())
}
