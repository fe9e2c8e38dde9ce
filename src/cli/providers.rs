//! `providers` command.

use super::OutputFormat;
use crate::core::router::Router;
use crate::error::Result;
use crate::render::render_status;

/// Print priority lists, credential state and remaining quota.
///
/// # Errors
///
/// Only if JSON serialization fails.
pub fn execute(router: &Router, format: OutputFormat, pretty: bool) -> Result<()> {
    let status = router.provider_status();
    println!("{}", render_status(&status, format, pretty)?);
    Ok(())
}
