mod dashboard;
mod health_check;
mod home;
mod setup;
mod subscriptions;
mod unsubscribe;
mod verify;

pub use dashboard::*;
pub use health_check::*;
pub use home::*;
pub use setup::*;
pub use subscriptions::*;
pub use unsubscribe::*;
pub use verify::*;

use crate::templates::not_found_page;

/// Print the error, then each of its causes, one per line. Used for the
/// `Debug` impl of handler errors, so that logs carry the whole chain.
pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}

/// Fallback for every unmatched route
pub async fn not_found() -> actix_web::HttpResponse { not_found_page() }
