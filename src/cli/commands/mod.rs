mod platform_mailer;
mod reconcile;

pub use platform_mailer::{cmd_platform_mailer_set, cmd_platform_mailer_show};
pub use reconcile::cmd_reconcile;
