pub mod config;
pub mod items;
pub mod merge;

use dayweave_core::Config;

/// The explicit `--user`, or the configured address.
pub fn resolve_user(
    explicit: Option<String>,
    config: &Config,
) -> Result<String, Box<dyn std::error::Error>> {
    explicit
        .filter(|u| !u.is_empty())
        .or_else(|| Some(config.user.email.clone()).filter(|e| !e.is_empty()))
        .ok_or_else(|| {
            "no user: pass --user or run `dayweave config set user.email <address>`".into()
        })
}
