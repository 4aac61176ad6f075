//! CLI configuration -- thin wrapper around `sitesync_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--org-id, --api-key, --base-url, --timeout, --input-dir, --output-dir).

use secrecy::SecretString;

use sitesync_core::{ControllerConfig, DashboardController, NetworkCache, Workspace};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use sitesync_config::{Config, Profile, config_path, load_config, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref())
}

/// The active profile with flag overrides applied.
///
/// A profile named with `--profile` must exist. The implicit default may
/// be absent, in which case flags and environment variables supply
/// everything.
pub fn effective_profile(global: &GlobalOpts, config: &Config) -> Result<(String, Profile), CliError> {
    let name = active_profile_name(global, config);
    let mut profile = match config.profiles.get(&name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                available: available_profiles(config),
                name,
            });
        }
        None => Profile::default(),
    };

    if let Some(org_id) = &global.org_id {
        profile.org_id = Some(org_id.clone());
    }
    if let Some(base_url) = &global.base_url {
        profile.base_url.clone_from(base_url);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    Ok((name, profile))
}

pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Translate config + global flags into a `ControllerConfig`.
pub fn controller_config(global: &GlobalOpts, config: &Config) -> Result<ControllerConfig, CliError> {
    let (name, profile) = effective_profile(global, config)?;
    let api_key = resolve_api_key_with_flag(&profile, &name, global)?;
    Ok(sitesync_config::controller_config(
        &profile,
        api_key,
        &config.defaults,
    )?)
}

/// Local directory layout with `--input-dir` / `--output-dir` applied.
pub fn workspace(global: &GlobalOpts, config: &Config) -> Workspace {
    let mut paths = config.paths.clone();
    if let Some(dir) = &global.input_dir {
        paths.input_dir.clone_from(dir);
    }
    if let Some(dir) = &global.output_dir {
        paths.output_dir.clone_from(dir);
    }
    paths.workspace()
}

pub fn network_cache(workspace: &Workspace, config: &Config) -> NetworkCache {
    NetworkCache::new(workspace.network_cache_path(), config.paths.network_cache_ttl())
}

/// A Dashboard-backed controller using the on-disk network cache.
pub fn connect(
    global: &GlobalOpts,
    config: &Config,
    workspace: &Workspace,
) -> Result<DashboardController, CliError> {
    let controller_config = controller_config(global, config)?;
    let cache = network_cache(workspace, config);
    Ok(DashboardController::new(&controller_config, Some(cache))?)
}

/// CLI flag first, then the shared credential chain.
fn resolve_api_key_with_flag(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<SecretString, CliError> {
    if let Some(key) = &global.api_key {
        return Ok(SecretString::from(key.clone()));
    }
    Ok(sitesync_config::resolve_api_key(profile, profile_name)?)
}
