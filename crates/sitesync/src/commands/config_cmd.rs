//! Config subcommand handlers.

use std::fmt::Write as _;

use dialoguer::{Input, Select};
use secrecy::SecretString;

use sitesync_config::{DEFAULT_BASE_URL, store_api_key};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(default) = &cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "max_retries = {}", cfg.defaults.max_retries);

    let _ = writeln!(out);
    let _ = writeln!(out, "[paths]");
    let _ = writeln!(out, "input_dir = \"{}\"", cfg.paths.input_dir.display());
    let _ = writeln!(out, "output_dir = \"{}\"", cfg.paths.output_dir.display());
    let _ = writeln!(out, "backup_dir = \"{}\"", cfg.paths.backup_dir.display());
    if let Some(cache) = &cfg.paths.cache_dir {
        let _ = writeln!(out, "cache_dir = \"{}\"", cache.display());
    }
    let _ = writeln!(
        out,
        "backup_retention_days = {}",
        cfg.paths.backup_retention_days
    );
    let _ = writeln!(
        out,
        "network_cache_ttl_days = {}",
        cfg.paths.network_cache_ttl_days
    );

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        if let Some(org) = &p.org_id {
            let _ = writeln!(out, "org_id = \"{org}\"");
        }
        let _ = writeln!(out, "base_url = \"{}\"", p.base_url);
        if p.api_key.is_some() {
            let _ = writeln!(out, "api_key = \"****\"");
        }
        if let Some(env) = &p.api_key_env {
            let _ = writeln!(out, "api_key_env = \"{env}\"");
        }
        if let Some(ca) = &p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(retries) = p.max_retries {
            let _ = writeln!(out, "max_retries = {retries}");
        }
    }

    out
}

/// The config with plaintext keys masked, for structured output.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.api_key.is_some() {
            profile.api_key = Some("****".into());
        }
    }
    cfg
}

fn save_config(cfg: &Config) -> Result<(), CliError> {
    let path = config::save_config(cfg)?;
    tracing::debug!(path = %path.display(), "config saved");
    Ok(())
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_api_key() -> Result<SecretString, CliError> {
    let key = rpassword::prompt_password("API key: ").map_err(prompt_err)?;
    if key.trim().is_empty() {
        return Err(CliError::Validation {
            field: "api_key".into(),
            reason: "API key cannot be empty".into(),
        });
    }
    Ok(SecretString::from(key.trim().to_owned()))
}

/// Apply one `config set` assignment to a profile.
fn set_profile_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    let number = |field: &str| CliError::Validation {
        field: field.into(),
        reason: "must be a whole number".into(),
    };
    match key {
        "org_id" | "org-id" => profile.org_id = Some(value),
        "base_url" | "base-url" => {
            if url::Url::parse(&value).is_err() {
                return Err(CliError::Validation {
                    field: "base_url".into(),
                    reason: format!("invalid URL: {value}"),
                });
            }
            profile.base_url = value;
        }
        "api_key" | "api-key" => profile.api_key = Some(value),
        "api_key_env" | "api-key-env" => profile.api_key_env = Some(value),
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "timeout" => profile.timeout = Some(value.parse().map_err(|_| number("timeout"))?),
        "max_retries" | "max-retries" => {
            profile.max_retries = Some(value.parse().map_err(|_| number("max_retries"))?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: org_id, base_url, api_key, \
                     api_key_env, ca_cert, timeout, max_retries"
                ),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = output::render_single(
                global.output,
                &redacted(&cfg),
                format_config_redacted,
                |_| config::config_path().display().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_profile_key(profile, &key, value)?;
            save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        ConfigCommand::SetKey => {
            let cfg = config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name: profile_name,
                });
            }
            let key = prompt_api_key()?;
            store_api_key(&profile_name, &key)?;
            eprintln!("✓ API key stored in system keyring for profile '{profile_name}'");
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: sitesync config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }
    }
}

/// Interactive wizard: one profile, key in the keyring or the file.
fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("sitesync configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let mut cfg = config::load_config()?;

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let org_id: String = Input::new()
        .with_prompt("Organization ID")
        .interact_text()
        .map_err(prompt_err)?;

    let base_url: String = Input::new()
        .with_prompt("Dashboard API URL")
        .default(DEFAULT_BASE_URL.into())
        .interact_text()
        .map_err(prompt_err)?;

    let key = prompt_api_key()?;
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
        "Read from MERAKI_API_KEY at run time",
    ];
    let selection = Select::new()
        .with_prompt("Where to keep the API key?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let mut profile = Profile {
        org_id: Some(org_id.trim().to_owned()),
        base_url: base_url.trim().to_owned(),
        ..Profile::default()
    };
    match selection {
        0 => {
            store_api_key(&profile_name, &key)?;
            eprintln!("   ✓ API key stored in system keyring");
        }
        1 => {
            use secrecy::ExposeSecret;
            profile.api_key = Some(key.expose_secret().to_owned());
        }
        _ => {}
    }

    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: sitesync sites list");
    Ok(())
}
