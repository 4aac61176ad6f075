//! `prep` -- lay out the input files for a new site.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use sitesync_core::{
    NetworkController, VlanCatalog, Workspace,
    loader::{DHCP_SETTINGS_FILE, FIXED_ASSIGNMENTS_FILE, RESERVED_RANGES_FILE},
};

use crate::cli::{GlobalOpts, PrepArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

const SAMPLES_DIR: &str = "samples";
const SUBNETS_FILE: &str = "subnets.csv";
const PORTS_FILE: &str = "mx_ports.csv";

const PORTS_TEMPLATE: &str = "number,type,vlan,secure\n";
const FIXED_TEMPLATE: &str = "MAC address,LAN IP,Client name\n";
const RESERVED_TEMPLATE: &str = "First IP,Last IP,Comment\n";
const DHCP_TEMPLATE: &str = r#"{
  "dnsNameservers": "upstream_dns",
  "dhcpLeaseTime": "1 day",
  "dhcpOptions": []
}
"#;

/// What `prep` did to the input directory.
#[derive(Debug, Default, Serialize)]
pub struct PrepSummary {
    pub site: String,
    pub site_dir: PathBuf,
    pub written: Vec<PathBuf>,
    /// Existing files left alone (use `--force` to replace).
    pub kept: Vec<PathBuf>,
    pub dhcp_vlans: Vec<String>,
}

impl PrepSummary {
    fn record(&mut self, path: PathBuf, written: bool) {
        if written {
            debug!(path = %path.display(), "wrote template");
            self.written.push(path);
        } else {
            self.kept.push(path);
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: PrepArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (cfg, workspace) = util::session(global)?;
    let site = args.site_name.trim().to_owned();

    let catalog = checked_catalog(&workspace)?;

    let controller = config::connect(global, &cfg, &workspace)?;
    if !controller.list_sites().await?.iter().any(|s| *s == site) {
        return Err(CliError::NotFound {
            resource_type: "Site".into(),
            identifier: site,
            list_command: "sites list".into(),
        });
    }

    if args.force
        && workspace.site_dir(&site).exists()
        && !util::confirm(
            &format!("Replace the existing input files for site '{site}'?"),
            global.yes,
        )?
    {
        return Ok(());
    }

    let summary = prepare_site(&workspace, &catalog, &site, args.force)?;
    info!(
        site = %summary.site,
        written = summary.written.len(),
        kept = summary.kept.len(),
        "site prepared"
    );

    let out = output::render_single(global.output, &summary, render_summary, |s| {
        s.written
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

/// The catalog must exist and must not be the untouched sample.
fn checked_catalog(workspace: &Workspace) -> Result<VlanCatalog, CliError> {
    let path = workspace.catalog_path();
    let catalog = util::load_catalog(workspace)?;

    let sample = workspace.input_file(SAMPLES_DIR).join("vlans.json");
    if sample.is_file() {
        let ours = std::fs::read(&path).map_err(|source| CliError::File {
            path: path.display().to_string(),
            source,
        })?;
        let theirs = std::fs::read(&sample).map_err(|source| CliError::File {
            path: sample.display().to_string(),
            source,
        })?;
        if ours == theirs {
            return Err(CliError::SampleCatalog {
                path: path.display().to_string(),
            });
        }
    }
    Ok(catalog)
}

/// Write `sites.txt` and the site's template tree.
///
/// `subnets.csv` is headed by the catalog VLAN names; every DHCP-enabled
/// VLAN gets its own directory. Files from `<input>/samples/` are used as
/// templates when present.
pub fn prepare_site(
    workspace: &Workspace,
    catalog: &VlanCatalog,
    site: &str,
    force: bool,
) -> Result<PrepSummary, CliError> {
    let site_dir = workspace.site_dir(site);
    util::create_dir(&site_dir)?;
    let samples = workspace.input_file(SAMPLES_DIR);

    let mut summary = PrepSummary {
        site: site.to_owned(),
        site_dir: site_dir.clone(),
        ..PrepSummary::default()
    };

    let site_list = workspace.site_list_path();
    util::write_new(&site_list, &format!("{site}\n"), true)?;
    summary.record(site_list, true);

    let header = catalog.names().collect::<Vec<_>>().join(",");
    let subnets = site_dir.join(SUBNETS_FILE);
    let written = util::write_new(&subnets, &format!("{header}\n"), force)?;
    summary.record(subnets, written);

    let ports = site_dir.join(PORTS_FILE);
    let written = util::write_new(&ports, &template(&samples, PORTS_FILE, PORTS_TEMPLATE), force)?;
    summary.record(ports, written);

    for def in catalog.iter() {
        if !def.dhcp_enabled {
            debug!(vlan = %def.name, "no DHCP server, no directory");
            continue;
        }
        let vlan_dir = site_dir.join(&def.name);
        util::create_dir(&vlan_dir)?;
        for (file, fallback) in [
            (DHCP_SETTINGS_FILE, DHCP_TEMPLATE),
            (FIXED_ASSIGNMENTS_FILE, FIXED_TEMPLATE),
            (RESERVED_RANGES_FILE, RESERVED_TEMPLATE),
        ] {
            let path = vlan_dir.join(file);
            let written = util::write_new(&path, &template(&samples, file, fallback), force)?;
            summary.record(path, written);
        }
        summary.dhcp_vlans.push(def.name.clone());
    }

    Ok(summary)
}

fn template(samples: &Path, file: &str, fallback: &str) -> String {
    std::fs::read_to_string(samples.join(file)).unwrap_or_else(|_| fallback.to_owned())
}

fn render_summary(summary: &PrepSummary) -> String {
    let mut lines = vec![format!("Prepared site '{}'", summary.site), String::new()];
    lines.push("Site files to edit:".into());
    lines.push(format!("  {}", summary.site_dir.join(SUBNETS_FILE).display()));
    lines.push(format!("  {}", summary.site_dir.join(PORTS_FILE).display()));
    if !summary.dhcp_vlans.is_empty() {
        lines.push(String::new());
        lines.push("DHCP files to edit (remove the directory of any VLAN the site does not use):".into());
        for vlan in &summary.dhcp_vlans {
            lines.push(format!("  {}", summary.site_dir.join(vlan).display()));
        }
    }
    if !summary.kept.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "{} existing file(s) kept; pass --force to replace them.",
            summary.kept.len()
        ));
    }
    lines.join("\n")
}
