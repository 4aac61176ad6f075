//! `vlans-report` -- catalog compliance across every site, read only.

use std::fmt::Write as _;

use tabled::Tabled;

use sitesync_core::{
    DesiredState, LoadRequest, TableSource, VlanReport, VlanReportEntry, VlanStatus, loader,
    vlan_report,
};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util;

const SUBNETS_FILE: &str = "subnets.csv";

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "VLAN")]
    vlan: String,
    #[tabled(rename = "ID")]
    id: u16,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Differs")]
    fields: String,
}

fn entry_row(entry: &VlanReportEntry, color: bool) -> EntryRow {
    let tone = match entry.status {
        VlanStatus::Missing => Tone::Bad,
        VlanStatus::Mismatched => Tone::Pending,
        VlanStatus::Matched => Tone::Good,
    };
    EntryRow {
        site: entry.site.clone(),
        vlan: entry.vlan.clone(),
        id: entry.vlan_id,
        status: output::paint(&entry.status.to_string(), tone, color),
        fields: entry.fields.join(", "),
    }
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let (cfg, workspace) = util::session(global)?;
    let controller = config::connect(global, &cfg, &workspace)?;
    let catalog = util::load_catalog(&workspace)?;

    // Subnets are compared only where a site already has a subnets.csv.
    let sites_with_subnets: Vec<String> = loader::load_site_list(&workspace.site_list_path())
        .unwrap_or_default()
        .into_iter()
        .filter(|site| workspace.site_dir(site).join(SUBNETS_FILE).is_file())
        .collect();
    let desired = if sites_with_subnets.is_empty() {
        DesiredState {
            catalog,
            ..DesiredState::default()
        }
    } else {
        let request = LoadRequest {
            sites: sites_with_subnets,
            subnets: Some(TableSource::PerSite(SUBNETS_FILE.into())),
            ports: None,
        };
        loader::load_desired_state(&workspace, catalog, &request)?
    };

    let spinner = util::spinner(global, "Checking VLANs on every site".into());
    let report = vlan_report(&controller, &desired).await;
    spinner.finish_and_clear();
    let report = report?;

    let path = workspace.vlan_report_path();
    util::create_dir(&workspace.output_dir)?;
    report.write_json(&path)?;

    let color = output::should_color(global.color);
    let out = match global.output {
        OutputFormat::Table => render_table(&report, color),
        format => output::render_list(
            format,
            &report.entries,
            |e| entry_row(e, false),
            |e| format!("{}\t{}\t{}", e.site, e.vlan, e.status),
        ),
    };
    output::print_output(&out, global.quiet);

    if global.output == OutputFormat::Table && !global.quiet {
        eprintln!("Report written to {}", path.display());
    }
    Ok(())
}

/// Only the entries that need attention, then the totals.
fn render_table(report: &VlanReport, color: bool) -> String {
    let rows: Vec<EntryRow> = report
        .entries
        .iter()
        .filter(|e| e.status != VlanStatus::Matched)
        .map(|e| entry_row(e, color))
        .collect();

    let mut out = if rows.is_empty() {
        output::paint("Every site matches the VLAN catalog.", Tone::Good, color)
    } else {
        output::render_table(&rows)
    };

    let _ = write!(
        out,
        "\n\nMissing: {}  Mismatched: {}  Matched: {}",
        report.count(VlanStatus::Missing),
        report.count(VlanStatus::Mismatched),
        report.count(VlanStatus::Matched),
    );
    for error in &report.site_errors {
        let _ = write!(
            out,
            "\n{} {}: {}",
            output::paint("!", Tone::Bad, color),
            error.site,
            error.error
        );
    }
    out
}
