//! `sync` -- reconcile sites against the catalog and site tables.

use std::fmt::Write as _;
use std::path::Path;

use tabled::Tabled;
use tracing::info;

use sitesync_core::{
    FileBackupStore, ItemResult, ItemStatus, LoadRequest, Orchestrator, ReconcileOptions,
    RunOptions, RunReport, SiteReport, SiteState, TableSource, Workspace, loader,
};

use crate::cli::{GlobalOpts, OutputFormat, SyncArgs};
use crate::config;
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Created")]
    created: usize,
    #[tabled(rename = "Updated")]
    updated: usize,
    #[tabled(rename = "Matched")]
    matched: usize,
    #[tabled(rename = "Would Apply")]
    would_apply: usize,
    #[tabled(rename = "Skipped")]
    skipped: usize,
    #[tabled(rename = "Failed")]
    failed: usize,
}

impl SiteRow {
    fn new(site: &SiteReport, color: bool) -> Self {
        let tone = match site.state {
            SiteState::Failed => Tone::Bad,
            _ if site.counts.failed > 0 => Tone::Pending,
            _ => Tone::Good,
        };
        Self {
            site: site.site.clone(),
            state: output::paint(&site.state.to_string(), tone, color),
            created: site.counts.created,
            updated: site.counts.updated,
            matched: site.counts.matched,
            would_apply: site.counts.would_apply,
            skipped: site.counts.skipped,
            failed: site.counts.failed,
        }
    }
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "Item")]
    subject: String,
    #[tabled(rename = "Delta")]
    kind: String,
    #[tabled(rename = "Fields")]
    fields: String,
    #[tabled(rename = "Result")]
    status: String,
}

impl ItemRow {
    fn new(site: &str, item: &ItemResult, color: bool) -> Self {
        let (label, tone) = match &item.status {
            ItemStatus::Applied => ("applied".to_owned(), Tone::Good),
            ItemStatus::WouldApply => ("would apply".to_owned(), Tone::Pending),
            ItemStatus::Unchanged => ("unchanged".to_owned(), Tone::Muted),
            ItemStatus::NotQueued => ("not queued".to_owned(), Tone::Muted),
            ItemStatus::Failed { reason, .. } => (format!("failed: {reason}"), Tone::Bad),
        };
        Self {
            site: site.to_owned(),
            subject: item.subject.clone(),
            kind: item.kind.to_string(),
            fields: item.fields.join(", "),
            status: output::paint(&label, tone, color),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: SyncArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (cfg, workspace) = util::session(global)?;
    let controller = config::connect(global, &cfg, &workspace)?;

    let request = load_request(&args, &workspace)?;
    if request.sites.is_empty() {
        return Err(CliError::Validation {
            field: "site-names-file".into(),
            reason: "no site names listed".into(),
        });
    }
    let catalog = util::load_catalog(&workspace)?;
    let desired = loader::load_desired_state(&workspace, catalog, &request)?;

    let backups = FileBackupStore::new(&workspace.backup_dir, cfg.paths.backup_retention_days);
    let options = RunOptions {
        reconcile: ReconcileOptions {
            add_missing: args.add_missing,
            update_existing: args.update_existing,
        },
        dry_run: args.dry_run,
    };
    info!(
        sites = request.sites.len(),
        dry_run = options.dry_run,
        add_missing = options.reconcile.add_missing,
        update_existing = options.reconcile.update_existing,
        "starting sync"
    );

    let spinner = util::spinner(
        global,
        format!("Reconciling {} site(s)", request.sites.len()),
    );
    let report = Orchestrator::new(&controller, &backups, &desired, options)
        .run(&request.sites)
        .await;
    spinner.finish_and_clear();

    let report_path = workspace.run_report_path();
    util::create_dir(&workspace.output_dir)?;
    report.write_json(&report_path)?;

    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        &report,
        |r| render_run_table(r, color),
        |r| {
            r.sites
                .iter()
                .map(|s| format!("{}\t{}", s.site, s.state))
                .collect::<Vec<_>>()
                .join("\n")
        },
    );
    output::print_output(&out, global.quiet);

    if report.has_failures() {
        let failed = report
            .sites
            .iter()
            .filter(|s| s.is_failed() || s.counts.failed > 0)
            .count();
        return Err(CliError::SitesFailed {
            failed,
            total: report.sites.len(),
            report: report_path.display().to_string(),
        });
    }
    if global.output == OutputFormat::Table && !global.quiet {
        eprintln!("Report written to {}", report_path.display());
    }
    Ok(())
}

/// Turn the flags into what the loader should read.
fn load_request(args: &SyncArgs, workspace: &Workspace) -> Result<LoadRequest, CliError> {
    let sites = match (&args.site_name, &args.site_names_file) {
        (Some(name), _) => vec![name.trim().to_owned()],
        (None, Some(file)) => read_site_list(&workspace.input_file(file))?,
        (None, None) => {
            return Err(CliError::Validation {
                field: "site-name".into(),
                reason: "use --site-name or --site-names-file".into(),
            });
        }
    };

    let source = |file: &String| {
        if args.multi_site {
            TableSource::Wide(workspace.input_file(file))
        } else {
            TableSource::PerSite(file.clone())
        }
    };

    Ok(LoadRequest {
        sites,
        subnets: args.vlans.as_ref().map(source),
        ports: args.ports.as_ref().map(source),
    })
}

fn read_site_list(path: &Path) -> Result<Vec<String>, CliError> {
    if !path.is_file() {
        return Err(CliError::Input {
            message: format!("site list {} does not exist", path.display()),
        });
    }
    Ok(loader::load_site_list(path)?)
}

fn render_run_table(report: &RunReport, color: bool) -> String {
    let sites: Vec<SiteRow> = report.sites.iter().map(|s| SiteRow::new(s, color)).collect();
    let mut out = output::render_table(&sites);

    let items: Vec<ItemRow> = report
        .sites
        .iter()
        .flat_map(|s| {
            s.items
                .iter()
                .filter(|i| i.status != ItemStatus::Unchanged)
                .map(|i| ItemRow::new(&s.site, i, color))
        })
        .collect();
    if !items.is_empty() {
        let _ = write!(out, "\n\n{}", output::render_table(&items));
    }

    for site in report.sites.iter().filter(|s| !s.errors.is_empty()) {
        let _ = write!(out, "\n\n{}:", site.site);
        for error in &site.errors {
            let _ = write!(out, "\n  - {error}");
        }
    }

    if report.dry_run {
        let _ = write!(
            out,
            "\n\n{}",
            output::paint("Dry run: no changes were made.", Tone::Muted, color)
        );
    }
    out
}
