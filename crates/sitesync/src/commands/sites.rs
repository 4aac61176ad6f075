//! Site command handlers.

use tabled::Tabled;

use sitesync_core::Network;

use crate::cli::{GlobalOpts, SitesArgs, SitesCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Network ID")]
    id: String,
    #[tabled(rename = "Products")]
    products: String,
    #[tabled(rename = "Time Zone")]
    time_zone: String,
}

impl From<&Network> for SiteRow {
    fn from(n: &Network) -> Self {
        Self {
            name: n.name.clone(),
            id: n.id.clone(),
            products: n.product_types.join(", "),
            time_zone: n.time_zone.clone().unwrap_or_default(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: SitesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (cfg, workspace) = util::session(global)?;
    match args.command {
        SitesCommand::List => {
            let controller = config::connect(global, &cfg, &workspace)?;
            let mut networks = controller.list_networks().await?;
            networks.sort_by(|a, b| a.name.cmp(&b.name));
            let out = output::render_list(global.output, &networks, |n| SiteRow::from(n), |n| {
                n.name.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SitesCommand::Refresh => {
            let cache = config::network_cache(&workspace, &cfg);
            let removed = cache.invalidate()?;
            if !global.quiet {
                if removed {
                    eprintln!("Network cache cleared: {}", cache.path().display());
                } else {
                    eprintln!("No network cache to clear");
                }
            }
            Ok(())
        }
    }
}
