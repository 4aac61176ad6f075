// ── Desired-state loader ──
//
// Reads the VLAN catalog, subnet and port tables, and per-VLAN DHCP
// directories into validated model types. A broken catalog or multi-site
// table is fatal for the run; a problem inside one site's rows or files
// only marks that site invalid.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Workspace;
use crate::error::{CoreError, ValidationError};
use crate::model::{
    DesiredState, DhcpOptionSpec, DhcpPolicy, DhcpSettings, MacAddress, PortSpec, PortType,
    Reservation, ReservedRange, SiteDesired, SubnetAssignment, SubnetPrefix, VlanCatalog,
    VlanDefinition,
};

pub const DHCP_SETTINGS_FILE: &str = "dhcp.json";
pub const FIXED_ASSIGNMENTS_FILE: &str = "fixed.csv";
pub const RESERVED_RANGES_FILE: &str = "reserved.csv";

const SITE_COLUMN: &str = "site_name";

/// Where a per-site table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    /// One file covering many sites, keyed by a leading `site_name` column.
    Wide(PathBuf),
    /// `sites/<site>/<file>` under the input directory, one per site.
    PerSite(String),
}

/// What to load for a run.
#[derive(Debug, Clone, Default)]
pub struct LoadRequest {
    pub sites: Vec<String>,
    pub subnets: Option<TableSource>,
    pub ports: Option<TableSource>,
}

// ── Entry points ─────────────────────────────────────────────────────

/// Load `vlans.json`. Any problem here is fatal for the run.
pub fn load_catalog(path: &Path) -> Result<VlanCatalog, CoreError> {
    let text = read_input(path)?;
    let catalog = parse_catalog(&text, &path.display().to_string())?;
    info!(path = %path.display(), vlans = catalog.len(), "loaded VLAN catalog");
    Ok(catalog)
}

/// Load a site list: one name per line, blank lines ignored.
pub fn load_site_list(path: &Path) -> Result<Vec<String>, CoreError> {
    let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
        path: path.to_owned(),
        source,
    })?;
    Ok(parse_site_list(&text))
}

pub fn parse_site_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Load everything `request` names for its sites.
pub fn load_desired_state(
    workspace: &Workspace,
    catalog: VlanCatalog,
    request: &LoadRequest,
) -> Result<DesiredState, CoreError> {
    let mut state = DesiredState {
        catalog,
        ..DesiredState::default()
    };
    for site in &request.sites {
        state.sites.entry(site.clone()).or_default();
    }

    if let Some(source) = &request.subnets {
        let table = match source {
            TableSource::Wide(path) => {
                let text = read_input(path)?;
                parse_wide_subnets(&text, &path.display().to_string(), &state.catalog)?
            }
            TableSource::PerSite(file) => {
                let mut table = SiteTable::default();
                for site in &request.sites {
                    let path = workspace.site_dir(site).join(file);
                    match read_input(&path) {
                        Ok(text) => {
                            let rows = parse_site_subnets(
                                &text,
                                &path.display().to_string(),
                                &state.catalog,
                            );
                            table.extend(site, rows);
                        }
                        Err(e) => table.reject(site, e),
                    }
                }
                table
            }
        };
        table.merge_into(&mut state, &request.sites, |site, rows| site.subnets = rows);
    }

    if let Some(source) = &request.ports {
        let table = match source {
            TableSource::Wide(path) => {
                let text = read_input(path)?;
                parse_ports(&text, &path.display().to_string(), None, &state.catalog)?
            }
            TableSource::PerSite(file) => {
                let mut table = SiteTable::default();
                for site in &request.sites {
                    let path = workspace.site_dir(site).join(file);
                    let parsed = read_input(&path).and_then(|text| {
                        parse_ports(&text, &path.display().to_string(), Some(site), &state.catalog)
                    });
                    match parsed {
                        Ok(site_table) => table.absorb(site_table),
                        Err(e) => table.reject(site, e),
                    }
                }
                table
            }
        };
        for site in &request.sites {
            if let Some(desired) = state.sites.get_mut(site) {
                desired.ports = Some(Vec::new());
            }
        }
        table.merge_into(&mut state, &request.sites, |site, rows| {
            site.ports = Some(rows);
        });
    }

    if request.subnets.is_some() {
        for site in &request.sites {
            load_site_dhcp(workspace, site, &mut state);
        }
    }

    for (site, errors) in &state.invalid {
        debug!(site = %site, errors = errors.len(), "site input rejected");
    }
    Ok(state)
}

// ── Catalog ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CatalogEntry {
    #[serde(rename = "ID")]
    id: IdValue,
    #[serde(rename = "VPN Mode", default)]
    vpn_mode: Option<Toggle>,
    #[serde(rename = "DHCP Server", default)]
    dhcp_server: Option<Toggle>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Number(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Toggle {
    Bool(bool),
    Text(String),
}

impl Toggle {
    fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "enabled" | "true" | "yes" => Some(true),
                "disabled" | "false" | "no" => Some(false),
                _ => None,
            },
        }
    }
}

pub fn parse_catalog(text: &str, source_name: &str) -> Result<VlanCatalog, ValidationError> {
    let malformed = |reason: String| ValidationError::Malformed {
        source_name: source_name.to_owned(),
        reason,
    };
    let raw: IndexMap<String, CatalogEntry> =
        serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;

    let mut definitions = Vec::with_capacity(raw.len());
    for (name, entry) in raw {
        let id = match entry.id {
            IdValue::Number(n) => n,
            IdValue::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| malformed(format!("VLAN '{name}': ID '{s}' is not a number")))?,
        };
        let id = u16::try_from(id)
            .ok()
            .filter(|id| (1..=4094).contains(id))
            .ok_or_else(|| ValidationError::InvalidVlanId {
                name: name.clone(),
                id,
            })?;
        let toggle = |value: Option<Toggle>, field: &str, default: bool| match value {
            None => Ok(default),
            Some(t) => t
                .as_bool()
                .ok_or_else(|| malformed(format!("VLAN '{name}': invalid {field} value"))),
        };
        let vpn_enabled = toggle(entry.vpn_mode, "VPN Mode", false)?;
        let dhcp_enabled = toggle(entry.dhcp_server, "DHCP Server", true)?;
        definitions.push(VlanDefinition {
            name,
            id,
            vpn_enabled,
            dhcp_enabled,
        });
    }
    VlanCatalog::new(definitions)
}

// ── Per-site accumulation ────────────────────────────────────────────

/// Rows and row errors grouped by site.
#[derive(Debug)]
pub struct SiteTable<T> {
    rows: BTreeMap<String, Vec<T>>,
    errors: BTreeMap<String, Vec<ValidationError>>,
}

impl<T> Default for SiteTable<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }
}

impl<T> SiteTable<T> {
    fn push(&mut self, site: &str, row: Result<T, ValidationError>) {
        match row {
            Ok(row) => self.rows.entry(site.to_owned()).or_default().push(row),
            Err(e) => self.reject(site, e),
        }
    }

    fn extend(&mut self, site: &str, rows: Vec<Result<T, ValidationError>>) {
        self.rows.entry(site.to_owned()).or_default();
        for row in rows {
            self.push(site, row);
        }
    }

    fn reject(&mut self, site: &str, error: ValidationError) {
        self.errors.entry(site.to_owned()).or_default().push(error);
    }

    fn absorb(&mut self, other: Self) {
        for (site, rows) in other.rows {
            self.rows.entry(site).or_default().extend(rows);
        }
        for (site, errors) in other.errors {
            self.errors.entry(site).or_default().extend(errors);
        }
    }

    pub fn rows(&self, site: &str) -> &[T] {
        self.rows.get(site).map_or(&[], Vec::as_slice)
    }

    pub fn errors(&self, site: &str) -> &[ValidationError] {
        self.errors.get(site).map_or(&[], Vec::as_slice)
    }

    /// Move rows for the requested sites into `state`; rows for other
    /// sites are dropped.
    fn merge_into(
        mut self,
        state: &mut DesiredState,
        sites: &[String],
        mut apply: impl FnMut(&mut SiteDesired, Vec<T>),
    ) {
        for site in sites {
            for error in self.errors.remove(site).unwrap_or_default() {
                state.reject(site, error);
            }
            if let Some(rows) = self.rows.remove(site) {
                if let Some(desired) = state.sites.get_mut(site) {
                    apply(desired, rows);
                }
            }
        }
    }
}

// ── Subnets ──────────────────────────────────────────────────────────

/// Parse the multi-site subnet table: `site_name,<vlan>,<vlan>,...`.
pub fn parse_wide_subnets(
    text: &str,
    source_name: &str,
    catalog: &VlanCatalog,
) -> Result<SiteTable<SubnetAssignment>, ValidationError> {
    let mut reader = csv_reader(text);
    let headers = read_headers(&mut reader, source_name)?;
    let site_col = column(&headers, SITE_COLUMN, source_name)?;

    let mut table: SiteTable<SubnetAssignment> = SiteTable::default();
    for record in reader.records() {
        let record = record.map_err(|e| malformed(source_name, &e))?;
        let Some(site) = record.get(site_col).filter(|s| !s.is_empty()) else {
            continue;
        };
        let cells = headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(i, _)| *i != site_col)
            .map(|(_, cell)| cell);
        let seen: BTreeSet<u16> = table.rows(site).iter().map(|s| s.vlan_id).collect();
        for row in subnet_cells(cells, catalog, seen) {
            table.push(site, row);
        }
    }
    Ok(table)
}

/// Parse a single site's subnet table. Headers are VLAN names; only the
/// first data row is used.
pub fn parse_site_subnets(
    text: &str,
    source_name: &str,
    catalog: &VlanCatalog,
) -> Vec<Result<SubnetAssignment, ValidationError>> {
    let mut reader = csv_reader(text);
    let headers = match read_headers(&mut reader, source_name) {
        Ok(h) => h,
        Err(e) => return vec![Err(e)],
    };
    let record = match reader.records().next() {
        Some(Ok(record)) => record,
        Some(Err(e)) => return vec![Err(malformed(source_name, &e))],
        None => {
            return vec![Err(ValidationError::Malformed {
                source_name: source_name.to_owned(),
                reason: "no data row after the header".into(),
            })];
        }
    };
    subnet_cells(headers.iter().zip(record.iter()), catalog, BTreeSet::new())
}

fn subnet_cells<'a>(
    cells: impl Iterator<Item = (&'a str, &'a str)>,
    catalog: &VlanCatalog,
    mut seen: BTreeSet<u16>,
) -> Vec<Result<SubnetAssignment, ValidationError>> {
    cells
        .filter(|(_, value)| !value.is_empty())
        .map(|(vlan, value)| {
            let def = catalog.get(vlan).ok_or_else(|| ValidationError::UnknownVlanName {
                name: vlan.to_owned(),
            })?;
            let prefix: SubnetPrefix = value.parse()?;
            if !seen.insert(def.id) {
                return Err(ValidationError::DuplicateSubnet {
                    vlan: def.name.clone(),
                });
            }
            Ok(SubnetAssignment {
                vlan_name: def.name.clone(),
                vlan_id: def.id,
                prefix,
            })
        })
        .collect()
}

// ── Ports ────────────────────────────────────────────────────────────

/// Parse a port table. With `site` set the table belongs to that site and
/// has no `site_name` column.
pub fn parse_ports(
    text: &str,
    source_name: &str,
    site: Option<&str>,
    catalog: &VlanCatalog,
) -> Result<SiteTable<PortSpec>, ValidationError> {
    let mut reader = csv_reader(text);
    let headers = read_headers(&mut reader, source_name)?;
    let site_col = match site {
        Some(_) => None,
        None => Some(column(&headers, SITE_COLUMN, source_name)?),
    };
    let number_col = column(&headers, "number", source_name)?;
    let type_col = column(&headers, "type", source_name)?;
    let vlan_col = column(&headers, "vlan", source_name)?;
    let secure_col = column(&headers, "secure", source_name)?;

    let mut table = SiteTable::default();
    let mut seen: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
    for record in reader.records() {
        let record = record.map_err(|e| malformed(source_name, &e))?;
        let row_site = match (site, site_col) {
            (Some(site), _) => site,
            (None, Some(col)) => match record.get(col).filter(|s| !s.is_empty()) {
                Some(s) => s,
                None => continue,
            },
            (None, None) => continue,
        };
        let cell = |col: usize| record.get(col).unwrap_or_default();
        let parsed = parse_port_row(
            cell(number_col),
            cell(type_col),
            cell(vlan_col),
            cell(secure_col),
            source_name,
            catalog,
        )
        .and_then(|spec| {
            if seen
                .entry(row_site.to_owned())
                .or_default()
                .insert(spec.number)
            {
                Ok(spec)
            } else {
                Err(ValidationError::DuplicatePort { port: spec.number })
            }
        });
        table.push(row_site, parsed);
    }
    if let Some(site) = site {
        table.rows.entry(site.to_owned()).or_default();
    }
    Ok(table)
}

fn parse_port_row(
    number: &str,
    port_type: &str,
    vlan: &str,
    secure: &str,
    source_name: &str,
    catalog: &VlanCatalog,
) -> Result<PortSpec, ValidationError> {
    let number: u32 = number.parse().map_err(|_| ValidationError::Malformed {
        source_name: source_name.to_owned(),
        reason: format!("invalid port number '{number}'"),
    })?;
    let port_type: PortType = port_type
        .parse()
        .map_err(|_| ValidationError::InvalidPortType {
            port: number.to_string(),
            value: port_type.to_owned(),
        })?;
    let vlan_id: u16 = vlan.parse().map_err(|_| ValidationError::Malformed {
        source_name: source_name.to_owned(),
        reason: format!("port {number}: invalid VLAN ID '{vlan}'"),
    })?;
    if catalog.by_id(vlan_id).is_none() {
        return Err(ValidationError::UnknownVlanId {
            port: number,
            vlan_id,
        });
    }
    let secure = match (secure.to_ascii_lowercase().as_str(), port_type) {
        ("y", _) => true,
        ("n", _) | ("", PortType::Trunk) => false,
        _ => {
            return Err(ValidationError::InvalidSecureFlag {
                port: number.to_string(),
                value: secure.to_owned(),
            });
        }
    };
    Ok(PortSpec {
        number,
        port_type,
        vlan_id,
        secure,
    })
}

// ── DHCP ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DhcpFile {
    #[serde(default)]
    dns_nameservers: Option<String>,
    #[serde(default)]
    dhcp_options: Vec<DhcpOptionSpec>,
    #[serde(default)]
    dhcp_lease_time: Option<String>,
}

#[derive(Deserialize)]
struct FixedRow {
    #[serde(rename = "MAC address")]
    mac: String,
    #[serde(rename = "LAN IP")]
    ip: String,
    #[serde(rename = "Client name", default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct ReservedRow {
    #[serde(rename = "First IP")]
    first: String,
    #[serde(rename = "Last IP")]
    last: String,
    #[serde(rename = "Comment", default)]
    comment: Option<String>,
}

/// Scan `sites/<site>/<vlan>/` for every DHCP-enabled catalog VLAN.
fn load_site_dhcp(workspace: &Workspace, site: &str, state: &mut DesiredState) {
    let site_dir = workspace.site_dir(site);
    let mut policies = Vec::new();
    let mut errors = Vec::new();

    for def in state.catalog.iter().filter(|d| d.dhcp_enabled) {
        let vlan_dir = site_dir.join(&def.name);
        if !vlan_dir.join(DHCP_SETTINGS_FILE).is_file() {
            continue;
        }
        let assigned = state
            .sites
            .get(site)
            .is_some_and(|s| s.subnet_for(def.id).is_some());
        if !assigned {
            errors.push(ValidationError::DhcpWithoutSubnet {
                vlan: def.name.clone(),
            });
            continue;
        }
        match load_dhcp_dir(&vlan_dir) {
            Ok(settings) => policies.push(DhcpPolicy {
                vlan_name: def.name.clone(),
                vlan_id: def.id,
                settings,
            }),
            Err(e) => errors.push(e),
        }
    }

    for error in errors {
        state.reject(site, error);
    }
    if let Some(desired) = state.sites.get_mut(site) {
        desired.dhcp = policies;
    }
}

/// Load one VLAN's DHCP directory. `dhcp.json` must exist; the CSV files
/// are optional.
pub fn load_dhcp_dir(dir: &Path) -> Result<DhcpSettings, ValidationError> {
    let json_path = dir.join(DHCP_SETTINGS_FILE);
    let file: DhcpFile = serde_json::from_str(&read_input(&json_path)?).map_err(|e| {
        ValidationError::Malformed {
            source_name: json_path.display().to_string(),
            reason: e.to_string(),
        }
    })?;

    let mut settings = DhcpSettings {
        dns_nameservers: file.dns_nameservers,
        lease_time: file.dhcp_lease_time,
        ..DhcpSettings::default()
    };
    for option in file.dhcp_options {
        settings.options.insert(option.code.clone(), option);
    }

    let fixed_path = dir.join(FIXED_ASSIGNMENTS_FILE);
    if fixed_path.is_file() {
        let source_name = fixed_path.display().to_string();
        let mut macs = BTreeSet::new();
        for row in csv_rows::<FixedRow>(&read_input(&fixed_path)?, &source_name)? {
            let ip = parse_ip(&row.ip)?;
            let mac: MacAddress = row.mac.parse()?;
            // The Dashboard keys fixed assignments by MAC.
            if !macs.insert(mac) {
                return Err(ValidationError::Malformed {
                    source_name,
                    reason: format!("{mac} is assigned more than once"),
                });
            }
            let previous = settings.reservations.insert(
                ip,
                Reservation {
                    mac,
                    name: row.name.filter(|n| !n.is_empty()),
                },
            );
            if previous.is_some() {
                return Err(ValidationError::Malformed {
                    source_name,
                    reason: format!("{ip} is reserved more than once"),
                });
            }
        }
    }

    let reserved_path = dir.join(RESERVED_RANGES_FILE);
    if reserved_path.is_file() {
        let source_name = reserved_path.display().to_string();
        for row in csv_rows::<ReservedRow>(&read_input(&reserved_path)?, &source_name)? {
            let start = parse_ip(&row.first)?;
            let end = parse_ip(&row.last)?;
            if u32::from(end) < u32::from(start) {
                return Err(ValidationError::Malformed {
                    source_name,
                    reason: format!("range {start}-{end} ends before it starts"),
                });
            }
            settings.reserved_ranges.insert(
                start,
                ReservedRange {
                    end,
                    comment: row.comment.filter(|c| !c.is_empty()),
                },
            );
        }
    }

    Ok(settings)
}

// ── Helpers ──────────────────────────────────────────────────────────

fn read_input(path: &Path) -> Result<String, ValidationError> {
    std::fs::read_to_string(path).map_err(|e| ValidationError::Malformed {
        source_name: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn csv_reader(text: &str) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes())
}

fn csv_rows<T: serde::de::DeserializeOwned>(
    text: &str,
    source_name: &str,
) -> Result<Vec<T>, ValidationError> {
    csv_reader(text)
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| malformed(source_name, &e))
}

fn read_headers(
    reader: &mut csv::Reader<&[u8]>,
    source_name: &str,
) -> Result<StringRecord, ValidationError> {
    reader
        .headers()
        .cloned()
        .map_err(|e| malformed(source_name, &e))
}

fn column(headers: &StringRecord, name: &str, source_name: &str) -> Result<usize, ValidationError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| ValidationError::MissingColumn {
            source_name: source_name.to_owned(),
            column: name.to_owned(),
        })
}

fn parse_ip(raw: &str) -> Result<Ipv4Addr, ValidationError> {
    raw.trim().parse().map_err(|_| ValidationError::InvalidIp {
        value: raw.to_owned(),
    })
}

fn malformed(source_name: &str, err: &csv::Error) -> ValidationError {
    ValidationError::Malformed {
        source_name: source_name.to_owned(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CATALOG: &str = r#"{
        "Data":  {"ID": 10, "VPN Mode": "enabled"},
        "Voice": {"ID": "20", "VPN Mode": "disabled", "DHCP Server": true},
        "Guest": {"ID": 2, "VPN Mode": false, "DHCP Server": false}
    }"#;

    fn catalog() -> VlanCatalog {
        parse_catalog(CATALOG, "vlans.json").unwrap()
    }

    #[test]
    fn catalog_parses_mixed_shapes() {
        let catalog = catalog();
        let data = catalog.get("Data").unwrap();
        assert_eq!(data.id, 10);
        assert!(data.vpn_enabled);
        assert!(data.dhcp_enabled);
        assert_eq!(catalog.get("Voice").unwrap().id, 20);
        assert!(!catalog.get("Guest").unwrap().dhcp_enabled);
        assert_eq!(catalog.names().collect::<Vec<_>>(), ["Data", "Voice", "Guest"]);
    }

    #[test]
    fn catalog_rejects_out_of_range_id() {
        let err = parse_catalog(r#"{"Big": {"ID": 5000}}"#, "vlans.json").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidVlanId {
                name: "Big".into(),
                id: 5000
            }
        );
    }

    #[test]
    fn catalog_rejects_bad_vpn_mode() {
        assert!(parse_catalog(r#"{"A": {"ID": 3, "VPN Mode": "maybe"}}"#, "v").is_err());
    }

    #[test]
    fn site_list_skips_blanks() {
        assert_eq!(
            parse_site_list("Branch 1\n\n  Branch 2  \n"),
            ["Branch 1", "Branch 2"]
        );
    }

    #[test]
    fn wide_subnets_group_by_site() {
        let text = "site_name,Data,Voice\nBranch 1,10.1.10.1/24,\nBranch 2,10.2.10.1/24,10.2.20.1/24\n";
        let table = parse_wide_subnets(text, "subnets.csv", &catalog()).unwrap();
        assert_eq!(table.rows("Branch 1").len(), 1);
        let b2 = table.rows("Branch 2");
        assert_eq!(b2.len(), 2);
        assert_eq!(b2[1].vlan_id, 20);
        assert_eq!(b2[1].prefix.to_string(), "10.2.20.1/24");
    }

    #[test]
    fn wide_subnets_reject_unknown_vlan_per_site() {
        let text = "site_name,Data,Printers\nBranch 1,10.1.10.1/24,10.1.50.1/24\nBranch 2,10.2.10.1/24,\n";
        let table = parse_wide_subnets(text, "subnets.csv", &catalog()).unwrap();
        assert_eq!(
            table.errors("Branch 1"),
            [ValidationError::UnknownVlanName {
                name: "Printers".into()
            }]
        );
        assert!(table.errors("Branch 2").is_empty());
    }

    #[test]
    fn duplicate_site_rows_are_duplicate_subnets() {
        let text = "site_name,Data\nBranch 1,10.1.10.1/24\nBranch 1,10.9.10.1/24\n";
        let table = parse_wide_subnets(text, "subnets.csv", &catalog()).unwrap();
        assert_eq!(
            table.errors("Branch 1"),
            [ValidationError::DuplicateSubnet { vlan: "Data".into() }]
        );
    }

    #[test]
    fn wide_subnets_require_site_column() {
        let err = parse_wide_subnets("Data\n10.1.10.1/24\n", "subnets.csv", &catalog()).unwrap_err();
        assert!(matches!(err, ValidationError::MissingColumn { .. }));
    }

    #[test]
    fn site_subnets_use_first_row() {
        let text = "Data,Voice,Guest\n10.1.10.1/24,,10.1.2.1/24\n10.9.9.9/24,,\n";
        let rows: Vec<_> = parse_site_subnets(text, "s", &catalog())
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        let ids: Vec<u16> = rows.iter().map(|r| r.vlan_id).collect();
        assert_eq!(ids, [10, 2]);
    }

    #[test]
    fn site_subnets_without_rows_fail() {
        let rows = parse_site_subnets("Data,Voice\n", "s", &catalog());
        assert!(matches!(rows.as_slice(), [Err(ValidationError::Malformed { .. })]));
    }

    #[test]
    fn bad_cidr_is_reported() {
        let rows = parse_site_subnets("Data\n10.1.10.1/40\n", "s", &catalog());
        assert!(matches!(rows.as_slice(), [Err(ValidationError::InvalidCidr { .. })]));
    }

    #[test]
    fn ports_parse_with_validation() {
        let text = "site_name,number,type,vlan,secure\n\
                    Branch 1,3,access,10,y\n\
                    Branch 1,4,TRUNK,10,y\n\
                    Branch 1,5,trunk,10,\n\
                    Branch 2,3,access,99,n\n\
                    Branch 2,4,hybrid,10,n\n\
                    Branch 2,6,access,10,maybe\n";
        let table = parse_ports(text, "ports.csv", None, &catalog()).unwrap();
        let b1 = table.rows("Branch 1");
        assert_eq!(b1.len(), 3);
        assert_eq!(b1[1].port_type, PortType::Trunk);
        assert!(!b1[2].secure);
        assert!(table.errors("Branch 1").is_empty());

        let errors = table.errors("Branch 2");
        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors[0],
            ValidationError::UnknownVlanId {
                port: 3,
                vlan_id: 99
            }
        );
        assert!(matches!(errors[1], ValidationError::InvalidPortType { .. }));
        assert!(matches!(errors[2], ValidationError::InvalidSecureFlag { .. }));
    }

    #[test]
    fn duplicate_port_numbers_rejected() {
        let text = "number,type,vlan,secure\n7,access,10,n\n7,access,20,n\n";
        let table = parse_ports(text, "ports.csv", Some("Branch 1"), &catalog()).unwrap();
        assert_eq!(table.rows("Branch 1").len(), 1);
        assert_eq!(
            table.errors("Branch 1"),
            [ValidationError::DuplicatePort { port: 7 }]
        );
    }

    #[test]
    fn dhcp_directory_loads_all_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DHCP_SETTINGS_FILE),
            r#"{"dnsNameservers": "upstream_dns", "dhcpLeaseTime": "1 day",
                "dhcpOptions": [{"code": "42", "type": "ip", "value": "10.0.0.1"}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join(FIXED_ASSIGNMENTS_FILE),
            "MAC address,LAN IP,Client name\nAABB.CCDD.EEFF,10.0.0.5,printer\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join(RESERVED_RANGES_FILE),
            "First IP,Last IP,Comment\n10.0.0.200,10.0.0.250,\n",
        )
        .unwrap();

        let settings = load_dhcp_dir(dir.path()).unwrap();
        assert_eq!(settings.dns_nameservers.as_deref(), Some("upstream_dns"));
        assert_eq!(settings.options["42"].value, "10.0.0.1");
        let reservation = &settings.reservations[&Ipv4Addr::new(10, 0, 0, 5)];
        assert_eq!(reservation.mac.to_string(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(reservation.name.as_deref(), Some("printer"));
        let range = &settings.reserved_ranges[&Ipv4Addr::new(10, 0, 0, 200)];
        assert_eq!(range.end, Ipv4Addr::new(10, 0, 0, 250));
        assert_eq!(range.comment, None);
    }

    #[test]
    fn dhcp_settings_reject_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DHCP_SETTINGS_FILE),
            r#"{"dnsNameServers": "8.8.8.8", "dhcpBootOptionsEnabled": true}"#,
        )
        .unwrap();
        let err = load_dhcp_dir(dir.path()).unwrap_err();
        let ValidationError::Malformed { reason, .. } = err else {
            panic!("expected a malformed-file error, got {err:?}");
        };
        assert!(reason.contains("dnsNameServers"), "{reason}");
    }

    #[test]
    fn dhcp_directory_rejects_repeated_mac() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DHCP_SETTINGS_FILE), "{}").unwrap();
        std::fs::write(
            dir.path().join(FIXED_ASSIGNMENTS_FILE),
            "MAC address,LAN IP,Client name\n\
             aa:bb:cc:dd:ee:ff,10.0.0.5,printer\n\
             AA-BB-CC-DD-EE-FF,10.0.0.6,printer again\n",
        )
        .unwrap();
        let err = load_dhcp_dir(dir.path()).unwrap_err();
        let ValidationError::Malformed { reason, .. } = err else {
            panic!("expected a malformed-file error, got {err:?}");
        };
        assert!(reason.contains("aa:bb:cc:dd:ee:ff"), "{reason}");
    }

    #[test]
    fn dhcp_directory_rejects_bad_mac() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DHCP_SETTINGS_FILE), "{}").unwrap();
        std::fs::write(
            dir.path().join(FIXED_ASSIGNMENTS_FILE),
            "MAC address,LAN IP,Client name\nnot-a-mac,10.0.0.5,x\n",
        )
        .unwrap();
        assert!(matches!(
            load_dhcp_dir(dir.path()),
            Err(ValidationError::InvalidMac { .. })
        ));
    }

    #[test]
    fn desired_state_isolates_broken_sites() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::rooted_at(root.path());
        for (site, subnets) in [
            ("Good", "Data,Voice\n10.1.10.1/24,10.1.20.1/24\n"),
            ("Bad", "Data\nnonsense\n"),
        ] {
            let dir = ws.site_dir(site);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("subnets.csv"), subnets).unwrap();
        }
        let voice_dir = ws.site_dir("Good").join("Voice");
        std::fs::create_dir_all(&voice_dir).unwrap();
        std::fs::write(voice_dir.join(DHCP_SETTINGS_FILE), r#"{"dnsNameservers": "google_dns"}"#)
            .unwrap();

        let request = LoadRequest {
            sites: vec!["Good".into(), "Bad".into(), "Missing".into()],
            subnets: Some(TableSource::PerSite("subnets.csv".into())),
            ports: None,
        };
        let state = load_desired_state(&ws, catalog(), &request).unwrap();

        let good = state.site("Good").unwrap();
        assert_eq!(good.subnets.len(), 2);
        assert_eq!(good.dhcp.len(), 1);
        assert_eq!(good.dhcp[0].vlan_id, 20);
        assert!(good.ports.is_none());

        assert!(matches!(state.site("Bad"), Err(CoreError::InvalidSite { .. })));
        assert!(matches!(state.site("Missing"), Err(CoreError::InvalidSite { .. })));
    }

    #[test]
    fn dhcp_dir_without_subnet_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::rooted_at(root.path());
        let dir = ws.site_dir("Branch");
        std::fs::create_dir_all(dir.join("Voice")).unwrap();
        std::fs::write(dir.join("subnets.csv"), "Data\n10.1.10.1/24\n").unwrap();
        std::fs::write(dir.join("Voice").join(DHCP_SETTINGS_FILE), "{}").unwrap();

        let request = LoadRequest {
            sites: vec!["Branch".into()],
            subnets: Some(TableSource::PerSite("subnets.csv".into())),
            ports: None,
        };
        let state = load_desired_state(&ws, catalog(), &request).unwrap();
        match state.site("Branch") {
            Err(CoreError::InvalidSite { errors, .. }) => assert_eq!(
                errors,
                [ValidationError::DhcpWithoutSubnet {
                    vlan: "Voice".into()
                }]
            ),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
