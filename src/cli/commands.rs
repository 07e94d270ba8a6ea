use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::app::{App, ControllerSettings, LocController};
use crate::config::AppConfig;
use crate::error::ValidationError;
use crate::geo::{Geo, Geocoder, LatLng};
use crate::map::TerminalMap;
use crate::search::{FilterSpec, QueryParams, SortDirection, SortField, SortSpec, MAX_RATE};
use crate::session::SessionStore;
use crate::stats::{build_pie, PieView};
use crate::storage::{Location, LocationDraft, StorageHandle};

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Display name for the location
    pub name: String,
    /// Rating from 1 to 5
    #[arg(long)]
    pub rate: i64,
    /// Latitude in decimal degrees
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,
    /// Longitude in decimal degrees
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,
    /// Address to store with explicit coordinates
    #[arg(long, requires = "lat")]
    pub address: Option<String>,
    /// Resolve coordinates and address through the geocoder
    #[arg(long, conflicts_with_all = ["lat", "lng", "address"])]
    pub lookup: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Sort field: name, rate, created or updated
    #[arg(long)]
    pub sort: Option<SortField>,
    /// Sort descending
    #[arg(long)]
    pub desc: bool,
    /// Case-insensitive name filter
    #[arg(long)]
    pub txt: Option<String>,
    /// Only show locations rated at least this much
    #[arg(long, default_value_t = 0)]
    pub min_rate: i64,
}

pub struct TuiOptions {
    pub query: Option<String>,
    pub session_file: PathBuf,
}

pub fn run_tui(config: &AppConfig, storage: StorageHandle, options: TuiOptions) -> Result<()> {
    if !atty::is(atty::Stream::Stdout) {
        bail!("the interactive view needs a terminal; try `loctui list` instead");
    }
    let session = SessionStore::new(options.session_file);
    let query = startup_query(options.query.as_deref(), &session);
    tracing::info!(%query, "starting tui");

    let map = TerminalMap::from_config(config).context("configuring map providers")?;
    let mut controller = LocController::new(storage, map, ControllerSettings::from_config(config))
        .with_session(session);
    controller.init(query);

    let mut app = App::new(controller);
    app.run()?;
    if let Some(link) = app.controller().copied_link() {
        println!("{link}");
    }
    Ok(())
}

/// `--query` wins; otherwise the last session, and an unreadable session file is removed.
fn startup_query(raw: Option<&str>, session: &SessionStore) -> QueryParams {
    if let Some(raw) = raw {
        return QueryParams::parse(raw);
    }
    match session.load() {
        Ok(snapshot) => snapshot.map(|s| s.params()).unwrap_or_default(),
        Err(err) => {
            tracing::warn!(?err, "discarding unreadable session file");
            if let Err(err) = session.clear() {
                tracing::warn!(?err, "could not remove session file");
            }
            QueryParams::default()
        }
    }
}

pub fn add_location(config: &AppConfig, storage: &StorageHandle, args: AddArgs) -> Result<()> {
    let geo = match &args.lookup {
        Some(address) => {
            let geocoder = Geocoder::new(config.geocoder.clone())?;
            geocoder
                .lookup(address)
                .with_context(|| format!("looking up address {address:?}"))?
        }
        None => explicit_geo(&args)?,
    };
    let loc = save_location(storage, &args.name, args.rate, geo)?;
    println!("Added Location (id: {})", loc.id);
    Ok(())
}

fn explicit_geo(args: &AddArgs) -> Result<Geo> {
    let (Some(lat), Some(lng)) = (args.lat, args.lng) else {
        bail!("either --lat/--lng or --lookup is required");
    };
    let point = LatLng::new(lat, lng);
    if !point.is_valid() {
        bail!("coordinates out of range: {point}");
    }
    Ok(match &args.address {
        Some(address) if !address.trim().is_empty() => Geo::new(lat, lng, address.trim()),
        _ => Geo::from_point(point),
    })
}

fn save_location(storage: &StorageHandle, name: &str, rate: i64, geo: Geo) -> Result<Location> {
    if name.trim().is_empty() {
        bail!(ValidationError::MissingFields);
    }
    if !(1..=i64::from(MAX_RATE)).contains(&rate) {
        bail!(ValidationError::RateOutOfRange);
    }
    storage
        .save(LocationDraft::new(name, rate, geo))
        .context("saving location")
}

pub fn list_locations(storage: &StorageHandle, args: ListArgs) -> Result<()> {
    print!("{}", run_list(storage, &args)?);
    Ok(())
}

fn run_list(storage: &StorageHandle, args: &ListArgs) -> Result<String> {
    let direction = if args.desc {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    };
    storage.set_sort_by(SortSpec {
        field: args.sort,
        direction,
    });
    storage.set_filter_by(FilterSpec::new(
        args.txt.as_deref().unwrap_or_default(),
        args.min_rate,
    ));
    let locs = storage.query().context("querying locations")?;
    Ok(format_locations(&locs))
}

fn format_locations(locs: &[Location]) -> String {
    if locs.is_empty() {
        return "No locs to show\n".to_string();
    }
    let mut out = String::new();
    for loc in locs {
        let _ = writeln!(&mut out, "{}  {}  rate {}/{}", loc.id, loc.name, loc.rate, MAX_RATE);
        let _ = writeln!(
            &mut out,
            "    {} ({:.5}, {:.5})",
            loc.geo.address, loc.geo.lat, loc.geo.lng
        );
        let _ = writeln!(&mut out, "    created {}", format_timestamp(loc.created_at));
        if loc.was_updated() {
            let _ = writeln!(&mut out, "    updated {}", format_timestamp(loc.updated_at));
        }
    }
    out
}

pub fn remove_location(storage: &StorageHandle, id: &str) -> Result<()> {
    storage
        .remove(id)
        .with_context(|| format!("removing location {id}"))?;
    println!("Location removed");
    Ok(())
}

pub fn print_stats(config: &AppConfig, storage: &StorageHandle) -> Result<()> {
    print!("{}", run_stats(config, storage)?);
    Ok(())
}

fn run_stats(config: &AppConfig, storage: &StorageHandle) -> Result<String> {
    let palette = config.palette();
    let by_rate = storage.loc_count_by_rate_map().context("counting by rate")?;
    let by_update = storage
        .loc_count_by_update_map()
        .context("counting by last update")?;
    let mut out = String::new();
    write_pie(&mut out, &build_pie("By rate", &by_rate, &palette));
    out.push('\n');
    write_pie(&mut out, &build_pie("Last updated", &by_update, &palette));
    Ok(out)
}

fn write_pie(out: &mut String, pie: &PieView) {
    let _ = writeln!(out, "{} (total {})", pie.title, pie.total);
    for slice in &pie.slices {
        let _ = writeln!(out, "  {:<12} {:>3}%", slice.legend(), slice.percent);
    }
    let _ = writeln!(out, "  gradient: {}", pie.gradient);
}

pub fn print_link(config: &AppConfig, storage: &StorageHandle, id: &str) -> Result<()> {
    println!("{}", share_link_for(config, storage, id)?);
    Ok(())
}

fn share_link_for(config: &AppConfig, storage: &StorageHandle, id: &str) -> Result<String> {
    let loc = storage.get_by_id(id)?;
    let mut query = QueryParams::default();
    query.set_loc_id(Some(&loc.id));
    Ok(query.share_link(&config.share.base_url))
}

fn format_timestamp(epoch_ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(epoch_ms) * 1_000_000)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| epoch_ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigPaths, StorageOptions};
    use crate::storage;
    use tempfile::TempDir;

    type TestResult<T = ()> = Result<T>;

    fn setup_storage() -> TestResult<(TempDir, StorageHandle)> {
        let temp = TempDir::new().context("creating temp dir")?;
        let root = temp.path();
        let paths = ConfigPaths::from_roots(
            root.join("config"),
            root.join("config/config.toml"),
            root.join("data"),
            root.join("state"),
        );
        let storage_opts = StorageOptions {
            database_path: paths.database_path.clone(),
            seed_demo_data: false,
            ..StorageOptions::default()
        };
        let handle = storage::init(&storage_opts)?;
        Ok((temp, handle))
    }

    fn coords_args(name: &str, rate: i64) -> AddArgs {
        AddArgs {
            name: name.into(),
            rate,
            lat: Some(32.08),
            lng: Some(34.78),
            address: None,
            lookup: None,
        }
    }

    #[test]
    fn cli_add_rejects_bad_rate_and_blank_name() -> TestResult {
        let (_temp, storage) = setup_storage()?;
        let geo = explicit_geo(&coords_args("x", 1))?;
        let err = save_location(&storage, "Beach", 9, geo.clone()).unwrap_err();
        assert_eq!(err.to_string(), "Rating must be between 1 and 5");
        let err = save_location(&storage, "   ", 3, geo).unwrap_err();
        assert_eq!(err.to_string(), "Please fill out all fields.");
        assert_eq!(storage.count()?, 0);
        Ok(())
    }

    #[test]
    fn cli_add_without_address_uses_coordinates() -> TestResult {
        let geo = explicit_geo(&coords_args("Cafe", 4))?;
        assert_eq!(geo.address, Geo::from_point(LatLng::new(32.08, 34.78)).address);

        let mut missing = coords_args("Cafe", 4);
        missing.lng = None;
        assert!(explicit_geo(&missing).is_err());

        let mut invalid = coords_args("Cafe", 4);
        invalid.lat = Some(120.0);
        assert!(explicit_geo(&invalid).is_err());
        Ok(())
    }

    #[test]
    fn cli_list_filters_and_sorts() -> TestResult {
        let (_temp, storage) = setup_storage()?;
        for (name, rate) in [("Central Park", 5), ("Parking Lot", 2), ("Museum", 4)] {
            let geo = explicit_geo(&coords_args(name, rate))?;
            save_location(&storage, name, rate, geo)?;
        }

        let output = run_list(
            &storage,
            &ListArgs {
                sort: Some(SortField::Rate),
                desc: true,
                txt: Some("PARK".into()),
                min_rate: 0,
            },
        )?;
        let central = output.find("Central Park").expect("central listed");
        let parking = output.find("Parking Lot").expect("parking listed");
        assert!(central < parking);
        assert!(!output.contains("Museum"));

        let output = run_list(
            &storage,
            &ListArgs {
                min_rate: 3,
                ..ListArgs::default()
            },
        )?;
        assert!(output.contains("Museum"));
        assert!(!output.contains("Parking Lot"));
        Ok(())
    }

    #[test]
    fn cli_stats_on_empty_store_shows_zero_percent() -> TestResult {
        let (_temp, storage) = setup_storage()?;
        let output = run_stats(&AppConfig::default(), &storage)?;
        assert!(output.contains("By rate (total 0)"));
        assert!(output.contains("5 (0)"));
        assert!(output.contains("never (0)"));
        assert!(!output.contains("NaN"));
        Ok(())
    }

    #[test]
    fn startup_query_prefers_flag_then_session() -> TestResult {
        let temp = TempDir::new()?;
        let session = SessionStore::new(temp.path().join("session.json"));
        session.save(&QueryParams::parse("locId=saved"))?;

        let from_flag = startup_query(Some("txt=park"), &session);
        assert_eq!(from_flag.to_query_string(), "txt=park");
        assert_eq!(startup_query(None, &session).loc_id(), Some("saved"));
        Ok(())
    }

    #[test]
    fn startup_query_drops_corrupt_session_file() -> TestResult {
        let temp = TempDir::new()?;
        let path = temp.path().join("session.json");
        std::fs::write(&path, "{not json")?;
        let session = SessionStore::new(path.clone());

        assert!(startup_query(None, &session).is_empty());
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn cli_link_points_at_location() -> TestResult {
        let (_temp, storage) = setup_storage()?;
        let geo = explicit_geo(&coords_args("Pier", 3))?;
        let loc = save_location(&storage, "Pier", 3, geo)?;
        let link = share_link_for(&AppConfig::default(), &storage, &loc.id)?;
        assert_eq!(link, format!("loctui://open?locId={}", loc.id));
        assert!(share_link_for(&AppConfig::default(), &storage, "missing").is_err());

        remove_location(&storage, &loc.id)?;
        assert_eq!(storage.count()?, 0);
        Ok(())
    }
}
