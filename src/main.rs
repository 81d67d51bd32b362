use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use sightline_oracle::data::loader::load_catalog;
use sightline_oracle::{
    ObjectFilter, ObservationQuery, Oracle, OracleConfig, OrderConflictPolicy, ParameterQuery,
    ParameterValue, ReferenceId, ReferencePolicy,
};

/// Query the observation log by target, wavelength and sightline parameters.
#[derive(Debug, Parser)]
#[command(name = "sightline", version, about)]
struct Cli {
    /// Directory holding the observation log and sightline tables.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// `merged-wins` or `reject`.
    #[arg(long, global = true)]
    order_conflict: Option<OrderConflictPolicy>,

    /// Print results as a JSON array instead of one filename per line.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a handful of example queries against the catalog.
    Demo,
    /// Observations covering a wavelength.
    Wave {
        /// Wavelength in Å (configured default when omitted).
        wave: Option<f64>,
        #[command(flatten)]
        orders: OrderArgs,
    },
    /// Observations of one target.
    Target {
        /// Object name (configured default when omitted).
        target: Option<String>,
        #[command(flatten)]
        orders: OrderArgs,
    },
    /// Full query across the observation log and sightline tables.
    Query(QueryArgs),
}

#[derive(Debug, Args, Clone, Copy)]
struct OrderArgs {
    /// Merged spectra only.
    #[arg(long)]
    merged_only: bool,
    /// Individual orders only.
    #[arg(long)]
    orders_only: bool,
}

#[derive(Debug, Args)]
struct QueryArgs {
    /// Restrict to these objects (repeatable).
    #[arg(long = "object")]
    objects: Vec<String>,
    #[arg(long)]
    wave: Option<f64>,
    #[arg(long)]
    wave_min: Option<f64>,
    #[arg(long)]
    wave_max: Option<f64>,
    #[command(flatten)]
    orders: OrderArgs,

    #[arg(long)]
    ebv: Option<f64>,
    #[arg(long)]
    ebv_min: Option<f64>,
    #[arg(long)]
    ebv_max: Option<f64>,
    /// Reference id, or `all`. Preferred values are used when omitted.
    #[arg(long)]
    ebv_reference: Option<String>,

    #[arg(long)]
    sptype: Option<String>,
    #[arg(long)]
    sptype_min: Option<String>,
    #[arg(long)]
    sptype_max: Option<String>,
    /// Reference id, or `all`. Preferred values are used when omitted.
    #[arg(long)]
    sptype_reference: Option<String>,
}

impl QueryArgs {
    fn to_query(&self) -> ObservationQuery {
        let objects = if self.objects.is_empty() {
            ObjectFilter::NoFilter
        } else {
            ObjectFilter::any_of(self.objects.iter().cloned())
        };
        ObservationQuery {
            objects,
            wave: self.wave,
            wave_min: self.wave_min,
            wave_max: self.wave_max,
            merged_only: self.orders.merged_only,
            orders_only: self.orders.orders_only,
            reddening: ParameterQuery {
                exact: self.ebv.map(ParameterValue::Number),
                lower: self.ebv_min.map(ParameterValue::Number),
                upper: self.ebv_max.map(ParameterValue::Number),
                reference: reference_policy(self.ebv_reference.as_deref()),
            },
            spectral_type: ParameterQuery {
                exact: self.sptype.as_deref().map(ParameterValue::from),
                lower: self.sptype_min.as_deref().map(ParameterValue::from),
                upper: self.sptype_max.as_deref().map(ParameterValue::from),
                reference: reference_policy(self.sptype_reference.as_deref()),
            },
        }
    }
}

fn reference_policy(arg: Option<&str>) -> ReferencePolicy {
    match arg {
        None => ReferencePolicy::UsePreferred,
        Some(s) if s.eq_ignore_ascii_case("all") => ReferencePolicy::UseAll,
        Some(s) => ReferencePolicy::UseReference(ReferenceId::new(s)),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = OracleConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(policy) = cli.order_conflict {
        config.order_conflict = policy;
    }

    let catalog = load_catalog(&config)
        .with_context(|| format!("loading catalog from {}", config.data_dir.display()))?;
    let oracle = Oracle::with_config(catalog, &config);

    match &cli.command {
        Command::Demo => run_demo(&oracle, cli.json)?,
        Command::Wave { wave, orders } => {
            let files = oracle.by_wavelength(*wave, orders.merged_only, orders.orders_only)?;
            print_files(&files, cli.json)?;
        }
        Command::Target { target, orders } => {
            let files =
                oracle.by_target(target.as_deref(), orders.merged_only, orders.orders_only)?;
            print_files(&files, cli.json)?;
        }
        Command::Query(args) => {
            let files = oracle.filtered_observations(&args.to_query())?;
            print_files(&files, cli.json)?;
        }
    }
    Ok(())
}

fn run_demo(oracle: &Oracle, json: bool) -> Result<()> {
    let moderate_ebv = ParameterQuery::between(0.2, 0.8);
    let queries = [
        (
            "E(B-V) in (0.2, 0.8) from reference 1, merged only",
            ObservationQuery::new()
                .merged_only()
                .reddening(
                    moderate_ebv
                        .clone()
                        .with_reference(ReferencePolicy::UseReference(ReferenceId::from(1))),
                ),
        ),
        (
            "E(B-V) in (0.7, 0.8) and spectral type B0.5 III, merged only",
            ObservationQuery::new()
                .merged_only()
                .reddening(ParameterQuery::between(0.7, 0.8))
                .spectral_type(ParameterQuery::exact("B0.5 III")),
        ),
        (
            "HD 145502 with E(B-V) in (0.2, 0.8), merged only",
            ObservationQuery::new()
                .merged_only()
                .objects(ObjectFilter::any_of(["HD 145502"]))
                .reddening(moderate_ebv),
        ),
        (
            "HD 145502 or HD 149757 covering 6614 Å, merged only",
            ObservationQuery::new()
                .merged_only()
                .objects(ObjectFilter::any_of(["HD 145502", "HD 149757"]))
                .wave(6614.0),
        ),
    ];

    for (title, query) in &queries {
        println!("# {title}");
        print_files(&oracle.filtered_observations(query)?, json)?;
    }

    println!("# Default wavelength, merged only");
    print_files(&oracle.by_wavelength(None, true, false)?, json)?;
    println!("# Default target, individual orders only");
    print_files(&oracle.by_target(None, false, true)?, json)?;
    Ok(())
}

fn print_files(files: &[String], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(files)?);
    } else if files.is_empty() {
        println!("(none)");
    } else {
        for file in files {
            println!("{file}");
        }
    }
    Ok(())
}
