use super::CliError;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use xillver_core::diagnostics::OutfileWriter;
use xillver_core::io::PackedTableSource;
use xillver_core::{ModelKind, TableCatalog, TableConfig, TableParams, TableVariant};

#[derive(clap::Args)]
pub(super) struct TableLocation {
    /// Directory holding the reflection tables (overrides RELXILL_TABLE_PATH)
    #[arg(long)]
    table_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Warn when parameters are clamped to the table range
    #[arg(long)]
    verbose: bool,
}

impl TableLocation {
    fn resolve(&self) -> Result<TableConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => TableConfig::load(path).map_err(xillver_core::XillverError::from)?,
            None => TableConfig::from_env(),
        };
        if let Some(table_dir) = &self.table_dir {
            config.table_dir = table_dir.clone();
        }
        config.verbose |= self.verbose;
        Ok(config)
    }
}

#[derive(clap::Args)]
pub(super) struct SpectrumArgs {
    /// Model name, e.g. xillver, xillverCp, relxillD
    #[arg(value_name = "MODEL")]
    model: String,

    #[arg(long, default_value_t = 2.0)]
    gamma: f64,

    #[arg(long, default_value_t = 1.0)]
    afe: f64,

    #[arg(long, default_value_t = 0.0)]
    logxi: f64,

    /// Cutoff energy, or electron temperature for Comptonization tables
    #[arg(long, default_value_t = 300.0)]
    ecut: f64,

    /// log10 of the density in cm^-3
    #[arg(long, default_value_t = 15.0)]
    dens: f64,

    #[arg(long, default_value_t = 1.0)]
    ktbb: f64,

    #[arg(long, default_value_t = 0.0)]
    frac: f64,

    #[arg(long, default_value_t = 1.0)]
    aco: f64,

    /// Inclination in degrees
    #[arg(long, default_value_t = 30.0)]
    incl: f64,

    /// Write the spectrum as JSON to this path instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Directory for flat-text spectrum dumps (needs RELXILL_WRITE_OUTFILES)
    #[arg(long, default_value = ".")]
    dump_dir: PathBuf,

    #[command(flatten)]
    location: TableLocation,
}

impl SpectrumArgs {
    fn params(&self, model: ModelKind) -> TableParams {
        TableParams {
            gamma: self.gamma,
            a_fe: self.afe,
            log_xi: self.logxi,
            ecut: self.ecut,
            density: self.dens,
            kt_bb: self.ktbb,
            frac_pl_bb: self.frac,
            a_co: self.aco,
            incl: self.incl,
            model,
        }
    }
}

#[derive(clap::Args)]
pub(super) struct TableArgs {
    #[command(flatten)]
    location: TableLocation,
}

#[derive(clap::Args)]
pub(super) struct InfoArgs {
    /// Model whose table is inspected
    #[arg(value_name = "MODEL")]
    model: String,

    #[command(flatten)]
    location: TableLocation,
}

pub(super) fn run_spectrum_command(args: SpectrumArgs) -> Result<i32, CliError> {
    let model = parse_model(&args.model)?;
    let config = args.location.resolve()?;
    let writer = OutfileWriter::from_config(&config, &args.dump_dir);
    tracing::debug!(
        model = %model,
        table_dir = %config.table_dir.display(),
        "evaluating reflection spectrum"
    );

    let mut catalog = TableCatalog::new(PackedTableSource, config);
    let spectrum = catalog.evaluate(&args.params(model))?;

    for index in 0..spectrum.n_incl() {
        let name = format!("{}_spectrum_{index}.dat", model.as_str());
        writer
            .save_spectrum(&name, &spectrum, index)
            .map_err(xillver_core::XillverError::from)?;
    }

    let rendered =
        serde_json::to_string_pretty(&spectrum).context("failed to serialize spectrum")?;
    match &args.output {
        Some(path) => write_output(path, &rendered)?,
        None => println!("{rendered}"),
    }
    Ok(0)
}

pub(super) fn run_tables_command(args: TableArgs) -> Result<i32, CliError> {
    let config = args.location.resolve()?;
    let catalog = TableCatalog::new(PackedTableSource, config);

    let mut missing = 0;
    for variant in TableVariant::ALL {
        let available = catalog.table_exists(variant);
        if !available {
            missing += 1;
        }
        println!(
            "{:<8} {:<22} {}",
            variant.as_str(),
            variant.filename(),
            if available { "available" } else { "missing" }
        );
    }
    println!("Tables available: {}/{}", TableVariant::ALL.len() - missing, TableVariant::ALL.len());
    Ok(0)
}

pub(super) fn run_info_command(args: InfoArgs) -> Result<i32, CliError> {
    let model = parse_model(&args.model)?;
    let config = args.location.resolve()?;
    let mut catalog = TableCatalog::new(PackedTableSource, config);
    let table = catalog.get_table(model.table_variant())?;

    println!("Table: {}", table.path().display());
    println!("Energy bins: {}", table.n_energy());
    for axis in table.axes() {
        println!(
            "{:<6} {:>3} values  [{}, {}]",
            axis.kind().table_name(),
            axis.len(),
            axis.first(),
            axis.last()
        );
    }
    Ok(0)
}

fn parse_model(name: &str) -> Result<ModelKind, CliError> {
    ModelKind::from_name(name).ok_or_else(|| {
        let known = ModelKind::ALL
            .iter()
            .map(|model| model.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        CliError::Usage(format!("unknown model '{name}' (expected one of: {known})"))
    })
}

fn write_output(path: &Path, content: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    fs::write(path, content)
        .with_context(|| format!("failed to write spectrum '{}'", path.display()))?;
    Ok(())
}
