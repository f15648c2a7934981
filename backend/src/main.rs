//! Pivotdesk CLI - pivot tables over CSV and JSON record sets
//!
//! # Main Commands
//!
//! ```bash
//! pivotdesk fields sales.csv                                   # Fields, numeric fields, values
//! pivotdesk pivot sales.csv --rows region --measure sales:sum  # Pivot to CSV on stdout
//! pivotdesk report list                                        # Manage saved reports
//! pivotdesk serve                                              # Start HTTP server (port 3000)
//! ```

use clap::{Args, Parser, Subcommand};
use pivotdesk::api::logs::LOG_BROADCASTER;
use pivotdesk::cli::{
    parse_conversion, parse_date_filter, parse_field_filter, parse_field_list, parse_measure,
    parse_sort,
};
use pivotdesk::export::chart_series;
use pivotdesk::{
    detect_field_type, field_total_with_unit, load_dataset, matrix_to_csv, write_csv_file,
    ChartKind, JsonFileStore, PivotSession, ReportConfig, ReportStore, SessionError, Settings,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pivotdesk")]
#[command(about = "Pivot tables over flat record sets", long_about = None)]
struct Cli {
    /// Report store file (overrides PIVOTDESK_REPORTS)
    #[arg(long, global = true)]
    reports: Option<PathBuf>,

    /// Silence progress logs on stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List fields, numeric fields and distinct values of a data set
    Fields {
        /// Input file (.json array of objects, or CSV)
        input: PathBuf,

        /// Also print distinct values of this field
        #[arg(short, long)]
        values: Option<String>,
    },

    /// Build a pivot table
    Pivot {
        /// Input file (.json array of objects, or CSV)
        input: PathBuf,

        #[command(flatten)]
        pivot: PivotArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print chart series (JSON) instead of CSV
        #[arg(long, value_enum)]
        chart: Option<ChartArg>,

        /// Print the matrix as JSON instead of CSV
        #[arg(long)]
        json: bool,
    },

    /// Manage saved reports
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides PIVOTDESK_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Args)]
struct PivotArgs {
    /// Row grouping fields (repeatable or comma-separated)
    #[arg(short, long)]
    rows: Vec<String>,

    /// Column grouping fields
    #[arg(short, long)]
    cols: Vec<String>,

    /// Measure as field[:sum|count|avg|min|max]
    #[arg(short, long)]
    measure: Vec<String>,

    /// Unit conversion as field:area|amount:ft2|m2|crores|original
    #[arg(long)]
    convert: Vec<String>,

    /// Date filter: all, date=YYYY-MM-DD, range=FROM..TO, week=YYYY-WW,
    /// month=YYYY-MM, year=YYYY, relative=last7days|thisMonth|thisYear
    #[arg(short, long)]
    date: Option<String>,

    /// Field filter as field=v1,v2 (repeatable)
    #[arg(short, long)]
    filter: Vec<String>,

    /// Sort rows by a row field: field[:asc|desc]
    #[arg(short, long)]
    sort: Option<String>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ChartArg {
    Bar,
    Pie,
}

impl From<ChartArg> for ChartKind {
    fn from(arg: ChartArg) -> Self {
        match arg {
            ChartArg::Bar => ChartKind::Bar,
            ChartArg::Pie => ChartKind::Pie,
        }
    }
}

#[derive(Subcommand)]
enum ReportAction {
    /// List all saved reports
    List,

    /// Show details of a report
    Show {
        /// Report ID
        id: String,
    },

    /// Save pivot parameters as a named report
    Save {
        /// Report name
        name: String,

        #[command(flatten)]
        pivot: PivotArgs,
    },

    /// Rename a report
    Rename {
        /// Report ID
        id: String,
        /// New name
        name: String,
    },

    /// Delete a report
    Delete {
        /// Report ID
        id: String,
    },

    /// Run a saved report against a data set
    Run {
        /// Report ID
        id: String,
        /// Input file
        input: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if cli.quiet {
        LOG_BROADCASTER.set_echo(false);
    }

    let result = match Settings::from_env() {
        Ok(mut settings) => {
            if let Some(path) = cli.reports {
                settings.reports_path = path;
            }
            run(cli.command, settings).await
        }
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, settings: Settings) -> CmdResult {
    match command {
        Commands::Fields { input, values } => cmd_fields(&input, values.as_deref()),

        Commands::Pivot {
            input,
            pivot,
            output,
            chart,
            json,
        } => cmd_pivot(&input, &pivot, output.as_deref(), chart, json),

        Commands::Report { action } => cmd_report(action, &settings),

        Commands::Serve { port } => {
            let mut settings = settings;
            if let Some(port) = port {
                settings.port = port;
            }
            pivotdesk::server::start_server(settings).await
        }
    }
}

fn cmd_fields(input: &Path, values: Option<&str>) -> CmdResult {
    let dataset = load_dataset(input)?;
    let numeric = dataset.numeric_fields();

    println!("Records: {}", dataset.len());
    println!("Fields:");
    for field in dataset.fields() {
        let kind = if numeric.contains(&field) { "number" } else { "text" };
        let unit = match detect_field_type(&field) {
            Some(dim) => format!(" ({})", serde_json::to_value(dim)?.as_str().unwrap_or("")),
            None => String::new(),
        };
        let total = match field_total_with_unit(dataset.records(), &field) {
            Some(total) if numeric.contains(&field) => format!(", total {}", total),
            _ => String::new(),
        };
        println!("  {} [{}]{}{}", field, kind, unit, total);
    }

    if let Some(field) = values {
        println!("\nValues of {}:", field);
        for value in dataset.unique_values(field) {
            println!("  {}", value);
        }
    }
    Ok(())
}

fn build_config(args: &PivotArgs) -> Result<ReportConfig, SessionError> {
    Ok(ReportConfig {
        row_fields: parse_field_list(&args.rows),
        column_fields: parse_field_list(&args.cols),
        measures: args
            .measure
            .iter()
            .map(|m| parse_measure(m))
            .collect::<Result<_, _>>()?,
        conversions: args
            .convert
            .iter()
            .map(|c| parse_conversion(c))
            .collect::<Result<_, _>>()?,
        date_filter: match &args.date {
            Some(d) => parse_date_filter(d)?,
            None => Default::default(),
        },
        field_filters: args
            .filter
            .iter()
            .map(|f| parse_field_filter(f))
            .collect::<Result<_, _>>()?,
    })
}

fn cmd_pivot(
    input: &Path,
    args: &PivotArgs,
    output: Option<&Path>,
    chart: Option<ChartArg>,
    json: bool,
) -> CmdResult {
    let mut session = PivotSession::new(load_dataset(input)?);
    session.load_config(build_config(args)?);
    session.set_sort(args.sort.as_deref().map(parse_sort).transpose()?);
    render(&session, output, chart, json)
}

fn render(session: &PivotSession, output: Option<&Path>, chart: Option<ChartArg>, json: bool) -> CmdResult {
    eprintln!(
        "📊 {} of {} records after filters",
        session.filtered_count(),
        session.dataset().len()
    );

    let Some(matrix) = session.matrix() else {
        return Err("select at least one row field (--rows) and one measure (--measure)".into());
    };

    let content = match (chart, json) {
        (Some(kind), _) => serde_json::to_string_pretty(&chart_series(&matrix, kind.into()))?,
        (None, true) => serde_json::to_string_pretty(&matrix)?,
        (None, false) => match output {
            Some(path) => {
                write_csv_file(&matrix, path)?;
                eprintln!("💾 CSV written to: {}", path.display());
                return Ok(());
            }
            None => matrix_to_csv(&matrix),
        },
    };
    write_output(&content, output)
}

fn cmd_report(action: ReportAction, settings: &Settings) -> CmdResult {
    let mut store = JsonFileStore::with_path(&settings.reports_path);

    match action {
        ReportAction::List => {
            let reports = store.list();
            if reports.is_empty() {
                eprintln!("📋 No reports saved yet.");
                eprintln!("   Use 'pivotdesk report save <name> --rows .. --measure ..' to add one.");
                return Ok(());
            }

            eprintln!("📋 Saved reports ({}):\n", reports.len());
            for r in reports {
                println!("  📄 {} ({})", r.name, r.id);
                println!("     Rows: {}", r.config.row_fields.join(", "));
                if !r.config.column_fields.is_empty() {
                    println!("     Columns: {}", r.config.column_fields.join(", "));
                }
                let measures: Vec<String> = r.config.measures.iter().map(|m| m.measure_key()).collect();
                println!("     Measures: {}", measures.join(", "));
                println!("     Updated: {}", r.updated_at);
                println!();
            }
        }

        ReportAction::Show { id } => {
            let report = store
                .get(&id)
                .ok_or_else(|| SessionError::ReportNotFound(id.clone()))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        ReportAction::Save { name, pivot } => {
            let config = build_config(&pivot)?;
            if config.row_fields.is_empty() || config.measures.is_empty() {
                eprintln!("⚠️  Report has no rows or no measures; running it will produce no table");
            }
            let report = store.save(&name, config)?;
            eprintln!("✅ Report saved with ID: {}", report.id);
        }

        ReportAction::Rename { id, name } => {
            let report = store
                .rename(&id, &name)?
                .ok_or_else(|| SessionError::ReportNotFound(id.clone()))?;
            eprintln!("✏️  Report {} renamed to '{}'", report.id, report.name);
        }

        ReportAction::Delete { id } => {
            if !store.delete(&id)? {
                return Err(SessionError::ReportNotFound(id).into());
            }
            eprintln!("🗑️  Report deleted: {}", id);
        }

        ReportAction::Run { id, input, output } => {
            let mut session = PivotSession::new(load_dataset(&input)?);
            let report = session.load_report(&store, &id)?;
            eprintln!("📄 Running report: {} ({})", report.name, report.id);
            render(&session, output.as_deref(), None, false)?;
        }
    }

    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> CmdResult {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
