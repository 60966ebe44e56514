use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use lathekit::{
    format_number, import_options, init_logging, init_logging_with, job_definition,
    parse_tool_spec, turning_parameters, Config, ImportReport, ImportResolver,
    LatheTurningGenerator, LogFormat, Polyline, ToolpathSimulator, BUILD_DATE, VERSION,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "lathekit", version, about, long_about = None)]
struct Cli {
    /// Config file (TOML or JSON); defaults to the platform config directory
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a DXF or SVG drawing and report what was found
    Import {
        #[arg(value_name = "DRAWING")]
        input: PathBuf,

        /// Print every polyline point
        #[arg(short, long)]
        verbose: bool,
    },
    /// Import a drawing and write lathe G-code
    Generate(GenerateArgs),
    /// Replay a G-code file and print each position
    Simulate {
        #[arg(value_name = "GCODE")]
        input: PathBuf,

        /// Playback speed multiplier
        #[arg(short, long)]
        speed: Option<f64>,
    },
    /// Show or initialize the configuration file
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(value_name = "DRAWING")]
    input: PathBuf,

    /// Output file; stdout when omitted
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Tool as NUMBER[:NAME[:DIAMETER[:FEED[:SPINDLE]]]]; repeat for several tools
    #[arg(short, long = "tool", value_name = "SPEC")]
    tools: Vec<String>,

    /// Feed rate for tools without their own
    #[arg(long)]
    feed: Option<f64>,

    /// Spindle RPM for tools without their own
    #[arg(long)]
    spindle: Option<f64>,

    /// Geometry-to-machine scale factor
    #[arg(long)]
    scale: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.log_json {
        init_logging_with(LogFormat::Json)?;
    } else {
        init_logging()?;
    }
    info!("LatheKit {} (built {})", VERSION, BUILD_DATE);

    let config = Config::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Command::Import { input, verbose } => run_import(&config, &input, verbose),
        Command::Generate(args) => run_generate(&config, args),
        Command::Simulate { input, speed } => run_simulate(&config, &input, speed).await,
        Command::Config { init } => run_config(&config, cli.config.as_deref(), init),
    }
}

fn import(config: &Config, input: &Path) -> Result<ImportReport> {
    let mut resolver = ImportResolver::new(import_options(config));
    resolver
        .import(input)
        .with_context(|| format!("Failed to import {}", input.display()))
}

fn run_import(config: &Config, input: &Path, verbose: bool) -> Result<()> {
    let report = import(config, input)?;
    let geometry = &report.geometry;

    match report.tier {
        Some(tier) => println!("Decoded by: {}", tier),
        None => println!("Decoded by: none (no geometry found)"),
    }
    println!("Polylines: {}", geometry.polyline_count());
    println!("Points: {}", geometry.point_count());
    let length: f64 = geometry.polylines.iter().map(Polyline::length).sum();
    println!("Path length: {}", format_number(length));
    if let Some(bounds) = geometry.bounds() {
        println!(
            "Bounds: ({}, {}) - ({}, {})  [{} x {}]",
            format_number(bounds.min.x),
            format_number(bounds.min.y),
            format_number(bounds.max.x),
            format_number(bounds.max.y),
            format_number(bounds.width()),
            format_number(bounds.height())
        );
    }
    if let Some(json) = &report.diagnostics.normalizer_json {
        println!("Normalizer output: {}", json.display());
    }
    if let Some(log) = &report.diagnostics.normalizer_log {
        println!("Normalizer log: {}", log.display());
    }

    if verbose {
        for (index, polyline) in geometry.polylines.iter().enumerate() {
            let points: Vec<String> = polyline
                .points
                .iter()
                .map(|p| format!("({}, {})", format_number(p.x), format_number(p.y)))
                .collect();
            println!("#{}: {}", index, points.join(" "));
        }
    }
    Ok(())
}

fn run_generate(config: &Config, args: GenerateArgs) -> Result<()> {
    let report = import(config, &args.input)?;
    if report.is_empty() {
        warn!(
            "{} produced no geometry; the program will only change tools",
            args.input.display()
        );
    }

    let specs = if args.tools.is_empty() {
        vec!["1:Turning".to_string()]
    } else {
        args.tools
    };
    let tools = specs
        .iter()
        .map(|spec| parse_tool_spec(spec))
        .collect::<lathekit::Result<Vec<_>>>()
        .context("Invalid --tool")?;

    let mut params = turning_parameters(config);
    if let Some(feed) = args.feed {
        params.default_feed = feed;
    }
    if let Some(spindle) = args.spindle {
        params.default_spindle = spindle;
    }
    if let Some(scale) = args.scale {
        params.scale = scale;
    }

    let job = job_definition(config, tools);
    let gcode = LatheTurningGenerator::new(params).generate(&report.geometry, &job);

    match args.output {
        Some(path) => {
            std::fs::write(&path, &gcode)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} lines to {}", gcode.lines().count(), path.display());
        }
        None => print!("{}", gcode),
    }
    Ok(())
}

async fn run_simulate(config: &Config, input: &Path, speed: Option<f64>) -> Result<()> {
    let gcode = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let mut simulator = ToolpathSimulator::new(config.simulation.base_interval());
    if simulator.load(&gcode) == 0 {
        bail!("{} contains no G0/G1 motion", input.display());
    }

    let speed = speed.unwrap_or(config.simulation.default_speed);
    simulator.start(speed, |wp| {
        println!("X{} Z{}", format_number(wp.x), format_number(wp.z));
    });
    simulator.wait().await;
    Ok(())
}

fn run_config(config: &Config, explicit: Option<&Path>, init: bool) -> Result<()> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => Config::default_path().context("No platform config directory")?,
    };

    if init {
        if path.exists() {
            println!("Config already exists at {}", path.display());
        } else {
            Config::default()
                .save_to_file(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote default config to {}", path.display());
        }
        return Ok(());
    }

    println!("# {}", path.display());
    print!(
        "{}",
        toml::to_string_pretty(config).context("Failed to render config")?
    );
    Ok(())
}
