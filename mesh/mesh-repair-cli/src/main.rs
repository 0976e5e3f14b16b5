//! Surface repair front end.
//!
//! Reads a triangle mesh, runs the full repair pipeline and writes a closed,
//! manifold, consistently oriented surface for a volume mesher:
//!
//! ```text
//! mesh_repair scan.stl repaired.ply
//! mesh_repair --config repair.json --log-level info in.obj out.ply
//! ```
//!
//! Progress goes to stdout, warnings and log output to stderr. The output
//! file is written only after every stage has finished. Any load or save
//! failure exits non-zero.

mod progress;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use mesh_io::MeshFormat;
use mesh_repair::{RepairParams, repair_mesh, validate_mesh};
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

/// Repair a triangle surface mesh into a watertight, oriented one
#[derive(Parser, Debug)]
#[command(name = "mesh_repair")]
#[command(version)]
#[command(about = "Repair a triangle surface mesh into a watertight, oriented one", long_about = None)]
struct Cli {
    /// Input surface (.stl, .obj or .ply)
    #[arg(name = "INPUT")]
    input: PathBuf,

    /// Output surface (.stl, .obj or .ply)
    #[arg(name = "OUTPUT")]
    output: PathBuf,

    /// JSON file with repair parameters; flags below override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Leave holes with more boundary edges than this open
    #[arg(long, value_name = "EDGES")]
    max_hole_edges: Option<usize>,

    /// Keep the winding found by propagation instead of pointing normals outward
    #[arg(long)]
    no_outward: bool,

    /// Write text STL or PLY instead of binary
    #[arg(long)]
    ascii: bool,

    /// Log level for stderr (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    /// Parameters from the config file (if any) with flags applied on top.
    fn repair_params(&self) -> Result<RepairParams> {
        let mut params = match &self.config {
            Some(path) => load_config(path)?,
            None => RepairParams::default(),
        };
        if let Some(max) = self.max_hole_edges {
            params = params.with_max_hole_edges(max);
        }
        if self.no_outward {
            params = params.with_orient_outward(false);
        }
        Ok(params)
    }
}

fn load_config(path: &Path) -> Result<RepairParams> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))
}

fn init_logging(level: &str) -> Result<()> {
    let level: Level = level
        .parse()
        .with_context(|| format!("invalid log level '{level}'"))?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    if MeshFormat::from_path(&cli.output).is_none() {
        bail!(
            "cannot tell the output format of {} (expected .stl, .obj or .ply)",
            cli.output.display()
        );
    }
    let params = cli.repair_params()?;
    debug!(?params, "repair parameters");

    let mut mesh = mesh_io::load_mesh(&cli.input)
        .with_context(|| format!("failed to load {}", cli.input.display()))?;
    println!(
        "Loaded mesh: {} vertices, {} faces.",
        mesh.vertex_count(),
        mesh.face_count()
    );

    let report = repair_mesh(&mut mesh, &params)
        .with_context(|| format!("cannot repair {}", cli.input.display()))?;

    let mut stdout = std::io::stdout().lock();
    progress::write_progress(&mut stdout, &report)?;
    for warning in progress::warnings(&report) {
        eprintln!("Warning: {warning}");
    }

    mesh_io::save_mesh_with(&mesh, &cli.output, !cli.ascii)
        .with_context(|| format!("failed to save {}", cli.output.display()))?;

    let check = validate_mesh(&mesh);
    println!("Final mesh: {}.", check.summary());
    if check.is_watertight_solid() {
        println!("Saved watertight mesh to: {}", cli.output.display());
    } else {
        println!("Saved mesh to: {}", cli.output.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    run(&cli)
}
