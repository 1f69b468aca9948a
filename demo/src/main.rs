use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fluxlitho::compositor::default_layer_selection;
use fluxlitho::geometry::BoundingBox;
use fluxlitho::normalize::{center_offset, mirror_horizontal, mirror_vertical, rescale_to_width, rotate_90};
use fluxlitho::svg::load_svg;
use fluxlitho::{
    build_relief_mesh, collect_gerber_files, export_mesh, load_gerber_files, write_ctb, ImportOptions, PanelConfig,
    Position, PrinterProfile, Region, Vector,
};
use log::info;

/// Relief frames from PCB layers or SVG artwork, and CTB print jobs from layer images.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cut a motif out of the panel and export the frame as STL or 3MF
    Relief(ReliefArgs),
    /// Encode front and back layer images into a CTB print job
    Ctb {
        front: PathBuf,
        back: PathBuf,
        #[arg(short, long, default_value = "job.ctb")]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ReliefArgs {
    /// Gerber file, zip archive of Gerber files, or SVG file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file, `.stl` or `.3mf`
    #[arg(short, long, default_value = "frame.stl")]
    output: PathBuf,

    /// Layer file names to use, default: layers whose name looks like copper, mask or silk
    #[arg(short, long)]
    layer: Vec<String>,

    /// Rescale the motif to this width, mm
    #[arg(short, long)]
    width: Option<f64>,

    /// Number of 90° rotations
    #[arg(short, long, default_value_t = 0)]
    rotate: u8,

    #[arg(long)]
    mirror_horizontal: bool,

    #[arg(long)]
    mirror_vertical: bool,

    /// Center the motif on the panel instead of placing it at the panel origin
    #[arg(short, long)]
    center: bool,
}

fn load_motif(args: &ReliefArgs, options: &ImportOptions) -> Result<Region, Box<dyn std::error::Error>> {
    let is_svg = args
        .input
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("svg"));
    if is_svg {
        return Ok(load_svg(&args.input, options)?);
    }

    let source = collect_gerber_files(&args.input)?;
    let names = source.file_names();
    let selected: Vec<String> = match args.layer.is_empty() {
        true => names
            .into_iter()
            .filter(|name| default_layer_selection(name))
            .collect(),
        false => args.layer.clone(),
    };
    info!("Selected layers: {:?}", selected);

    Ok(load_gerber_files(source.files(), &selected, options)?)
}

fn relief(args: ReliefArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = ImportOptions::default();
    let panel = PanelConfig::default();

    let mut motif = load_motif(&args, &options)?;
    if let Some(width) = args.width {
        motif = rescale_to_width(&motif, width)?;
    }
    for _ in 0..args.rotate % 4 {
        motif = rotate_90(&motif);
    }
    if args.mirror_horizontal {
        motif = mirror_horizontal(&motif);
    }
    if args.mirror_vertical {
        motif = mirror_vertical(&motif);
    }

    let offset = match args.center {
        true => center_offset(
            &motif,
            &BoundingBox::new(Position::origin(), Position::new(panel.width, panel.height)),
        ),
        false => Vector::zeros(),
    };

    let mesh = build_relief_mesh(&motif, offset, &panel)?;
    let format = export_mesh(&mesh, &args.output)?;

    println!(
        "Exported {:?}: {} ({} triangles)",
        format,
        args.output.display(),
        mesh.triangle_count()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init();

    match Cli::parse().command {
        Command::Relief(args) => relief(args)?,
        Command::Ctb {
            front,
            back,
            output,
        } => {
            write_ctb(&front, &back, &output, &PrinterProfile::default())?;
            println!("CTB written: {}", output.display());
        }
    }

    Ok(())
}

pub fn init() {
    env_logger::init(); // Log to stderr (optional).

    #[cfg(feature = "profile-with-puffin")]
    {
        start_puffin_server();
    }
}

#[cfg(feature = "profile-with-puffin")]
fn start_puffin_server() {
    use tracing::{error, info};

    profiling::puffin::set_scopes_on(true); // tell puffin to collect data

    match puffin_http::Server::new("127.0.0.1:8585") {
        Ok(puffin_server) => {
            info!("Run:  cargo install puffin_viewer && puffin_viewer --url 127.0.0.1:8585");

            std::process::Command::new("puffin_viewer")
                .arg("--url")
                .arg("127.0.0.1:8585")
                .spawn()
                .ok();

            // dropping the server stops it
            #[allow(clippy::mem_forget)]
            std::mem::forget(puffin_server);
        }
        Err(err) => {
            error!("Failed to start puffin server: {err}");
        }
    };
}
