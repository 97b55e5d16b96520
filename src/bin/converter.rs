//! Conversor - CLI tool for converting personal finance files.

use clap::Parser;
use conversor::{
    conversion::{self, ConversionRequest},
    update, ConverterConfig, Error, Format, Result,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// How long a finished conversion waits for the update notice.
const UPDATE_GRACE: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "conversor", version)]
#[command(about = "Convert between OFX, CSV, PDF, JPG and XML files", long_about = None)]
struct Cli {
    /// Source file path
    #[arg(short, long, required_unless_present = "list")]
    input: Option<PathBuf>,

    /// Source format (ofx, csv, pdf, jpg, xml)
    #[arg(long = "from", required_unless_present = "list")]
    from: Option<Format>,

    /// Target format (ofx, csv, pdf, jpg, xml)
    #[arg(long = "to", required_unless_present = "list")]
    to: Option<Format>,

    /// Destination path (defaults to the input path with the target extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Title printed above PDF reports
    #[arg(long)]
    title: Option<String>,

    /// Resolution used when rendering PDF pages to JPG
    #[arg(long, default_value_t = 72.0)]
    dpi: f32,

    /// JPEG quality (1-100) of rendered pages
    #[arg(long, default_value_t = 90)]
    quality: u8,

    /// Directory containing the pdfium library
    #[arg(long, env = "PDFIUM_LIBRARY_DIR")]
    pdfium_dir: Option<PathBuf>,

    /// Print the first lines of the result
    #[arg(long)]
    preview: bool,

    /// URL of a JSON feed ({"version", "url"}) announcing new releases
    #[arg(long)]
    update_url: Option<String>,

    /// List supported conversions and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "conversor=info".into()))
        .with_target(false)
        .init();

    if let Err(e) = run() {
        tracing::error!("conversion failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.list {
        for (from, to) in conversion::SUPPORTED_CONVERSIONS {
            println!("{} -> {}", from, to);
        }
        return Ok(());
    }

    let (input, from, to) = match (cli.input, cli.from, cli.to) {
        (Some(input), Some(from), Some(to)) => (input, from, to),
        _ => return Err(Error::MissingField("--input, --from and --to".to_string())),
    };

    let update_check = cli.update_url.clone().map(|url| {
        update::spawn_check(url, |release| {
            tracing::info!("version {} is available at {}", release.version, release.url);
        })
    });

    if !from.matches_path(&input) {
        tracing::warn!(
            "{} does not have a {} extension ({})",
            input.display(),
            from.description(),
            from.accepted_extensions().join(", ")
        );
    }

    let mut config = ConverterConfig::default()
        .with_render_dpi(cli.dpi)
        .with_jpeg_quality(cli.quality);
    if let Some(title) = cli.title {
        config = config.with_report_title(title);
    }
    if let Some(dir) = cli.pdfium_dir {
        config = config.with_pdfium_library_dir(dir);
    }

    tracing::info!("processing conversion from {} to {}", from, to);
    let request = ConversionRequest::new(&input, from, to);
    let output = conversion::convert_with(&request, &config)?;

    if cli.preview {
        println!("{}", output.preview());
    }

    let destination = cli
        .output
        .unwrap_or_else(|| input.with_extension(to.extension()));
    let written = output.save(&destination)?;

    match written.as_slice() {
        [single] => tracing::info!("saved {}", single.display()),
        pages => tracing::info!(
            "saved {} pages to {}",
            pages.len(),
            destination
                .parent()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default()
        ),
    }

    // The notice is optional; give it a moment, never fail on it.
    if let Some(handle) = update_check {
        update::wait_briefly(handle, UPDATE_GRACE);
    }

    Ok(())
}
