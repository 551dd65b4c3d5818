// ============================================================================
// corrpt CLI - headless effect-chain export
// ============================================================================
//
// Usage examples:
//   corrpt --list-effects
//   corrpt -i photo.jpg -e rgbShift -e crt --output-dir out/
//   corrpt -i photo.png -e noise --param noise.intensity=0.8 --format webp
//
// The chain runs once with time 0 at the image's native resolution and the
// result is written as <stem>__corrpt.<ext>.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::effects::{builtin, EffectChain, EffectRegistry, ParameterValue};
use crate::export::{export_image, ExportFormat, ExportRequest, FileSink};
use crate::gpu_context::GpuContext;
use crate::settings::CompositorSettings;
use crate::source::ImageLoader;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// corrpt headless glitch compositor.
///
/// Apply a chain of GPU shader effects to an image and export the result.
#[derive(Parser, Debug)]
#[command(
    name = "corrpt",
    about = "Apply a chain of GPU glitch effects to an image",
    long_about = "Apply an ordered chain of GPU shader effects to a PNG, JPEG or WebP\n\
                  image and export the composite at full resolution.\n\n\
                  Example:\n  \
                  corrpt -i photo.jpg -e rgbShift -e crt --param crt.curvature=0.4"
)]
pub struct CliArgs {
    /// Source image (PNG, JPEG or WebP)
    #[arg(short, long, value_name = "FILE", required_unless_present = "list_effects")]
    pub input: Option<PathBuf>,

    /// Effect to append to the chain. Repeat to build the chain in order.
    #[arg(short, long = "effect", value_name = "ID")]
    pub effects: Vec<String>,

    /// Parameter override as id.name=value (e.g. crt.vignette=0.2).
    #[arg(short, long = "param", value_name = "ID.NAME=VALUE")]
    pub params: Vec<String>,

    /// Output format: png, jpeg, webp. Defaults to the configured format.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1-100). Defaults to the configured quality.
    #[arg(short, long, value_name = "1-100")]
    pub quality: Option<u8>,

    /// Directory the export is written to. Defaults to the configured
    /// directory, then the current directory.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// List the available effects and their parameters, then exit.
    #[arg(long)]
    pub list_effects: bool,

    /// Log at debug level and print timing information.
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write logs to this file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the CLI and return an OS exit code.
pub fn run(args: CliArgs, settings: &CompositorSettings) -> ExitCode {
    let registry = builtin::builtin_registry();

    if args.list_effects {
        print!("{}", list_effects(&registry));
        return ExitCode::SUCCESS;
    }

    let Some(input) = args.input.as_deref() else {
        eprintln!("error: --input is required.");
        return ExitCode::FAILURE;
    };

    let chain = match build_chain(&registry, &args.effects, &args.params) {
        Ok(chain) => chain,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let format = match args.format.as_deref() {
        Some(name) => match ExportFormat::parse(name) {
            Some(format) => format,
            None => {
                eprintln!("error: unknown format '{}'. Use png, jpeg or webp.", name);
                return ExitCode::FAILURE;
            }
        },
        None => settings.export_format,
    };

    let start = Instant::now();

    let mut loader = ImageLoader::new(settings.max_file_size);
    if let Err(e) = loader.load_file(input) {
        eprintln!("error: could not load '{}': {}", input.display(), e);
        return ExitCode::FAILURE;
    }
    let image = match loader.wait() {
        Some(Ok(image)) => image,
        Some(Err(e)) => {
            eprintln!("error: could not load '{}': {}", input.display(), e);
            return ExitCode::FAILURE;
        }
        None => {
            eprintln!("error: loading '{}' was interrupted.", input.display());
            return ExitCode::FAILURE;
        }
    };

    let Some(gpu) = GpuContext::new() else {
        eprintln!("error: {}", crate::effects::CompositorError::NoAdapter);
        return ExitCode::FAILURE;
    };
    if args.verbose {
        println!("GPU: {}", gpu.adapter_name());
    }

    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| settings.output_dir())
        .unwrap_or_else(|| PathBuf::from("."));
    let mut sink = FileSink::new(output_dir);

    let request = ExportRequest::new(&image, chain, format)
        .with_jpeg_quality(args.quality.unwrap_or(settings.jpeg_quality))
        .with_filter(settings.export_filter.to_wgpu());

    match export_image(&gpu, &registry, request, &mut sink) {
        Ok(report) => {
            let path = sink.dir().join(&report.file_name);
            println!("{}", path.display());
            if args.verbose {
                println!(
                    "  {}x{}, {} pass(es), {} bytes ({:.0}ms)",
                    report.width,
                    report.height,
                    report.passes,
                    report.size,
                    start.elapsed().as_secs_f64() * 1000.0
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: export failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Chain construction
// ============================================================================

/// Build a chain from `--effect` ids and `--param` overrides
pub fn build_chain(
    registry: &EffectRegistry,
    effects: &[String],
    params: &[String],
) -> Result<EffectChain, String> {
    let mut chain = EffectChain::new();

    for id in effects {
        if !registry.contains(id) {
            return Err(format!("unknown effect '{}'. See --list-effects.", id));
        }
        if !chain.add(registry, id) {
            tracing::warn!(effect = %id, "Effect listed twice, keeping the first position");
        }
    }

    for param in params {
        let (id, name, value) = parse_param(registry, param)?;
        if !chain.set_parameter(&id, &name, value) {
            return Err(format!("'{}' sets a parameter of '{}', which is not in the chain.", param, id));
        }
    }

    Ok(chain)
}

/// Parse one `id.name=value` override against the effect's schema
pub fn parse_param(
    registry: &EffectRegistry,
    text: &str,
) -> Result<(String, String, ParameterValue), String> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| format!("'{}' is not of the form id.name=value.", text))?;
    let (id, name) = key
        .trim()
        .split_once('.')
        .ok_or_else(|| format!("'{}' is not of the form id.name=value.", text))?;

    let definition = registry
        .get(id)
        .ok_or_else(|| format!("unknown effect '{}'.", id))?;
    let parameter = definition
        .parameter(name)
        .ok_or_else(|| format!("effect '{}' has no parameter '{}'.", id, name))?;
    let value = parameter
        .parse_value(value.trim())
        .map_err(|e| format!("{}.{}: {}", id, name, e))?;

    Ok((id.to_string(), name.to_string(), value))
}

/// Human-readable listing of every visible effect
pub fn list_effects(registry: &EffectRegistry) -> String {
    let mut out = String::new();
    for category in registry.categories() {
        out.push_str(&format!("{}\n", category.name()));
        for effect in registry.effects_in_category(category) {
            if effect.hidden {
                continue;
            }
            out.push_str(&format!("  {:<18} {}\n", effect.id, effect.name));
            for param in &effect.parameters {
                out.push_str(&format!(
                    "      {:<16} {} (default {})\n",
                    param.name,
                    param.default_value().type_name(),
                    param.default_value()
                ));
            }
        }
    }
    out
}
