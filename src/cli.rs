use crate::{
    config::Config,
    diagnostics::{DiagnosticSink, FileSink, NullSink},
    format,
    pipeline::Pipeline,
    text::prepare_document,
    util::{ensure_dir, now_rfc3339, sha256_hex},
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "coa-extract")]
#[command(about = "Structured results from the text of cannabis Certificates of Analysis")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./coa-extract.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print which report family a text belongs to.
    Detect {
        #[arg(long)]
        input: PathBuf,
    },
    /// Print the line bounds of every table found.
    Sections {
        #[arg(long)]
        input: PathBuf,
    },
    /// Extract one document, or average several replicate injections.
    Extract {
        #[arg(long = "input", required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    match &args.cmd {
        Command::Detect { input } => {
            let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg, None).as_deref())?;
            detect(&cfg, input)
        }
        Command::Sections { input } => {
            let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg, None).as_deref())?;
            sections(&cfg, input)
        }
        Command::Extract { inputs, out } => {
            let log_path = resolve_log_path(&cfg, out.as_deref());
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            extract(&cfg, inputs, out.as_deref())
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    ["coa-extract.toml", "coa-extract.example.toml"]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn diagnostic_sink(cfg: &Config) -> Box<dyn DiagnosticSink> {
    if cfg.diagnostics.enabled {
        let sink = FileSink::new(Path::new(&cfg.diagnostics.file_path));
        info!("diagnostics -> {}", sink.path().display());
        Box::new(sink)
    } else {
        Box::new(NullSink)
    }
}

struct InputText {
    path: PathBuf,
    sha256: String,
    text: String,
}

fn read_input(cfg: &Config, input: &Path) -> Result<InputText> {
    validate_input(cfg, input)?;
    let bytes = std::fs::read(input).with_context(|| format!("reading input: {}", input.display()))?;
    let sha256 = sha256_hex(&bytes);
    let text = String::from_utf8(bytes)
        .with_context(|| format!("input is not UTF-8 text: {}", input.display()))?;
    Ok(InputText {
        path: input.to_path_buf(),
        sha256,
        text,
    })
}

fn detect(cfg: &Config, input: &Path) -> Result<()> {
    let doc = read_input(cfg, input)?;
    let text = prepare_document(&cfg.normalize, &doc.text);
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": doc.path,
            "sha256": doc.sha256,
            "format": format::detect(&text),
        }))?
    );
    Ok(())
}

fn sections(cfg: &Config, input: &Path) -> Result<()> {
    let doc = read_input(cfg, input)?;
    let pipeline = Pipeline::new(cfg, diagnostic_sink(cfg))?;
    let tables: Vec<serde_json::Value> = pipeline
        .locate_tables(&doc.text)
        .into_iter()
        .map(|(kind, found)| match found {
            Ok(section) => serde_json::json!({ "table": kind, "found": true, "section": section }),
            Err(err) => serde_json::json!({ "table": kind, "found": false, "reason": err.to_string() }),
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": doc.path,
            "sha256": doc.sha256,
            "tables": tables,
        }))?
    );
    Ok(())
}

fn extract(cfg: &Config, inputs: &[PathBuf], out: Option<&Path>) -> Result<()> {
    let docs = inputs
        .iter()
        .map(|p| read_input(cfg, p))
        .collect::<Result<Vec<_>>>()?;

    let pipeline = Pipeline::new(cfg, diagnostic_sink(cfg))?;
    let started = now_rfc3339();
    let texts: Vec<&str> = docs.iter().map(|d| d.text.as_str()).collect();
    let result = pipeline.extract_replicates(&texts)?;

    let manifest: Vec<serde_json::Value> = docs
        .iter()
        .map(|d| serde_json::json!({ "path": d.path, "sha256": d.sha256 }))
        .collect();

    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                ensure_dir(parent)?;
            }
            std::fs::write(path, serde_json::to_string_pretty(&result)?)
                .with_context(|| format!("writing result: {}", path.display()))?;
            info!("wrote {}", path.display());
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "inputs": manifest,
                    "started": started,
                    "finished": now_rfc3339(),
                    "out": path,
                    "analytes": result.cannabinoids.len(),
                    "compliance_status": result.compliance_status,
                    "status": "ok"
                }))?
            );
        }
        None => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "inputs": manifest,
                    "result": result,
                }))?
            );
        }
    }

    Ok(())
}

fn validate_input(cfg: &Config, input: &Path) -> Result<()> {
    let input_str = input.display().to_string();

    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are disabled: {input_str}"));
    }

    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    match input.extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => {
            return Err(anyhow!(
                "input is a PDF; decode it to text first: {}",
                input.display()
            ));
        }
        Some(_) => {}
        None => warn!("input has no extension; assuming text: {}", input.display()),
    }

    let len = std::fs::metadata(input)
        .with_context(|| format!("stat input: {}", input.display()))?
        .len();
    if len > cfg.limits.max_input_bytes {
        return Err(anyhow!(
            "input is {len} bytes, over limits.max_input_bytes={}: {}",
            cfg.limits.max_input_bytes,
            input.display()
        ));
    }

    Ok(())
}

fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}

fn resolve_log_path(cfg: &Config, out: Option<&Path>) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    let dir = out
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Some(dir.join("coa-extract.log"))
}
