use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use markgate::gateway::errors::ValidationError;
use markgate::gateway::logging::ConversionLogger;
use markgate::{
    ConversionMetadata, ConversionRequest, ConversionService, GatewayConfig, GatewayError,
    resolve_converter,
};

/// Convert HTML files, web pages or JSON conversion requests to Markdown.
#[derive(Parser, Debug)]
#[command(name = "markgate", version, about)]
struct Cli {
    /// HTML files to convert
    files: Vec<PathBuf>,

    /// Additional HTML file to convert (repeatable)
    #[arg(short = 'f', long = "file")]
    extra_files: Vec<PathBuf>,

    /// URL to fetch and convert (repeatable)
    #[arg(short, long)]
    url: Vec<String>,

    /// JSON conversion request; the reply is printed as JSON
    #[arg(short, long)]
    request: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long, default_value = "markgate.yaml")]
    config: String,

    /// Write Markdown here instead of stdout: a file for a single source,
    /// otherwise a directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print title, size and processing time of each conversion
    #[arg(short, long)]
    metadata: bool,
}

enum Source {
    File(PathBuf),
    Url(String),
}

impl Source {
    fn label(&self) -> String {
        match self {
            Source::File(path) => path.display().to_string(),
            Source::Url(url) => url.clone(),
        }
    }

    /// File name used when writing into an output directory.
    fn output_name(&self) -> String {
        let stem = match self {
            Source::File(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Source::Url(url) => match url::Url::parse(url) {
                Ok(parsed) => {
                    let host = parsed.host_str().unwrap_or("page").to_string();
                    let path = parsed.path().trim_matches('/').replace('/', "_");
                    if path.is_empty() {
                        host
                    } else {
                        format!("{}_{}", host, path)
                    }
                }
                Err(_) => String::new(),
            },
        };
        let stem: String = stem
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
            .collect();
        if stem.is_empty() {
            "index.md".to_string()
        } else {
            format!("{}.md", stem)
        }
    }
}

async fn convert(service: &ConversionService, source: &Source) -> Result<(String, ConversionMetadata), GatewayError> {
    match source {
        Source::File(path) => {
            let html = std::fs::read_to_string(path).map_err(|e| {
                ValidationError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
            })?;
            Ok(service.convert_source(&html))
        }
        Source::Url(url) => service.convert_url(url, None, None).await,
    }
}

fn write_output(output: &Path, single: bool, source: &Source, markdown: &str) -> std::io::Result<PathBuf> {
    let target = if single && !output.is_dir() {
        output.to_path_buf()
    } else {
        output.join(source.output_name())
    };
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&target, markdown)?;
    Ok(target)
}

fn print_metadata(source: &Source, metadata: &ConversionMetadata) {
    eprintln!("== {}", source.label());
    eprintln!("   Title: {}", metadata.title.as_deref().unwrap_or("(none)"));
    if let Some(size) = metadata.size_bytes {
        eprintln!("   Size: {} bytes", size);
    }
    eprintln!("   Processing time: {} ms", metadata.elapsed_millis);
}

async fn run_request(service: &ConversionService, path: &Path, logger: &mut ConversionLogger) -> bool {
    let operation = format!("request {}", path.display());
    logger.start_operation(&operation);

    let request = std::fs::read_to_string(path)
        .map_err(|e| {
            GatewayError::Validation(ValidationError::InvalidInput(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))
        })
        .and_then(|json| {
            serde_json::from_str::<ConversionRequest>(&json).map_err(|e| {
                GatewayError::Validation(ValidationError::InvalidInput(format!(
                    "malformed request: {}",
                    e
                )))
            })
        });

    let request = match request {
        Ok(request) => request,
        Err(e) => {
            logger.log_failure(&path.display().to_string(), &e);
            logger.end_operation(&operation, false);
            return false;
        }
    };

    let reply = service.handle(&request).await;
    println!("{}", reply.to_json());

    let success = reply.status == 200;
    logger.end_operation(&operation, success);
    success
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = GatewayConfig::load_or_default(&cli.config);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration in {}: {}", cli.config, e);
        return ExitCode::FAILURE;
    }
    config.init_logging();

    let sources: Vec<Source> = cli
        .files
        .iter()
        .chain(cli.extra_files.iter())
        .cloned()
        .map(Source::File)
        .chain(cli.url.iter().cloned().map(Source::Url))
        .collect();

    if sources.is_empty() && cli.request.is_none() {
        eprintln!("Nothing to convert. Pass HTML files, --url or --request (see --help).");
        return ExitCode::FAILURE;
    }

    let converter = resolve_converter(&config.converter);
    let service = ConversionService::new(converter, config.fetch.clone());
    info!("Using {} converter", service.converter_name());

    let mut logger = ConversionLogger::new();
    let mut all_ok = true;

    if let Some(request_path) = &cli.request {
        all_ok &= run_request(&service, request_path, &mut logger).await;
    }

    let single = sources.len() == 1;
    for source in &sources {
        let label = source.label();
        logger.start_operation(&label);

        match convert(&service, source).await {
            Ok((markdown, metadata)) => {
                logger.log_conversion(&label, metadata.size_bytes.unwrap_or_default(), markdown.len());
                if cli.metadata {
                    print_metadata(source, &metadata);
                }

                let written = match &cli.output {
                    Some(output) => match write_output(output, single, source, &markdown) {
                        Ok(path) => {
                            info!("💾 Saved {} to {}", label, path.display());
                            true
                        }
                        Err(e) => {
                            error!("Failed to save output for {}: {}", label, e);
                            false
                        }
                    },
                    None => {
                        println!("{}", markdown);
                        true
                    }
                };
                all_ok &= written;
                logger.end_operation(&label, written);
            }
            Err(e) => {
                logger.log_failure(&label, &e);
                logger.end_operation(&label, false);
                all_ok = false;
            }
        }
    }

    logger.log_final_summary();

    if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
