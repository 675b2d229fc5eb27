use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use rengendoc::api;
use rengendoc::models::{AppConfig, GenerationResponse, RawGenerationRequest, StorageBackend};
use rengendoc::server;
use rengendoc::services::{RenderEngine, TeraEngine};

#[derive(Parser)]
#[command(name = "rengendoc", version)]
#[command(about = "Render document templates and publish them to S3-compatible storage")]
struct Cli {
    /// Optional YAML configuration file
    #[arg(long = "config-file", env = "CONFIG_FILE", value_name = "PATH", global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Render a template file locally (no storage, no server)
    Render {
        /// Template file
        #[arg(short, long)]
        template: PathBuf,

        /// JSON file with the template context
        #[arg(short, long)]
        context: Option<PathBuf>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args, Default)]
struct ServeArgs {
    /// Address to listen on (overrides BIND_ADDR)
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Storage backend: "s3" or "memory" (overrides STORAGE_BACKEND)
    #[arg(long, value_name = "BACKEND")]
    storage: Option<StorageBackend>,

    /// Maximum request body size in bytes (overrides MAX_UPLOAD_TEMPLATE_SIZE)
    #[arg(long, value_name = "BYTES")]
    max_body_bytes: Option<usize>,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Rengendoc API",
        description = "Render document templates with JSON context and publish them to object storage",
        version = "0.1.0",
        license(name = "MIT")
    ),
    paths(api::handle_generate),
    components(schemas(RawGenerationRequest, GenerationResponse)),
    tags(
        (name = "Documents", description = "Document generation")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Render {
            template,
            context,
            output,
        }) => run_render_command(&template, context.as_deref(), &output),
        Some(Commands::Serve(args)) => run_server(cli.config_file.as_deref(), args).await,
        None => run_status_command(cli.config_file.as_deref()),
    }
}

/// Resolve configuration: file, then environment, then command-line flags
fn load_config(config_file: Option<&Path>, args: &ServeArgs) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(config_file)?;
    config.apply_env()?;

    if let Some(bind) = &args.bind {
        config.bind_addr = bind.clone();
    }
    if let Some(storage) = args.storage {
        config.storage.backend = storage;
    }
    if let Some(max) = args.max_body_bytes {
        config.max_body_bytes = max;
    }

    Ok(config)
}

/// Render a template directly to a file (no server needed)
fn run_render_command(
    template: &Path,
    context: Option<&Path>,
    output: &Path,
) -> anyhow::Result<()> {
    // Minimal logging for CLI
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rengendoc=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let template_bytes = std::fs::read(template)
        .map_err(|e| anyhow::anyhow!("Failed to read template {}: {e}", template.display()))?;

    let context: Map<String, Value> = match context {
        Some(path) => {
            let content = std::fs::read(path)
                .map_err(|e| anyhow::anyhow!("Failed to read context {}: {e}", path.display()))?;
            match serde_json::from_slice(&content)? {
                Value::Object(map) => map,
                _ => anyhow::bail!("Context file must contain a JSON object"),
            }
        }
        None => Map::new(),
    };

    let rendered = TeraEngine::new().render(&template_bytes, &context)?;
    std::fs::write(output, &rendered)?;

    println!(
        "Rendered {} -> {} ({} bytes)",
        template.display(),
        output.display(),
        rendered.len()
    );

    Ok(())
}

/// Display status and configuration information
fn run_status_command(config_file: Option<&Path>) -> anyhow::Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let config = load_config(config_file, &ServeArgs::default())?;
    let storage = &config.storage;

    fn mask(value: Option<&str>) -> &'static str {
        match value {
            Some(_) => "(set)",
            None => "(not set)",
        }
    }

    println!("Rengendoc v{VERSION}");
    println!("Template rendering service with S3-compatible storage\n");

    println!("Configuration:");
    println!(
        "  Config file     = {}",
        config_file
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!("  Bind address    = {}", config.bind_addr);
    println!("  Max body        = {} bytes", config.max_body_bytes);
    println!("  Max template    = {} bytes", config.max_template_bytes);
    println!("  Fetch timeout   = {}s", config.fetch_timeout_secs);
    println!("  Storage timeout = {}s", config.storage_timeout_secs);

    println!("\nStorage:");
    println!("  Backend         = {:?}", storage.backend);
    println!(
        "  Endpoint        = {}",
        storage.endpoint_url().unwrap_or_else(|| "(not set)".to_string())
    );
    println!("  Bucket          = {}", storage.bucket_name);
    println!("  Region          = {}", storage.region);
    println!("  Access key      = {}", mask(storage.access_key.as_deref()));
    println!("  Secret key      = {}", mask(storage.secret_key.as_deref()));
    println!(
        "  Public URL      = {}",
        storage.public_base_url.as_deref().unwrap_or("(not set)")
    );
    println!("  Key strategy    = {:?}", storage.key_strategy);

    if let Err(e) = config.validate() {
        println!("\nConfiguration is incomplete: {e}");
    }

    // Commands section
    println!("\nCommands:");
    println!("  rengendoc serve    Start the HTTP server");
    println!("  rengendoc render   Render a template file locally");
    println!("\nRun 'rengendoc --help' for more details.");

    Ok(())
}

/// Run the HTTP server
async fn run_server(config_file: Option<&Path>, args: ServeArgs) -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rengendoc=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(config_file, &args)?;
    config.validate()?;

    tracing::info!(
        backend = ?config.storage.backend,
        bucket = %config.storage.bucket_name,
        max_body_bytes = config.max_body_bytes,
        max_template_bytes = config.max_template_bytes,
        "Configuration loaded"
    );

    let bind_addr = config.bind_addr.clone();

    // Create application state using shared server module
    let state = server::create_app_state(config)?;

    // Build router: start with shared API routes, add production-only routes
    let app = server::build_router(state)
        // OpenAPI documentation (production only)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Rengendoc server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
