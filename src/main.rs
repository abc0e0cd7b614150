//! Waypoint CLI
//!
//! Loads a router configuration, registers its route map against
//! placeholder targets and resolves every URL given on the command line.
//! Each result is printed as one JSON line.
//!
//! ```text
//! waypoint --config routes.toml /user/42 'app://settings?tab=privacy'
//! ```

use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use waypoint::config::{apply_routes, load_config};
use waypoint::navigation::{FnTarget, TargetCatalog};
use waypoint::observability::logging::init_logging;
use waypoint::{NavigationRequest, Router, RouterConfig};

#[derive(Parser)]
#[command(name = "waypoint")]
#[command(about = "Resolve URLs against a Waypoint route configuration", long_about = None)]
struct Cli {
    /// Route configuration (TOML, or JSON by extension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Namespace to resolve in, overriding the URL scheme
    #[arg(short, long)]
    namespace: Option<String>,

    /// Validate URLs against the deep-link policy first
    #[arg(long)]
    deep_link: bool,

    /// Print cache statistics after the last URL
    #[arg(long)]
    stats: bool,

    #[arg(required = true)]
    urls: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };
    init_logging(&config.observability)?;

    tracing::info!(
        routes = config.routes.len(),
        cache_capacity = config.cache.capacity,
        "waypoint v0.1.0 starting"
    );

    let mut catalog = TargetCatalog::new();
    for target in config.routes.values() {
        catalog.insert(Arc::new(FnTarget::named(target.clone())));
    }
    let routes = config.routes.clone();
    let router = Router::new(config);
    apply_routes(&router, &routes, &catalog)?;

    let mut failures = 0usize;
    for url in &cli.urls {
        let result = if cli.deep_link {
            router.open_deep_link(url).await
        } else {
            let mut request = NavigationRequest::new(url.as_str());
            if let Some(namespace) = &cli.namespace {
                request = request.namespace(namespace.clone());
            }
            router.navigate_with(request).await
        };

        let line = match result {
            Ok(navigation) => json!({
                "url": url,
                "ok": true,
                "pattern": navigation.pattern,
                "target": navigation.target,
                "parameters": navigation.parameters,
                "redirects": navigation.redirects,
                "from_cache": navigation.from_cache,
            }),
            Err(e) => {
                failures += 1;
                json!({
                    "url": url,
                    "ok": false,
                    "error": e.kind(),
                    "message": e.to_string(),
                })
            }
        };
        println!("{line}");
    }

    if cli.stats {
        println!("{}", serde_json::to_string(&router.cache_statistics())?);
    }

    if failures > 0 {
        tracing::warn!(failures, "Some URLs failed to resolve");
        std::process::exit(1);
    }
    Ok(())
}
