use anyhow::{Context, Result};
use clap::Parser;
use covscope::cli::{Cli, OutputFormat};
use covscope::config::CoverageConfig;
use covscope::discovery::{
    DiscoveryOptions, ElfModuleReader, ModuleDiscovery, Sha256Hasher, TraversalState,
};
use covscope::filter::{Filter, FilterBuilder};
use covscope::scope::ModuleVerdict;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Fold command-line settings over the config file (CLI rules are appended)
fn merge_config(args: &Cli) -> Result<CoverageConfig> {
    let mut config = match &args.config {
        Some(path) => CoverageConfig::from_toml(path)?,
        None => CoverageConfig::default(),
    };

    let filters = &mut config.filters;
    if args.no_default_filters {
        filters.default_filters = false;
    }
    filters.coverage.extend(args.filters.iter().cloned());
    filters
        .exclude_by_file
        .extend(args.exclude_by_file.iter().cloned());
    filters
        .exclude_by_attribute
        .extend(args.exclude_by_attribute.iter().cloned());

    if let Some(max) = args.max_concurrency {
        config.discovery.max_concurrency = Some(max as usize);
    }
    config
        .discovery
        .search_paths
        .extend(args.search_paths.iter().cloned());

    Ok(config)
}

fn build_filter(config: &CoverageConfig) -> Result<Filter> {
    let builder = FilterBuilder::from_config(&config.filters)?;
    Ok(builder.build())
}

fn run(args: &Cli) -> Result<()> {
    let config = merge_config(args)?;
    let filter = build_filter(&config)?;

    let options = config
        .discovery
        .max_concurrency
        .map(|max_concurrency| DiscoveryOptions { max_concurrency })
        .unwrap_or_default();
    let reader = ElfModuleReader::with_search_paths(config.discovery.search_paths.clone());
    let discovery = ModuleDiscovery::new(reader, Sha256Hasher).with_options(options);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut in_scope = 0usize;
    let mut total = 0usize;

    let mut run = discovery.discover(args.seed.clone());
    for module in run.by_ref() {
        let module = module.with_context(|| {
            format!("Module discovery from {} failed", args.seed.display())
        })?;
        let verdict = ModuleVerdict::evaluate(&filter, &module);
        total += 1;
        if verdict.in_scope {
            in_scope += 1;
        }

        match args.format {
            OutputFormat::Text => writeln!(out, "{}", verdict.to_text_line())?,
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&verdict)?)?,
        }
    }

    if run.state() != TraversalState::Completed {
        anyhow::bail!("Module discovery ended in state {:?}", run.state());
    }

    tracing::info!(total, in_scope, "discovery complete");
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    run(&args)
}
