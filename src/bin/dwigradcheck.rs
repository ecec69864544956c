use anyhow::Context;
use clap::Parser;
use dwigradcheck::{
    cli::Args,
    config::CheckConfig,
    mrtrix::MrtrixTools,
    search::run_search,
    tool_overrides::{Tool, active_resolution_label},
};
use tracing::debug;

fn init_logging(quiet: bool) {
    let default_filter = if quiet {
        "dwigradcheck=warn"
    } else {
        "dwigradcheck=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.quiet);

    let config = match &args.config {
        Some(path) => CheckConfig::from_path(path)
            .with_context(|| format!("Could not load configuration '{}'", path.display()))?,
        None => CheckConfig::default(),
    };
    config.apply_tool_overrides()?;
    for tool in Tool::ALL {
        debug!("{tool}: {}", active_resolution_label(tool));
    }

    let options = args.resolve(&config)?;
    let runner = args.runner(&config);
    let mut image_tools = MrtrixTools::new(runner.clone());
    let mut evaluator = MrtrixTools::new(runner);
    let report = run_search(&options, &mut image_tools, &mut evaluator)?;

    if args.json {
        let text = serde_json::to_string_pretty(&report)
            .context("Could not serialize JSON report")?;
        println!("{text}");
    } else {
        print!("{}", report.render_table());
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
