use clap::Parser;
use edict::cli::{AppContext, Cli, Commands};
use edict::core::edit::finish_with_exit;

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.no_color);

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };

    let result = match cli.command {
        Commands::Parse(args) => edict::parse_run(args, &ctx),
        Commands::Apply(args) => edict::apply_run(args, &ctx),
        Commands::Snapshot(args) => edict::snapshot_run(args, &ctx),
        Commands::Prompt(args) => edict::prompt_run(args, &ctx),
        Commands::Init(args) => edict::infra::config::init(args, &ctx),
        Commands::Completions(args) => edict::completion::run(args, &ctx),
    };

    finish_with_exit(result)
}

/// Logs go to stderr so stdout stays clean for JSON and reprompts.
fn init_logging(verbose: bool, no_color: bool) {
    let default = if verbose { "edict=debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .init();

    if no_color {
        let _ = miette::set_hook(Box::new(|_| {
            Box::new(miette::MietteHandlerOpts::new().color(false).build())
        }));
    }
}
