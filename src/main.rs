use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use psst::cli::commands;
use psst::cli::{output, AppContext, Cli, Commands};
use psst::errors::Result;

fn main() {
    let cli = Cli::parse();

    // Diagnostics go to stderr; stdout is reserved for command output.
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to install log subscriber");
    }

    if let Err(e) = run(&cli) {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let ctx = AppContext::from_cli(cli)?;
    debug!(
        home = %ctx.home.display(),
        vault = %ctx.vault_path().display(),
        auto_lock_secs = ctx.settings.auto_lock_timeout().as_secs(),
        "resolved configuration"
    );

    match &cli.command {
        Commands::Init { force } => commands::init::execute(&ctx, *force),
        Commands::Add { service, fields } => commands::add::execute(&ctx, service, fields),
        Commands::Get { service } => commands::get::execute(&ctx, service),
        Commands::List => commands::list::execute(&ctx),
        Commands::Update {
            service,
            fields,
            password,
        } => commands::update::execute(&ctx, service, fields, *password),
        Commands::Delete { service, force } => commands::delete::execute(&ctx, service, *force),
    }
}
