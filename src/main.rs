use clap::Parser;
use watchrun::Settings;
use watchrun::cli::commands::{config, resolve, watch};
use watchrun::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });

    watchrun::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Watch {
            debounce_ms,
            clear_screen,
            include,
            exclude,
            on_crash,
            program,
            args,
        } => {
            let args = watch::WatchArgs {
                debounce_ms,
                clear_screen,
                include,
                exclude,
                on_crash,
                program,
                args,
            };
            watch::run(args, &settings).await
        }

        Commands::Resolve {
            specifier,
            mode,
            from,
            json,
        } => resolve::run(resolve::ResolveArgs {
            specifier,
            mode,
            from,
            json,
        }),

        Commands::Config => config::run(&settings),
    }
}
