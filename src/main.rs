use clap::Parser;
use promptpit::cli::{
    handle_completions, handle_config_init, handle_models, handle_providers_list, run_serve, Cli,
    Commands, ConfigCommands, ProvidersCommands,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Providers(cmd) => match cmd {
            ProvidersCommands::List(args) => handle_providers_list(&args),
        },
        Commands::Models(args) => handle_models(&args),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
