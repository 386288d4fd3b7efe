use clap::Parser;
use std::process;

use solsh::chain::{Backend, ExternalProcessBackend, ExternalUrlBackend};
use solsh::cli;
use solsh::compiler::{CompilerCache, SolcCompiler, SolcRegistry};
use solsh::config;
use solsh::{Settings, Shell};

#[derive(Parser)]
#[command(
    name = "solsh",
    version,
    about = "An interactive Solidity shell backed by solc and a local EVM node"
)]
struct Cli {
    /// Connect to an existing JSON-RPC node instead of spawning one
    #[arg(long, value_name = "URL")]
    provider: Option<String>,

    /// Load a saved session by name before the first prompt
    #[arg(long, value_name = "NAME")]
    session: Option<String>,

    /// Start from default settings, ignoring the config file
    #[arg(long)]
    reset_config: bool,

    /// Print the config file path and exit
    #[arg(long)]
    show_config_file: bool,

    /// Everything after `--` is passed to the spawned node command
    #[arg(last = true, value_name = "NODE_ARGS")]
    chain_args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let config_dir = config::config_dir();
    let config_path = config_dir.join("config.json");

    if cli.show_config_file {
        println!("{}", config_path.display());
        return;
    }

    let mut settings = if cli.reset_config {
        Settings::default()
    } else {
        match Settings::load(&config_path) {
            Ok(settings) => settings,
            Err(error) => {
                eprintln!("error: {}", error);
                process::exit(1);
            }
        }
    };

    // `-- <args>` and `--provider` override settings for this run only; the
    // saved config keeps its own values.
    let saved_chain_args = settings.chain_args.clone();
    let saved_provider = (settings.provider_url.clone(), settings.autostart_chain);
    if !cli.chain_args.is_empty() {
        settings.chain_args = cli.chain_args.clone();
    }
    if let Some(url) = &cli.provider {
        settings.provider_url = url.clone();
        settings.autostart_chain = false;
    }

    let mut cache = CompilerCache::new(Box::new(SolcRegistry::from_settings(&settings)));
    match SolcCompiler::probe(&settings.solc_command) {
        Ok(installed) => cache.preseed(Box::new(installed)),
        Err(error) => eprintln!(
            "warning: no installed compiler found ({}); versions will be \
             resolved through the tools directory",
            error
        ),
    }

    let mut backend: Box<dyn Backend> = if settings.autostart_chain {
        Box::new(ExternalProcessBackend::from_settings(&settings))
    } else {
        Box::new(ExternalUrlBackend::new(&settings.provider_url, &settings))
    };
    if let Err(error) = backend.start() {
        eprintln!("warning: {}", error);
    }

    let mut shell = Shell::new(settings, cache, backend);

    if let Some(name) = &cli.session {
        match cli::load_session(&config_dir, name) {
            Ok(records) => shell.load_session(&records),
            Err(error) => {
                eprintln!("error: {}", error);
                process::exit(1);
            }
        }
    }

    let clean_exit = cli::repl::run(&mut shell, &config_dir);

    // The session is always autosaved, even on a dirty shutdown.
    if let Err(error) = cli::save_session(&config_dir, "previous", &shell.dump_session()) {
        eprintln!("warning: {}", error);
    }

    if !clean_exit {
        eprintln!("not saving config due to dirty shutdown");
        process::exit(1);
    }

    shell.settings.chain_args = saved_chain_args;
    if cli.provider.is_some() {
        (shell.settings.provider_url, shell.settings.autostart_chain) = saved_provider;
    }
    if let Err(error) = shell.settings.save(&config_path) {
        eprintln!("warning: {}", error);
    }
}
