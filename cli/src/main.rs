//! secdomain: converge security domains on a WildFly / JBoss EAP server.
//!
//! # Usage
//!
//! ```text
//! secdomain create --name app --cache-type default --login-module RealmDirect:required
//! secdomain delete --name app
//! secdomain exists --name app
//! secdomain plan --name app --action delete
//! secdomain apply domains.yaml --why-run
//! secdomain config show
//! ```

mod output;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use secdomain_core::admin::builder::{build_create, build_delete};
use secdomain_core::admin::{AdminClient, AdminOperation};
use secdomain_core::convergence::Converger;
use secdomain_core::data::{manifest, settings};
use secdomain_core::infrastructure::ProcessRunner;
use secdomain_core::types::{DesiredAction, LoginModuleSpec, RuntimeConfig, SecurityDomainSpec};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use output::{render_json, render_outcome};


#[derive(Parser)]
#[command(name = "secdomain")]
#[command(author, version, about = "Declare and enforce application server security domains", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (default: $SECDOMAIN_CONFIG_DIR/config.yaml or ~/.config/secdomain/config.yaml)
    #[arg(long, global = true, env = "SECDOMAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Report what would change without running any side-effecting operation
    #[arg(long, global = true)]
    why_run: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}


#[derive(Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}


#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    Create,
    Delete,
}

impl From<ActionArg> for DesiredAction {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::Create => DesiredAction::Create,
            ActionArg::Delete => DesiredAction::Delete,
        }
    }
}


#[derive(Subcommand)]
enum Commands {
    /// Ensure a security domain exists
    Create(DomainArgs),
    /// Ensure a security domain does not exist
    Delete {
        #[arg(short, long)]
        name: String,
    },
    /// Exit 0 if the security domain exists, 1 if not
    Exists {
        #[arg(short, long)]
        name: String,
    },
    /// Print the operations a create or delete would emit, without contacting the server
    Plan {
        #[command(flatten)]
        domain: DomainArgs,
        #[arg(long, default_value = "create")]
        action: ActionArg,
    },
    /// Converge every security domain declared in a YAML file
    Apply {
        file: PathBuf,
    },
    /// Inspect or initialize settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}


#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective settings
    Show,
    /// Write default settings to the settings file
    Init {
        #[arg(long)]
        force: bool,
    },
}


#[derive(Args)]
struct DomainArgs {
    #[arg(short, long)]
    name: String,
    #[arg(long, default_value = "default")]
    cache_type: String,
    /// CODE:FLAG, repeatable; declare module options in a file used with `apply`
    #[arg(long = "login-module", value_name = "CODE:FLAG")]
    login_modules: Vec<String>,
}

impl DomainArgs {
    fn to_spec(&self) -> anyhow::Result<SecurityDomainSpec> {
        let modules = self
            .login_modules
            .iter()
            .map(|m| parse_login_module(m))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(SecurityDomainSpec::new(&self.name)?
            .with_cache_type(&self.cache_type)
            .with_login_modules(modules))
    }
}


fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("secdomain: {:#}", e);
            process::exit(2);
        }
    }
}


fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}


fn run(cli: Cli) -> anyhow::Result<i32> {
    let settings_path = match &cli.config {
        Some(path) => path.clone(),
        None => settings::resolve_config_dir()?.join(settings::CONFIG_FILE),
    };

    match &cli.command {
        Commands::Plan { domain, action } => {
            let ops = plan_operations(&domain.to_spec()?, (*action).into());
            match cli.format {
                OutputFormat::Text => {
                    for op in &ops {
                        println!("{}", op);
                    }
                }
                OutputFormat::Json => println!("{}", render_json(&ops)?),
            }
            return Ok(0);
        }
        Commands::Config { command } => return run_config(command, &settings_path, cli.format),
        _ => {}
    }

    let config = load_config(&settings_path)?;
    let converger = Converger::new(AdminClient::new(config, ProcessRunner)).why_run(cli.why_run);

    match cli.command {
        Commands::Create(domain) => {
            let outcome = converger.converge(&domain.to_spec()?, DesiredAction::Create)?;
            print_outcomes(&[outcome], cli.format)?;
        }
        Commands::Delete { name } => {
            let spec = SecurityDomainSpec::new(&name)?;
            let outcome = converger.converge(&spec, DesiredAction::Delete)?;
            print_outcomes(&[outcome], cli.format)?;
        }
        Commands::Exists { name } => {
            let exists = converger.prober().exists(&name)?;
            match cli.format {
                OutputFormat::Text => println!("{}", if exists { "present" } else { "absent" }),
                OutputFormat::Json => println!("{}", serde_json::json!({ "name": name, "exists": exists })),
            }
            return Ok(if exists { 0 } else { 1 });
        }
        Commands::Apply { file } => {
            let manifest = manifest::load(&file)?;
            let outcomes = manifest.converge_all(&converger)?;
            print_outcomes(&outcomes, cli.format)?;
        }
        Commands::Plan { .. } | Commands::Config { .. } => unreachable!("handled above"),
    }
    Ok(0)
}


fn run_config(command: &ConfigCommand, path: &Path, format: OutputFormat) -> anyhow::Result<i32> {
    match command {
        ConfigCommand::Show => {
            let config = load_config(path)?;
            match format {
                OutputFormat::Text => print!("{}", serde_yaml::to_string(&config)?),
                OutputFormat::Json => println!("{}", render_json(&config)?),
            }
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            settings::save(path, &RuntimeConfig::default())
                .with_context(|| format!("initializing {}", path.display()))?;
            println!("wrote {}", path.display());
        }
    }
    Ok(0)
}


fn load_config(path: &Path) -> anyhow::Result<RuntimeConfig> {
    let mut config = settings::load_or_default(path)?;
    settings::apply_env_overrides(&mut config);
    debug!(settings = %path.display(), base = %config.base_dir.display(), "resolved settings");
    Ok(config)
}


fn plan_operations(spec: &SecurityDomainSpec, action: DesiredAction) -> Vec<AdminOperation> {
    match action {
        DesiredAction::Create => build_create(spec),
        DesiredAction::Delete => vec![build_delete(spec)],
    }
}


fn print_outcomes(
    outcomes: &[secdomain_core::convergence::ConvergeOutcome],
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            for outcome in outcomes {
                println!("{}", render_outcome(outcome));
            }
        }
        OutputFormat::Json => println!("{}", render_json(&outcomes)?),
    }
    Ok(())
}


/// `CODE:FLAG`. The code may itself contain colons; the flag is after the
/// last one.
fn parse_login_module(arg: &str) -> anyhow::Result<LoginModuleSpec> {
    match arg.rsplit_once(':') {
        Some((code, flag)) if !code.is_empty() && !flag.is_empty() => {
            Ok(LoginModuleSpec::new(code, flag))
        }
        _ => bail!("invalid --login-module '{}': expected CODE:FLAG", arg),
    }
}
