// # dnsleased - lease coordination daemon
//
// Thin integration layer: reads configuration from environment
// variables, wires the selected backend and health oracle into the
// coordinator from dnslease-core, and dispatches the CLI subcommands.
// All coordination logic lives in dnslease-core.
//
// ## Configuration
//
// Everything comes from environment variables:
//
// ### Core
// - `ROLE`: primary | dr
// - `DNS_PROVIDER`: dry-run | cloudflare | bind-tsig | script
// - `DNS_ZONE`, `DNS_RECORD`, `DNS_TTL`, `DNS_SERVER`
// - `PRIMARY_IP`, `DR_IP`
// - `LEASE_TTL`, `UPDATE_INTERVAL`, `FAIL_THRESHOLD`
//
// ### Health (DR role)
// - `HEALTH_MODE`: tcp | metrics
// - tcp: `HEALTH_HOST`, `HEALTH_PORT`, `HEALTH_TIMEOUT`
// - metrics: `HEALTH_URL`, `HEALTH_METRIC`, `HEALTH_STALE_COUNT`,
//   `HEALTH_TIMEOUT`
//
// ### Providers
// - dry-run: `DRYRUN_STATEFILE`
// - cloudflare: `CLOUDFLARE_API_TOKEN`, `CLOUDFLARE_ZONE_ID`
// - bind-tsig: `TSIG_KEYFILE`
// - script: `SCRIPT_SET`, `SCRIPT_GET`
//
// ## Example
//
// ```bash
// export ROLE=dr
// export DNS_PROVIDER=bind-tsig
// export DNS_RECORD=syslog.ast.example.local
// export PRIMARY_IP=10.10.10.10
// export DR_IP=10.20.20.10
//
// dnsleased run
// ```

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use dnslease_core::{
    backend, health, BackendRegistry, Coordinator, Error, FailoverConfig, Site, SystemClock,
};

/// Exit codes for the CLI contract
///
/// - 0: success
/// - 2: configuration error
/// - 3: backend error
/// - 4: precondition error (e.g. `init` refused)
#[derive(Debug, Clone, Copy)]
enum CliExitCode {
    Success = 0,
    ConfigError = 2,
    BackendError = 3,
    PreconditionError = 4,
}

impl From<CliExitCode> for ExitCode {
    fn from(code: CliExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// DNS-lease failover coordination daemon
#[derive(Parser, Debug)]
#[command(name = "dnsleased", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the initial records for this site's role
    Init {
        /// Overwrite even when a valid lease owned by the other site exists
        #[arg(long)]
        force: bool,
    },
    /// Run the role-selected coordination loop (default)
    Run,
    /// Print the current lease state as JSON
    Show,
    /// Operator failover: designate the DR site active
    Promote,
    /// Operator failback: restore the primary site as active
    Failback,
    /// Check the configuration and exit
    Validate,
}

fn init_tracing() -> Result<(), CliExitCode> {
    let level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => {
            eprintln!("LOG_LEVEL {other:?} is not valid. Valid levels: trace, debug, info, warn, error");
            return Err(CliExitCode::ConfigError);
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return Err(CliExitCode::ConfigError);
    }
    Ok(())
}

fn exit_code_for(error: &Error) -> CliExitCode {
    match error {
        Error::Config(_) => CliExitCode::ConfigError,
        Error::Precondition(_) => CliExitCode::PreconditionError,
        _ => CliExitCode::BackendError,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(code) = init_tracing() {
        return code.into();
    }

    let config = match FailoverConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return CliExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration invalid: {e}");
        return CliExitCode::ConfigError.into();
    }

    let command = cli.command.unwrap_or(Command::Run);

    // `validate` needs no backend and must not touch the network.
    if let Command::Validate = command {
        println!("Configuration valid");
        let summary = serde_json::json!({
            "role": config.role,
            "provider": config.backend.type_name(),
            "dns_record": config.dns_record,
            "primary_ip": config.primary_ip,
            "dr_ip": config.dr_ip,
        });
        println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_default());
        return CliExitCode::Success.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return CliExitCode::BackendError.into();
        }
    };

    let code = rt.block_on(run_command(command, config));
    code.into()
}

async fn run_command(command: Command, config: FailoverConfig) -> CliExitCode {
    let registry = BackendRegistry::new();
    backend::register_builtin(&registry);
    dnslease_backend_cloudflare::register(&registry);
    dnslease_backend_bind::register(&registry);
    dnslease_backend_script::register(&registry);

    let dns_backend = match registry.create(&config) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Backend setup failed: {e}");
            return exit_code_for(&e);
        }
    };

    // Only the DR loop consults the health oracle.
    let health_check = if config.role == Site::Dr {
        match health::build(&config.health) {
            Ok(check) => Some(check),
            Err(e) => {
                eprintln!("Health oracle setup failed: {e}");
                return exit_code_for(&e);
            }
        }
    } else {
        None
    };

    let (mut coordinator, _events) =
        match Coordinator::new(dns_backend, health_check, config, Arc::new(SystemClock)) {
            Ok(pair) => pair,
            Err(e) => {
                eprintln!("Coordinator setup failed: {e}");
                return exit_code_for(&e);
            }
        };

    let result = match command {
        Command::Init { force } => coordinator.init(force).await,
        Command::Promote => coordinator.promote().await,
        Command::Failback => coordinator.failback().await,
        Command::Show => {
            let summary = coordinator.show().await;
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => {
                    println!("{json}");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
        Command::Run => {
            info!("starting dnsleased");
            coordinator.run().await
        }
        Command::Validate => unreachable!("handled before the runtime starts"),
    };

    match result {
        Ok(()) => CliExitCode::Success,
        Err(e) => {
            error!("{e}");
            exit_code_for(&e)
        }
    }
}
