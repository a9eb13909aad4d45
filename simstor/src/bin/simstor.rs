use std::{
    env,
    io::{self, Read, Write},
    net::SocketAddr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use metrics::gauge;
use simstor::{
    config::{self, CONFIG_ENV, Config},
    generator, host, signal,
    sink::{self, Http, Logger},
    telemetry::{self, Telemetry},
};
use tokio::{
    runtime::Builder,
    task::JoinSet,
    time::{self, sleep},
};
use tracing::{Instrument, debug, error, info, info_span};
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Simstor configuration is invalid: {0}")]
    Config(#[from] config::Error),
    #[error("Simstor generator returned an error: {0}")]
    Generator(#[from] generator::Error),
    #[error("Simstor sink could not be built: {0}")]
    Sink(#[from] sink::Error),
    #[error("Simstor telemetry could not be installed: {0}")]
    Telemetry(#[from] telemetry::Error),
    #[error("Parsing Prometheus address failed: {0}")]
    PrometheusAddr(#[from] std::net::AddrParseError),
    #[error("Failed to serialize event: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Registration(#[from] signal::RegisterError),
}

fn default_config_path() -> String {
    "/etc/simstor/simstor.yaml".to_string()
}

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate events until interrupted or the duration elapses
    Run(RunCommand),
    /// Validate configuration file and exit
    ConfigCheck(ConfigCheckCommand),
    /// Print seeded events as JSON lines and exit
    Sample(SampleCommand),
}

#[derive(Args)]
struct RunCommand {
    /// path on disk to the configuration file
    #[clap(long, default_value_t = default_config_path())]
    config_path: String,
    /// address to bind prometheus exporter to, overrides the configuration
    #[clap(long)]
    prometheus_addr: Option<String>,
    /// seed for the event stream, overrides the configuration
    #[clap(long)]
    seed_u64: Option<u64>,
    /// the time, in seconds, to generate events for, forever when absent
    #[clap(long)]
    duration_seconds: Option<u64>,
    /// the maximum time to wait, in seconds, for controlled shutdown
    #[clap(long, default_value_t = 30)]
    max_shutdown_delay: u16,
}

#[derive(Args)]
struct ConfigCheckCommand {
    /// path on disk to the configuration file
    #[clap(long, default_value_t = default_config_path())]
    config_path: String,
}

#[derive(Args)]
struct SampleCommand {
    /// number of events to print
    #[clap(long, default_value_t = 10)]
    count: usize,
    /// seed for the event stream
    #[clap(long, default_value_t = 0)]
    seed_u64: u64,
    /// path on disk to the configuration file, built-in catalogs when absent
    #[clap(long)]
    config_path: Option<String>,
}

fn load_config_contents(config_path: &str) -> Result<String, Error> {
    if let Ok(env_var_value) = env::var(CONFIG_ENV) {
        debug!("Using config from env var '{CONFIG_ENV}'");
        Ok(env_var_value)
    } else {
        debug!("Attempting to open configuration file at: {config_path}");
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .open(config_path)
            .map_err(|err| {
                error!("Could not read config file '{config_path}': {err}");
                err
            })?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Ok(contents)
    }
}

fn parse_config(contents: &str) -> Result<Config, Error> {
    config::parse(contents).map_err(|err| {
        error!("Configuration validation failed: {err}");
        Error::Config(err)
    })
}

fn get_config(args: &RunCommand, config: Option<String>) -> Result<Config, Error> {
    let contents = if let Some(config) = config {
        config
    } else {
        load_config_contents(&args.config_path)?
    };
    let mut config = parse_config(&contents)?;

    if let Some(ref prom_addr) = args.prometheus_addr {
        let addr: SocketAddr = prom_addr.parse()?;
        config.telemetry = match config.telemetry {
            Telemetry::Prometheus { global_labels, .. } => Telemetry::Prometheus {
                addr,
                global_labels,
            },
            Telemetry::None => Telemetry::Prometheus {
                addr,
                global_labels: rustc_hash::FxHashMap::default(),
            },
        };
    }
    Ok(config)
}

fn sample(args: &SampleCommand) -> Result<(), Error> {
    let config = match &args.config_path {
        Some(path) => parse_config(&load_config_contents(path)?)?,
        None => Config::default(),
    };
    let mut synthesizer = config.synthesizer()?;
    let mut rng = generator::rng(Some(args.seed_u64), None);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for _ in 0..args.count {
        let event = synthesizer.generate(&mut rng);
        writeln!(out, "{}", serde_json::to_string(&event)?)?;
    }
    out.flush()?;
    Ok(())
}

async fn inner_main(
    duration: Option<Duration>,
    seed_u64: Option<u64>,
    config: Config,
) -> Result<(), Error> {
    let (shutdown_watcher, shutdown_broadcast) = signal::signal();

    telemetry::install(&config.telemetry)?;

    //
    // GENERATOR
    //
    let mut gsrv_joinset = JoinSet::new();
    let synthesizer = config.synthesizer()?;
    let rng = generator::rng(seed_u64, config.seed);
    match &config.sink {
        sink::Config::Tracing => {
            let server = generator::Server::new(
                &config.generator,
                synthesizer,
                rng,
                Logger,
                shutdown_watcher.register()?,
            )?;
            gsrv_joinset.spawn(server.spin());
        }
        sink::Config::Http(http) => {
            let sink = Http::new(http, &shutdown_watcher).map_err(sink::Error::from)?;
            let server = generator::Server::new(
                &config.generator,
                synthesizer,
                rng,
                sink,
                shutdown_watcher.register()?,
            )?;
            gsrv_joinset.spawn(server.spin());
        }
    }

    //
    // HOST SAMPLER
    //
    if let Some(host_config) = config.host_sampler {
        let host_server = host::Server::new(host_config, shutdown_watcher.register()?);
        tokio::spawn(host_server.run());
    }

    let (timer_watcher, timer_broadcast) = signal::signal();
    let _idle_timer = match duration {
        Some(duration) => {
            tokio::spawn(
                async move {
                    sleep(duration).await;
                    info!("run duration exceeded, signaling for shutdown");
                    timer_broadcast.signal();
                }
                .instrument(info_span!("run_timer")),
            );
            None
        }
        // without a duration the timer never fires
        None => Some(timer_broadcast),
    };

    // Any watcher left derived from `shutdown_watcher` would hold
    // `signal_and_wait` open forever.
    drop(shutdown_watcher);
    let timer_watcher_wait = timer_watcher.recv();
    tokio::pin!(timer_watcher_wait);
    let mut interval = time::interval(Duration::from_millis(400));
    let res = loop {
        tokio::select! {
            _ = interval.tick() => {
                gauge!(telemetry::RUNNING).set(1.0);
            },
            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c");
                break Ok(());
            },
            () = &mut timer_watcher_wait => {
                info!("shutdown signal received.");
                break Ok(());
            }
            Some(res) = gsrv_joinset.join_next() => {
                match res {
                    Ok(Ok(())) => break Ok(()),
                    Ok(Err(err)) => {
                        error!("Generator shut down unexpectedly: {err}");
                        break Err(Error::Generator(err));
                    }
                    Err(err) => error!("Could not join the spawned generator task: {err}"),
                }
            },
        }
    };
    shutdown_broadcast.signal_and_wait().await;
    res
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .finish()
        .init();

    let args = match Cli::parse().command {
        Commands::Run(args) => args,
        Commands::ConfigCheck(check) => {
            let res = load_config_contents(&check.config_path).and_then(|c| parse_config(&c));
            match res {
                Ok(_) => {
                    info!("Configuration file is valid");
                    std::process::exit(0)
                }
                Err(_) => std::process::exit(1),
            }
        }
        Commands::Sample(args) => return sample(&args),
    };

    let version = env!("CARGO_PKG_VERSION");
    info!("Starting simstor {version} run.");

    let config = get_config(&args, None)?;
    let duration = args.duration_seconds.map(Duration::from_secs);
    let max_shutdown_delay = Duration::from_secs(args.max_shutdown_delay.into());

    let runtime = Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()?;
    let res = runtime.block_on(inner_main(duration, args.seed_u64, config));
    info!(
        "Shutting down runtime with a {} second delay. May leave orphaned tasks.",
        max_shutdown_delay.as_secs(),
    );
    runtime.shutdown_timeout(max_shutdown_delay);
    info!("Bye. :)");
    res
}
