use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chord_node::frontend::Frontend;
use chord_node::logging::init_logging;
use chord_node::logging::LogLevel;
use chord_node::native::config::normalize_args;
use chord_node::native::config::Config;
use chord_node::native::config::Settings;
use chord_node::native::endpoint;
use chord_node::processor::ProcessorBuilder;
use clap::Parser;
use tokio::io;
use tokio_util::sync::CancellationToken;

/// Exit code of a rejected configuration.
const EXIT_INVALID_CONFIG: u8 = 2;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(about, version, author)]
struct Cli {
    #[arg(short = 'a', long = "addr", env = "CHORD_ADDR", help = "IP address this node binds")]
    addr: Option<String>,

    #[arg(short = 'p', long = "port", env = "CHORD_PORT", help = "Port this node binds, 1024-65535")]
    port: Option<u32>,

    #[arg(long = "ja", help = "IP address of a ring member to join")]
    join_addr: Option<String>,

    #[arg(long = "jp", help = "Port of a ring member to join")]
    join_port: Option<u32>,

    #[arg(long = "ts", help = "Milliseconds between stabilize runs, 1-60000")]
    stabilize_ms: Option<u64>,

    #[arg(long = "tff", help = "Milliseconds between fix fingers runs, 1-60000")]
    fix_fingers_ms: Option<u64>,

    #[arg(long = "tcp", help = "Milliseconds between check predecessor runs, 1-60000")]
    check_predecessor_ms: Option<u64>,

    #[arg(short = 'r', long = "successors", help = "Successor list length, 1-32")]
    successors: Option<u32>,

    #[arg(short = 'i', long = "id", help = "Identifier override, 40 hex characters")]
    id: Option<String>,

    #[arg(long, env = "CHORD_DATA_DIR", help = "Directory files are stored under")]
    data_dir: Option<String>,

    #[arg(long, env = "CHORD_RPC_TIMEOUT_MS", help = "Timeout of one outbound call attempt")]
    rpc_timeout_ms: Option<u64>,

    #[arg(long, value_enum, env = "CHORD_LOG_LEVEL")]
    log_level: Option<LogLevel>,

    #[arg(long, short = 'c', env = "CHORD_CONFIG", help = "YAML config file, flags override it")]
    config_file: Option<PathBuf>,

    #[arg(long, help = "Save the merged configuration to this YAML file and exit")]
    save_config: Option<PathBuf>,
}

impl Cli {
    fn config(self) -> anyhow::Result<Config> {
        let file = match &self.config_file {
            Some(path) => Config::read_fs(path)?,
            None => Config::default(),
        };
        let cli = Config {
            addr: self.addr,
            port: self.port,
            join_addr: self.join_addr,
            join_port: self.join_port,
            stabilize_ms: self.stabilize_ms,
            fix_fingers_ms: self.fix_fingers_ms,
            check_predecessor_ms: self.check_predecessor_ms,
            successors: self.successors,
            id: self.id,
            data_dir: self.data_dir,
            rpc_timeout_ms: self.rpc_timeout_ms,
            log_level: self.log_level,
        };
        Ok(cli.or(file))
    }
}

async fn daemon_run(settings: Settings) -> anyhow::Result<()> {
    let processor = Arc::new(ProcessorBuilder::from_settings(&settings).build()?);
    let listener = endpoint::bind(settings.bind)?;
    println!("Did: {}", processor.did());
    println!("Listening on {}", settings.bind);

    if let Some(join) = settings.join {
        println!("Joining the ring via {}", join);
    }
    processor.bootstrap(settings.join).await?;

    let token = CancellationToken::new();

    let stabilizer = {
        let processor = processor.clone();
        let token = token.clone();
        tokio::spawn(async move { processor.listen(token).await })
    };

    let frontend = {
        let frontend = Frontend::new(processor.clone());
        let token = token.clone();
        tokio::spawn(async move {
            let stdin = io::BufReader::new(io::stdin());
            if let Err(e) = frontend.run(stdin, std::io::stdout(), token).await {
                tracing::error!("control plane stopped: {}", e);
            }
        })
    };

    let ctrl_c = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                ret = tokio::signal::ctrl_c() => {
                    if let Err(e) = ret {
                        tracing::error!("failed to listen for ctrl-c: {}", e);
                    }
                    tracing::info!("shutting down");
                    token.cancel();
                }
            }
        })
    };

    let served = endpoint::run_http_api(listener, processor, token.clone()).await;
    token.cancel();
    let _ = futures::join!(stabilizer, ctrl_c);
    frontend.abort();
    served
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let mut cli = Cli::parse_from(normalize_args(std::env::args()));
    let save_config = cli.save_config.take();
    let (config, settings) = match cli
        .config()
        .and_then(|c| c.validate().map(|s| (c, s)).map_err(Into::into))
    {
        Ok(ret) => ret,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_INVALID_CONFIG);
        }
    };

    if let Some(path) = save_config {
        return match config.write_fs(&path) {
            Ok(p) => {
                println!("Your config file has saved to: {}", p);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        };
    }
    init_logging(settings.log_level);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let ret = runtime.block_on(daemon_run(settings));
    // A blocked stdin read would otherwise hold the runtime forever.
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
    match ret {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:?}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
