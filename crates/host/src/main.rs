use log::{error, info, warn};
use tradebridge_server::{
    EventSubscriber, PipeServer, ServerConfig, ServerEvent, load_config, load_default_config,
};

fn print_help() {
    eprintln!(
        r#"TradeBridge - local IPC hub for trading platform clients

USAGE:
    tradebridge [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter (default: info)

EXAMPLES:
    # Run with the embedded defaults (pipe name "TradingBridge")
    tradebridge

    # Run with config file
    tradebridge --config bridge.json
"#
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config: ServerConfig = match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            load_config(&path)?
        }
        None => {
            info!("Using default configuration");
            load_default_config()?
        }
    };

    let server = PipeServer::local(config);
    let events = server.subscribe();
    let logger = tokio::spawn(log_events(events));

    server.start().await;
    info!("TradeBridge running on pipe '{}', Ctrl-C to stop", server.pipe_name());

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    server.stop().await;
    drop(server);
    // The event stream closes once the server is gone
    if let Err(e) = logger.await {
        error!("Event logger failed: {}", e);
    }

    Ok(())
}

async fn log_events(mut events: EventSubscriber) {
    while let Some(event) = events.next().await {
        match event {
            ServerEvent::ClientConnected(status) => info!(
                "Client identified: {} ({}) session {}",
                status.client_name, status.platform, status.session_id
            ),
            ServerEvent::ClientDisconnected(status) => info!(
                "Client gone: {} ({}) session {}",
                status.client_name, status.platform, status.session_id
            ),
            ServerEvent::MessageReceived(message) => info!(
                "{} from {}{}",
                message.message_type(),
                message.source(),
                message
                    .symbol()
                    .map(|symbol| format!(" [{}]", symbol))
                    .unwrap_or_default()
            ),
            ServerEvent::ErrorOccurred(description) => warn!("{}", description),
        }
    }
}
