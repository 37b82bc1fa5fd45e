use pagewright_server::rotate::ShellRotator;
use pagewright_server::server::{router, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let mut port: u16 = 3000;
    let mut root_dir = std::env::current_dir()?;
    let mut data_file: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    port = args[i + 1].parse().expect("Invalid port number");
                    i += 2;
                } else {
                    eprintln!("--port requires a value");
                    std::process::exit(1);
                }
            }
            "--data-file" => {
                if i + 1 < args.len() {
                    data_file = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("--data-file requires a value");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                println!("Usage: pagewright-server [OPTIONS] [ROOT_DIR]");
                println!();
                println!("Options:");
                println!("  -p, --port <PORT>       Port to listen on (default: 3000)");
                println!("  --data-file <FILE>      Structured data file (default: ROOT_DIR/data/site.json)");
                println!("  -h, --help              Show this help message");
                println!();
                println!("Arguments:");
                println!("  [ROOT_DIR]              Site root to serve and save into (default: current dir)");
                std::process::exit(0);
            }
            arg if !arg.starts_with('-') => {
                root_dir = PathBuf::from(arg);
                i += 1;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                std::process::exit(1);
            }
        }
    }

    let root_dir = root_dir.canonicalize()?;
    let data_file = data_file.unwrap_or_else(|| root_dir.join("data/site.json"));

    println!("Starting Pagewright save server...");
    println!("Site root: {:?}", root_dir);
    println!("Data file: {:?}", data_file);
    println!("Listening on http://127.0.0.1:{}", port);

    let state = AppState {
        root: root_dir,
        data_file,
        rotator: Arc::new(ShellRotator),
    };

    let addr: SocketAddr = format!("127.0.0.1:{}", port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
