use clap::Parser;
use tracing_subscriber::EnvFilter;

use getcoubctl::OutputFormat;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = getcoubctl::Cli::parse();
    let format = cli.format;
    match getcoubctl::run(cli).await {
        Ok(output) => match format {
            OutputFormat::Text => println!("Completed: {}", output.display()),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "output": output }));
            }
        },
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}
