use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Management CLI for the admission guard", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, env = "GUARD_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show global usage and currently blocked clients
    Status,
    /// Clear the block and counters for a client
    Unblock {
        /// Client identifier (usually an IP address)
        ip: String,
    },
    /// Run an admission check as a client would
    Check {
        /// Send this value as X-Forwarded-For
        #[arg(long)]
        forwarded_for: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let endpoint = format!("{}/api/guard", cli.url.trim_end_matches('/'));

    let mut headers = HeaderMap::new();
    let (body, authenticated) = match &cli.command {
        Commands::Status => (json!({ "action": "status" }), true),
        Commands::Unblock { ip } => (json!({ "action": "unblock", "ip": ip }), true),
        Commands::Check { forwarded_for } => {
            if let Some(value) = forwarded_for {
                headers.insert("x-forwarded-for", HeaderValue::from_str(value)?);
            }
            (json!({ "action": "check" }), false)
        }
    };

    if authenticated {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
        );
    }

    let res = client.post(endpoint).headers(headers).json(&body).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(retry) = res.headers().get("retry-after").and_then(|v| v.to_str().ok()) {
        eprintln!("Retry-After: {}s", retry);
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }

    if !status.is_success() {
        eprintln!("Error: guard returned status {}", status);
        std::process::exit(1);
    }
    Ok(())
}
