use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the command gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    /// Admin API key, as set in `admin.api_key`.
    #[arg(short, long)]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Status,
    /// Show the number of cached entries
    Cache,
    /// Remove a cache entry
    Evict { key: String },
    /// Show pending dispatches
    Dispatch,
    /// Look up an operation by request id
    Operation {
        request_id: String,
        /// Bearer token for the operation lookup.
        #[arg(long)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Status => client.get(format!("{base}/admin/status")).headers(headers).send().await?,
        Commands::Cache => client.get(format!("{base}/admin/cache")).headers(headers).send().await?,
        Commands::Evict { key } => {
            let res = client
                .delete(format!("{base}/admin/cache/{key}"))
                .headers(headers)
                .send()
                .await?;
            if res.status().is_success() {
                println!("Evicted '{key}'");
                return Ok(());
            }
            res
        }
        Commands::Dispatch => client.get(format!("{base}/admin/dispatch")).headers(headers).send().await?,
        Commands::Operation { request_id, token } => {
            let mut request = client.get(format!("{base}/operations/{request_id}"));
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            request.send().await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
