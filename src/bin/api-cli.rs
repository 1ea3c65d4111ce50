use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "api-cli")]
#[command(about = "Client for a restful-api server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the route tree
    Info {
        #[arg(long, default_value = "/_info")]
        path: String,
    },
    /// Send one request and print the response
    Call {
        /// HTTP method, e.g. GET or POST
        method: String,
        /// Path below the server URL
        path: String,
        /// JSON body
        #[arg(short, long)]
        body: Option<String>,
        /// Query parameter as name=value; repeatable
        #[arg(short, long = "query", value_parser = parse_pair)]
        query: Vec<(String, String)>,
        /// Header as name=value; repeatable
        #[arg(short = 'H', long = "header", value_parser = parse_pair)]
        headers: Vec<(String, String)>,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Info { path } => {
            let res = client.get(format!("{}{}", cli.url, path)).send().await?;
            print_response(res).await?;
        }
        Commands::Call {
            method,
            path,
            body,
            query,
            headers,
        } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
            let mut req = client
                .request(method, format!("{}{}", cli.url, path))
                .query(&query);
            for (name, value) in headers {
                req = req.header(name, value);
            }
            if let Some(body) = body {
                let json: Value = serde_json::from_str(&body)?;
                req = req.json(&json);
            }
            print_response(req.send().await?).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if text.is_empty() => println!("({})", status),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
