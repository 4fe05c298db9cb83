use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use vitals::observability::metrics::find_sample;

#[derive(Parser)]
#[command(name = "vitals-probe")]
#[command(about = "Probe a running vitals service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    url: String,

    /// Request timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query /api/v1/healthz; exits non-zero when unhealthy
    Health,
    /// Query /api/v1/livez
    Live,
    /// Show instance information
    Info,
    /// Dump the Prometheus exposition, or print one series with --series
    Metrics {
        #[arg(long, default_value = "/metrics")]
        path: String,

        /// Print only the value of this series (e.g. http_requests_total)
        #[arg(long)]
        series: Option<String>,

        /// Label filter for --series, as name=value; repeatable
        #[arg(long = "label", value_parser = parse_label, requires = "series")]
        labels: Vec<(String, String)>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match probe(&cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

async fn probe(cli: &Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(cli.timeout))
        .build()?;
    let base = cli.url.trim_end_matches('/');

    match &cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/api/v1/healthz", base)).send().await?;
            print_json(res).await
        }
        Commands::Live => {
            let res = client.get(format!("{}/api/v1/livez", base)).send().await?;
            print_json(res).await
        }
        Commands::Info => {
            let res = client.get(format!("{}/api/v1/info", base)).send().await?;
            print_json(res).await
        }
        Commands::Metrics {
            path,
            series,
            labels,
        } => {
            let res = client.get(format!("{}{}", base, path)).send().await?;
            let status = res.status();
            let text = res.text().await?;
            if !status.is_success() {
                eprintln!("Error: service returned status {}", status);
                eprintln!("Response: {}", text);
                return Ok(false);
            }
            let Some(series) = series else {
                print!("{}", text);
                return Ok(true);
            };
            let labels: Vec<(&str, &str)> = labels
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str()))
                .collect();
            match find_sample(&text, series, &labels) {
                Some(value) => {
                    println!("{}", value);
                    Ok(true)
                }
                None => {
                    eprintln!("Error: no sample for {}", series);
                    Ok(false)
                }
            }
        }
    }
}

fn parse_label(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}

/// Pretty-print a JSON body; returns whether the status was a success.
async fn print_json(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
    }
    Ok(status.is_success())
}
