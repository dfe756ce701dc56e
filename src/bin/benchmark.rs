use colored::*;
use governor::{Quota, RateLimiter};
use hdrhistogram::Histogram;
use reqwest::Client;
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const DURATION_SECS: u64 = 20;

struct Target {
    name: &'static str,
    method: &'static str,
    url: String,
    body: Option<serde_json::Value>,
}

/// Load generator against a running server. Log-in credentials come from the
/// same `BOOTSTRAP_STAFF_*` variables the server uses to seed its first account.
#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let base_url = std::env::var("BENCH_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let email = std::env::var("BOOTSTRAP_STAFF_EMAIL").unwrap_or_else(|_| "staff@eventhub.local".to_string());
    let password = std::env::var("BOOTSTRAP_STAFF_PASSWORD").unwrap_or_else(|_| "change-me-please".to_string());

    println!("{}", "🚀 Starting Benchmark Suite".bold().green());
    println!("Target URL: {}", base_url);

    let client = Client::builder()
        .pool_max_idle_per_host(1000)
        .timeout(Duration::from_secs(10))
        .cookie_store(true)
        .build()
        .unwrap();

    if client.get(format!("{}/health", base_url)).send().await.is_err() {
        eprintln!("{}", format!("❌ Server is NOT reachable at {}. Please start it first.", base_url).red().bold());
        return;
    }

    println!("\n{}", "⚙️  Checking benchmark data...".yellow());
    let login_body = json!({ "email": email, "password": password });
    let login_res = client.post(format!("{}/api/v1/auth/login", base_url))
        .json(&login_body)
        .send()
        .await
        .expect("Login failed during setup");
    if !login_res.status().is_success() {
        panic!("Login failed (is BOOTSTRAP_STAFF_* set on the server?). Status: {}", login_res.status());
    }

    let events: Value = client.get(format!("{}/api/v1/events", base_url))
        .send()
        .await
        .expect("Failed to list events")
        .json()
        .await
        .expect("Failed to parse event list");
    let first_event = events.as_array()
        .and_then(|list| list.first())
        .and_then(|e| e["id"].as_str())
        .map(str::to_string);

    println!("{}", "✅ Setup complete.".green());

    let mut targets = vec![
        Target {
            name: "Health Check (Public)",
            method: "GET",
            url: format!("{}/health", base_url),
            body: None,
        },
        Target {
            name: "List Published Events (Public Read)",
            method: "GET",
            url: format!("{}/api/v1/events?upcoming=true", base_url),
            body: None,
        },
        Target {
            name: "List Categories (Public Read)",
            method: "GET",
            url: format!("{}/api/v1/categories", base_url),
            body: None,
        },
        Target {
            name: "Login Flow (Crypto Intensive)",
            method: "POST",
            url: format!("{}/api/v1/auth/login", base_url),
            body: Some(login_body),
        },
    ];

    match first_event {
        Some(event_id) => targets.insert(2, Target {
            name: "Get Event Details (Joins + Counts)",
            method: "GET",
            url: format!("{}/api/v1/events/{}", base_url, event_id),
            body: None,
        }),
        None => println!("{}", "   No published event found, skipping detail benchmark.".yellow()),
    }

    let rps_stages = vec![10, 50, 200, 1000];

    for target in targets {
        println!("\n{}", "=".repeat(60));
        println!("Benchmarking Endpoint: {}", target.name.cyan().bold());
        println!("URL: {}", target.url);
        println!("{}", "=".repeat(60));

        println!("{:<10} | {:<15} | {:<15} | {:<15}", "RPS", "Mean (ms)", "P99 (ms)", "Success Rate");
        println!("{:-<10}-+-{:-<15}-+-{:-<15}-+-{:-<15}", "", "", "", "");

        for &rps in &rps_stages {
            run_stage(&client, &target, rps).await;
        }
    }
}

async fn run_stage(client: &Client, target: &Target, rps: u32) {
    let limiter = Arc::new(RateLimiter::direct(
        Quota::per_second(NonZeroU32::new(rps).unwrap())
    ));

    let (tx, mut rx) = mpsc::channel(50000);
    let start_time = Instant::now();
    let duration = Duration::from_secs(DURATION_SECS);

    while start_time.elapsed() <= duration {
        if limiter.check().is_err() {
            tokio::task::yield_now().await;
            continue;
        }

        let client = client.clone();
        let url = target.url.clone();
        let body = target.body.clone();
        let method = target.method;
        let tx = tx.clone();

        tokio::spawn(async move {
            let req_start = Instant::now();
            let res = match (method, body) {
                ("POST", Some(b)) => client.post(&url).json(&b).send().await,
                ("POST", None) => client.post(&url).send().await,
                _ => client.get(&url).send().await,
            };
            let latency = req_start.elapsed();
            let success = res.map(|r| r.status().is_success()).unwrap_or(false);

            let _ = tx.send((latency, success)).await;
        });
    }

    drop(tx);

    let mut histogram = Histogram::<u64>::new(3).unwrap();
    let mut successes = 0;
    let mut total = 0;

    while let Some((latency, success)) = rx.recv().await {
        total += 1;
        if success { successes += 1; }
        histogram.record(latency.as_micros() as u64).unwrap();
    }

    let mean_ms = histogram.mean() / 1000.0;
    let p99_ms = histogram.value_at_quantile(0.99) as f64 / 1000.0;
    let success_rate = if total > 0 { (successes as f64 / total as f64) * 100.0 } else { 0.0 };

    println!(
        "{:<10} | {:<15.2} | {:<15.2} | {:<14.1}%",
        rps,
        mean_ms,
        p99_ms,
        success_rate
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
}
