#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if let Err(e) = eventhub::run().await {
        eprintln!("EventHub failed to start: {}", e);
        std::process::exit(1);
    }
}
