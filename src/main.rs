#[tokio::main]
async fn main() {
    if let Err(e) = delegation_engine::cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
