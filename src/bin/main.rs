#[tokio::main]
async fn main() {
    if let Err(err) = taxosim::cli::main().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
