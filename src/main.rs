#[tokio::main]
async fn main() {
    if let Err(e) = qrlens_lib::run().await {
        eprintln!("qrlens: {e}");
        std::process::exit(1);
    }
}
