#[tokio::main]
async fn main() {
    if let Err(e) = careportal::run().await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
