#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = kviz_api::run().await {
        eprintln!("kviz-api fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
