//! `spo` binary

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    spo_cli::run().await?;
    Ok(())
}
