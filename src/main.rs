use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    alien::cmd::start().await
}
