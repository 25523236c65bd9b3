use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    turbolearn_dashboard::run().await
}
