#[tokio::main]
async fn main() -> anyhow::Result<()> {
    leadwatch::run().await
}
