#[tokio::main]
async fn main() -> anyhow::Result<()> {
    foundation_proxy::run().await
}
