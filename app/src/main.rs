#[tokio::main]
async fn main() -> anyhow::Result<()> {
    capsule_lib::run().await
}
