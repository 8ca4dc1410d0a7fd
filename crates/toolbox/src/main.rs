#[tokio::main]
async fn main() -> anyhow::Result<()> {
    toolbox::start(std::env::args()).await
}
