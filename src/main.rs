use std::io::Result;

#[tokio::main]
async fn main() -> Result<()> {
    snake_server::run_with_config().await
}
