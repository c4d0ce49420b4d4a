#[tokio::main]
async fn main() {
    if let Err(error) = teleop_client::frameworks::console::run().await {
        tracing::error!(%error, "teleop console exited with error");
        std::process::exit(1);
    }
}
