use std::process::ExitCode;

use rust_infer::Client;
use tracing_subscriber::EnvFilter;

const DEFAULT_IMAGE_PATH: &str = "my_img.jpg";
const DEFAULT_PROMPT: &str = "Describe the contents of this image in detail.";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rust_infer=info,vision_chat=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> rust_infer::Result<()> {
    let client = Client::from_env()?;
    let prompt = std::env::var("RUST_INFER_PROMPT").unwrap_or_else(|_| DEFAULT_PROMPT.to_string());
    let image_path =
        std::env::var("RUST_INFER_IMAGE_PATH").unwrap_or_else(|_| DEFAULT_IMAGE_PATH.to_string());

    let contents = client.vision_chat().describe(prompt, &image_path).await?;
    for (i, content) in contents.iter().enumerate() {
        println!("{i}\n{content}");
        println!("{}", "----".repeat(10));
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    match run().await {
        Ok(()) => {
            println!("Done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("{err}");
            ExitCode::from(1)
        }
    }
}
