use std::process::ExitCode;

use rust_infer::overlay::compose_overlay;
use rust_infer::render::save_segmentation_map;
use rust_infer::Client;
use tracing_subscriber::EnvFilter;

const DEFAULT_IMAGE_PATH: &str = "image-of-road.jpg";
const DEFAULT_OUTPUT_PATH: &str = "segmentation_map.png";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rust_infer=info,segmentation_map=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> rust_infer::Result<()> {
    let client = Client::from_env()?;
    let image_path =
        std::env::var("RUST_INFER_IMAGE_PATH").unwrap_or_else(|_| DEFAULT_IMAGE_PATH.to_string());
    let output_path = std::env::var("RUST_INFER_OUTPUT_PATH")
        .unwrap_or_else(|_| DEFAULT_OUTPUT_PATH.to_string());

    let original = image::open(&image_path)?;
    let entries = client.segmentation().query(&image_path).await?;
    println!("API Response:");
    println!("{}", serde_json::to_string_pretty(&entries)?);

    let map = compose_overlay(&original, &entries);
    if map.skipped > 0 {
        tracing::warn!(skipped = map.skipped, "some segmentation entries were skipped");
    }
    save_segmentation_map(&map, &output_path)?;
    for entry in &map.legend {
        let [r, g, b] = entry.color.0;
        println!("{}: rgb({r}, {g}, {b})", entry.label);
    }
    println!("Segmentation map saved as {output_path}");
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
