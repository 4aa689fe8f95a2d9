//! Search the LAN for media servers and list a container of the first one
//!
//! ```bash
//! LOG_LEVEL=debug cargo run -p dlna-sdk --example browse -- 64
//! ```
//!
//! The optional argument is the object id to browse (default: the root).

use dlna_sdk::content_directory::ROOT_CONTAINER;
use dlna_sdk::{init_tracing, ItemKind, MediaService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;

    let object_id = std::env::args().nth(1).unwrap_or_else(|| ROOT_CONTAINER.to_string());

    let service = MediaService::with_defaults()?;
    println!(
        "Searching for {} ({:?})...",
        service.config().discovery.search_target,
        service.config().discovery.search_timeout
    );

    let devices = service.search().await?;
    if devices.is_empty() {
        println!("No media servers found");
        return Ok(());
    }

    for device in &devices {
        println!("  {} [{}] at {}", device.name, device.device_type, device.location);
    }

    let device = &devices[0];
    let directory = service.content_directory(device)?;
    println!("\nBrowsing {} on {}", object_id, device.name);

    for item in directory.browse(&object_id, 0, 0).await? {
        let marker = match item.kind {
            ItemKind::Container => "+",
            ItemKind::Item => "-",
        };
        println!(
            "{} {} ({})",
            marker,
            item.title.as_deref().unwrap_or("<untitled>"),
            item.id
        );
        if let Some(url) = item.url() {
            println!("    {}", url);
        }
    }

    Ok(())
}
