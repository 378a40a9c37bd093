use anyhow::{Context, Result};
use std::sync::Arc;

use immich_display::gallery::{GalleryApp, GalleryView, HttpGalleryApi};

/// Drives the gallery model against a running proxy and prints what a front
/// end would render.
///
/// Usage: gallery_probe <proxy-url> [url-query] [extra-pages]
/// e.g.   gallery_probe http://localhost:8000 "?q=beach&type=IMAGE" 2
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let base_url = args
        .next()
        .unwrap_or_else(|| "http://localhost:8000".to_string());
    let url_query = args.next().unwrap_or_default();
    let extra_pages: u32 = match args.next() {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid page count: {}", raw))?,
        None => 0,
    };

    let api = HttpGalleryApi::new(&base_url).context("Failed to build HTTP client")?;
    let app = GalleryApp::new(Arc::new(api), &base_url, &url_query);
    app.start().await;

    for _ in 0..extra_pages {
        if app.gallery().load_more().await == 0 {
            break;
        }
    }

    let chips = app.filter_panel().active_filters();
    if !chips.is_empty() {
        let labels: Vec<&str> = chips.iter().map(|c| c.label.as_str()).collect();
        println!("Filters: {}", labels.join(" | "));
    }
    println!("Shareable query: {}", app.url_query());

    match app.gallery().view() {
        GalleryView::Loading => println!("Still loading"),
        GalleryView::Error { message } => println!("Error: {}", message),
        GalleryView::Empty => println!("No results"),
        GalleryView::Grid(grid) => {
            println!("{}", grid.result_count);
            for tile in &grid.tiles {
                match &tile.duration {
                    Some(duration) => println!("  {:<40} {:?} {}", tile.name, tile.kind, duration),
                    None => println!("  {:<40} {:?}", tile.name, tile.kind),
                }
            }
            if grid.show_load_more {
                println!("  ... more available");
            }
        }
    }

    Ok(())
}
