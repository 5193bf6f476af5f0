//! `mediafetch info` – metadata preview for a URL.

use anyhow::{bail, Result};
use mediafetch_core::config::MediafetchConfig;
use mediafetch_core::humanize::{format_duration, format_view_count};
use mediafetch_core::intake::validate_source_url;
use mediafetch_core::invoker::probe_metadata;

pub async fn run_info(cfg: &MediafetchConfig, url: &str) -> Result<()> {
    let url = validate_source_url(url, cfg.allowed_hosts.as_deref())?;
    let Some(meta) = probe_metadata(&cfg.tool(), url.as_str(), cfg.metadata_timeout()).await else {
        bail!("could not fetch video information");
    };

    println!("{}", meta.title.as_deref().unwrap_or("(untitled)"));
    if let Some(uploader) = &meta.uploader {
        println!("  uploader: {uploader}");
    }
    if let Some(secs) = meta.duration_secs() {
        println!("  duration: {}", format_duration(secs));
    }
    if let Some(views) = meta.view_count {
        println!("  views:    {}", format_view_count(views));
    }
    if let Some(date) = &meta.upload_date {
        println!("  uploaded: {date}");
    }
    if meta.is_live == Some(true) {
        println!("  live:     yes");
    }
    if let Some(thumb) = &meta.thumbnail {
        println!("  thumb:    {thumb}");
    }
    Ok(())
}
