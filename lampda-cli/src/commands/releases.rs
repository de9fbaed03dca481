//! Release listing command implementation.

use anyhow::{Context, Result};
use console::style;
use lampda::{Release, select_latest};
use serde::Serialize;

use crate::Runtime;

#[derive(Debug, Serialize)]
struct ReleaseEntry<'a> {
    #[serde(flatten)]
    release: &'a Release,
    latest: bool,
}

fn asset_names(release: &Release) -> Vec<&str> {
    release
        .asset_urls
        .iter()
        .map(|url| url.rsplit('/').next().unwrap_or(url))
        .collect()
}

/// Releases command implementation.
pub(crate) fn cmd_releases(runtime: &Runtime, json: bool) -> Result<()> {
    let catalog = runtime.catalog()?;
    let releases = runtime
        .with_spinner(runtime.messages.fetching_releases(), || catalog.fetch_releases())
        .context(runtime.messages.release_fetch_failed())?;
    let latest_tag = select_latest(&releases)
        .ok()
        .map(|r| r.tag.clone());

    if json {
        let entries: Vec<ReleaseEntry<'_>> = releases
            .iter()
            .map(|release| ReleaseEntry {
                release,
                latest: latest_tag.as_deref() == Some(release.tag.as_str()),
            })
            .collect();
        let output = serde_json::json!({
            "ok": true,
            "data": {
                "releases": entries,
            }
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if releases.is_empty() {
        eprintln!("{}", style(runtime.messages.no_release()).dim());
        return Ok(());
    }

    for release in &releases {
        let marker = if latest_tag.as_deref() == Some(release.tag.as_str()) {
            format!(" ({})", style(runtime.messages.latest_marker()).green().bold())
        } else {
            String::new()
        };
        let published = release
            .published_at
            .as_deref()
            .and_then(|date| date.split('T').next())
            .unwrap_or("-");
        eprintln!(
            "  {} {}{marker}  {}  {}",
            style("•").dim(),
            style(&release.tag).cyan(),
            style(published).dim(),
            release.name
        );
        let assets = asset_names(release);
        if !assets.is_empty() {
            eprintln!("      {}", style(assets.join(", ")).dim());
        }
    }

    Ok(())
}
