//! Lamp listing command implementation.

use anyhow::Result;
use console::style;
use lampda::{DiscoveredLamp, Release, UpdateStatus, select_latest};
use log::warn;
use serde::Serialize;

use crate::Runtime;
use crate::commands::discover_lamps;
use crate::select::describe;

#[derive(Debug, Serialize)]
struct LampEntry<'a> {
    #[serde(flatten)]
    found: &'a DiscoveredLamp,
    status: Option<&'static str>,
    latest: Option<&'a str>,
}

fn status_token(status: &UpdateStatus) -> &'static str {
    match status {
        UpdateStatus::NoFirmware => "no_firmware",
        UpdateStatus::UpToDate => "up_to_date",
        UpdateStatus::Outdated { .. } => "outdated",
    }
}

/// Latest release, or `None` with a warning when the catalog is unavailable.
pub(crate) fn latest_release(runtime: &Runtime) -> Option<Release> {
    let fetched = runtime
        .catalog()
        .and_then(|catalog| {
            runtime
                .with_spinner(runtime.messages.fetching_releases(), || catalog.fetch_releases())
                .map_err(anyhow::Error::from)
        })
        .and_then(|releases| Ok(select_latest(&releases)?.clone()));

    match fetched {
        Ok(latest) => Some(latest),
        Err(e) => {
            warn!("{}: {e:#}", runtime.messages.release_fetch_failed());
            None
        },
    }
}

fn status_line(runtime: &Runtime, found: &DiscoveredLamp, latest: &Release) -> String {
    let address = found.address.to_string();
    match found.lamp.update_status(latest) {
        UpdateStatus::NoFirmware => runtime
            .messages
            .lamp_without_software(&address),
        UpdateStatus::UpToDate => runtime
            .messages
            .already_up_to_date(&address),
        UpdateStatus::Outdated { current, target } => runtime.messages.update_target(
            &address,
            current.as_deref().unwrap_or("?"),
            &target,
        ),
    }
}

/// List command implementation.
pub(crate) fn cmd_list(
    runtime: &Runtime,
    ports: &[String],
    drive_only: bool,
    offline: bool,
    json: bool,
) -> Result<()> {
    let restrict: Option<&[String]> = if drive_only {
        Some(&[])
    } else if ports.is_empty() {
        None
    } else {
        Some(ports)
    };

    let lamps = discover_lamps(runtime, restrict);
    let latest = if offline || lamps.is_empty() {
        None
    } else {
        latest_release(runtime)
    };

    if json {
        let entries: Vec<LampEntry<'_>> = lamps
            .iter()
            .map(|found| LampEntry {
                found,
                status: latest
                    .as_ref()
                    .map(|l| status_token(&found.lamp.update_status(l))),
                latest: latest.as_ref().map(|l| l.tag.as_str()),
            })
            .collect();
        let output = serde_json::json!({
            "ok": true,
            "data": {
                "lamps": entries,
            }
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if lamps.is_empty() {
        eprintln!("{}", style(runtime.messages.no_lamp_detected()).dim());
        return Ok(());
    }

    for found in &lamps {
        eprintln!("  {} {}", style("•").dim(), describe(runtime, found));
        if let Some(latest) = &latest {
            eprintln!("      {}", style(status_line(runtime, found, latest)).cyan());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use lampda::{Lamp, LampAddress, LampType};

    use super::*;
    use crate::config::Config;
    use crate::messages::{Lang, Messages};

    fn runtime(lang: Lang) -> Runtime {
        Runtime {
            config: Config::default(),
            messages: Messages::new(lang),
            quiet: true,
            non_interactive: true,
        }
    }

    fn release(tag: &str) -> Release {
        Release {
            tag: tag.to_string(),
            ..Release::default()
        }
    }

    fn lamp(version: &str) -> DiscoveredLamp {
        DiscoveredLamp {
            address: LampAddress::Serial("COM3".to_string()),
            lamp: Lamp {
                lamp_type: Some(LampType::Simple),
                user_software_version: Some(version.to_string()),
                ..Lamp::default()
            },
        }
    }

    #[test]
    fn test_status_lines() {
        let rt = runtime(Lang::En);
        let latest = release("v1.2");

        assert_eq!(
            status_line(&rt, &lamp("v1.2"), &latest),
            "The lamp 'COM3' is already up to date"
        );
        assert_eq!(
            status_line(&rt, &lamp("v1.1"), &latest),
            "Update the lamp 'COM3': v1.1 -> v1.2"
        );

        let drive = DiscoveredLamp {
            address: LampAddress::Drive(PathBuf::from("/media/LMBDROOT")),
            lamp: Lamp::unflashed(),
        };
        assert_eq!(
            status_line(&rt, &drive, &latest),
            "Lamp without a software: /media/LMBDROOT"
        );
    }

    #[test]
    fn test_status_line_in_french() {
        let rt = runtime(Lang::Fr);
        assert_eq!(
            status_line(&rt, &lamp("v1.2"), &release("v1.2")),
            "La lampe 'COM3' est déjà à jour"
        );
    }

    #[test]
    fn test_json_entry_shape() {
        let found = lamp("v1.1");
        let latest = release("v1.2");
        let entry = LampEntry {
            found: &found,
            status: Some(status_token(&found.lamp.update_status(&latest))),
            latest: Some(&latest.tag),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["address"], "COM3");
        assert_eq!(value["lamp"]["lamp_type"], "simple");
        assert_eq!(value["status"], "outdated");
        assert_eq!(value["latest"], "v1.2");
    }
}
