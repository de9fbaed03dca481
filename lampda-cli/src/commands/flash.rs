//! Firmware update command implementation.

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use console::style;
use lampda::{
    DiscoveredLamp, FlashReport, FlashSession, FlashSource, Flasher, LampType, NativePortOpener,
    Release, UpdateStatus, select_latest,
};
use log::{debug, warn};

use crate::commands::discover_lamps;
use crate::select::{ask_lamp_type, confirm_update, select_lamp};
use crate::{CliError, Runtime};

/// Options of `lampda-flash flash`.
#[derive(Debug, Clone, Default)]
pub(crate) struct FlashArgs {
    pub port: Option<String>,
    pub file: Option<PathBuf>,
    pub release: Option<String>,
    pub lamp_type: Option<LampType>,
    pub skip_reset: bool,
    pub force: bool,
    pub yes: bool,
}

/// Firmware variant to install and whether the lamp must be reset by hand.
///
/// A type given on the command line or chosen at the prompt means the lamp
/// could not tell its own type, so it is not sent `DFU`.
fn choose_lamp_type(
    runtime: &Runtime,
    found: &DiscoveredLamp,
    forced: Option<&LampType>,
) -> Result<(LampType, bool)> {
    if let Some(lamp_type) = forced {
        return Ok((lamp_type.clone(), true));
    }
    match &found.lamp.lamp_type {
        Some(lamp_type) if lamp_type.is_flashable() => Ok((lamp_type.clone(), false)),
        _ => Ok((ask_lamp_type(runtime)?, true)),
    }
}

/// Release named by `--release`, or the latest one.
fn pick_release<'a>(releases: &'a [Release], wanted: Option<&str>) -> Result<&'a Release> {
    match wanted {
        Some(tag) => releases
            .iter()
            .find(|r| r.tag == tag)
            .ok_or_else(|| CliError::Usage(format!("No release tagged '{tag}'")).into()),
        None => Ok(select_latest(releases)?),
    }
}

fn run_flasher(runtime: &Runtime, flasher: &Flasher<'_>, session: &FlashSession) -> lampda::Result<FlashReport> {
    let pb = runtime.spinner(runtime.messages.stage(lampda::FlashStage::Ready));
    let (tx, rx) = mpsc::channel();

    let result = thread::scope(|s| {
        let worker = s.spawn(move || {
            flasher.flash(session, &mut |stage| {
                let _ = tx.send(stage);
            })
        });
        for stage in rx {
            debug!("Stage: {stage}");
            pb.set_message(runtime.messages.stage(stage));
        }
        worker.join()
    });

    pb.finish_and_clear();
    match result {
        Ok(outcome) => outcome,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Status line for the lamp found at `port` after an update, if any.
fn post_flash_line(runtime: &Runtime, port: &str, lamps: &[DiscoveredLamp]) -> String {
    let rescanned = lamps
        .iter()
        .find(|found| found.address.port_name() == Some(port));
    match rescanned.and_then(|found| found.lamp.user_software_version.as_deref()) {
        Some(version) => runtime.messages.now_running(port, version),
        None => runtime.messages.not_back_yet(port),
    }
}

/// Probe the updated lamp again once it had time to reboot.
fn rescan_updated_lamp(runtime: &Runtime, port: &str) -> String {
    let delay = runtime.config.settle_delay();
    debug!("Waiting {delay:?} before probing {port} again");
    runtime.with_spinner(runtime.messages.searching(), || thread::sleep(delay));

    let known = [port.to_string()];
    let lamps = discover_lamps(runtime, Some(&known));
    post_flash_line(runtime, port, &lamps)
}

/// Flash command implementation.
pub(crate) fn cmd_flash(runtime: &Runtime, args: &FlashArgs) -> Result<()> {
    let messages = &runtime.messages;

    if let Some(file) = &args.file {
        if !file.is_file() {
            return Err(
                CliError::Usage(format!("{}: {}", messages.uf2_not_found(), file.display())).into(),
            );
        }
    }

    let restrict = args.port.clone().map(|port| vec![port]);
    let lamps = discover_lamps(runtime, restrict.as_deref());
    let found = select_lamp(runtime, lamps, args.port.as_deref())?;
    let address = found.address.to_string();

    let (lamp_type, typed_by_hand) = choose_lamp_type(runtime, &found, args.lamp_type.as_ref())?;
    let skip_reset = args.skip_reset || typed_by_hand;

    let catalog = runtime.catalog()?;
    let source = if let Some(file) = &args.file {
        runtime.status(format!(
            "{} {}",
            style("ℹ").blue(),
            messages.manual_update(&file.display().to_string())
        ));
        FlashSource::Local { path: file.clone() }
    } else {
        let releases = runtime
            .with_spinner(messages.fetching_releases(), || catalog.fetch_releases())
            .context(messages.release_fetch_failed())?;
        let release = pick_release(&releases, args.release.as_deref())?;

        match found.lamp.update_status(release) {
            UpdateStatus::UpToDate if !args.force => {
                runtime.status(format!(
                    "{} {}",
                    style("✓").green(),
                    messages.already_up_to_date(&address)
                ));
                runtime.status(style(messages.force_hint()).dim());
                return Ok(());
            },
            UpdateStatus::Outdated { current, target } => runtime.status(format!(
                "{} {}",
                style("ℹ").blue(),
                messages.update_target(&address, current.as_deref().unwrap_or("?"), &target)
            )),
            _ => runtime.status(format!(
                "{} {}",
                style("ℹ").blue(),
                messages.official_update(&release.tag)
            )),
        }
        FlashSource::Remote {
            asset_urls: release.asset_urls.clone(),
        }
    };

    confirm_update(runtime, args.yes)?;

    let locator = runtime.locator();
    let flasher = Flasher::new(&NativePortOpener, locator.as_ref())
        .with_downloader(&catalog)
        .with_serial_config(runtime.config.serial_config())
        .with_settle_delay(runtime.config.settle_delay())
        .with_download_dir(runtime.config.download_dir())
        .with_drive_label(runtime.config.drive_label());
    let session = FlashSession {
        address: found.address,
        lamp_type,
        source,
        skip_reset,
    };

    let report = match run_flasher(runtime, &flasher, &session) {
        Ok(report) => report,
        Err(e @ lampda::Error::DriveNotFound(_)) => {
            return Err(anyhow::Error::from(e).context(messages.drive_not_found()));
        },
        Err(e @ lampda::Error::FileNotFound(_)) => {
            return Err(anyhow::Error::from(e).context(messages.uf2_not_found()));
        },
        Err(e) => return Err(anyhow::Error::from(e).context(messages.update_failed())),
    };

    if report.drive_vanished {
        warn!(
            "The drive disappeared while {} was copied; the lamp most likely took the update",
            report.file_name
        );
    }
    runtime.status(format!(
        "{} {} ({}, {} bytes)",
        style("✓").green(),
        messages.update_success(),
        report.file_name,
        report.bytes
    ));

    if let Some(port) = session.address.port_name() {
        let line = rescan_updated_lamp(runtime, port);
        runtime.status(format!("{} {line}", style("ℹ").blue()));
    }
    Ok(())
}
