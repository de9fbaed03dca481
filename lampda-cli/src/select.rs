//! Interactive lamp and lamp-type selection.
//!
//! Prompts only appear on a terminal; in non-interactive mode any choice
//! that cannot be made automatically is a usage error.

use std::cmp::Ordering;

use anyhow::Result;
use dialoguer::{Confirm, Error as DialoguerError, Select, theme::ColorfulTheme};
use lampda::{DiscoveredLamp, LampType};
use log::info;

use crate::{CliError, Runtime};

fn usage_err(message: impl Into<String>) -> anyhow::Error {
    CliError::Usage(message.into()).into()
}

fn map_prompt_error(runtime: &Runtime, err: DialoguerError) -> anyhow::Error {
    match err {
        DialoguerError::IO(io_err) if io_err.kind() == std::io::ErrorKind::Interrupted => {
            CliError::Cancelled(runtime.messages.cancelled()).into()
        },
        DialoguerError::IO(io_err) => usage_err(format!("Prompt failed: {io_err}")),
    }
}

/// One-line description of a lamp for lists and prompts.
pub(crate) fn describe(runtime: &Runtime, found: &DiscoveredLamp) -> String {
    let version = found
        .lamp
        .user_software_version
        .as_deref()
        .unwrap_or("-");
    format!(
        "{} ({}, {version})",
        found.address,
        runtime
            .messages
            .lamp_type(found.lamp.lamp_type.as_ref())
    )
}

/// Pick the lamp to work on.
///
/// With `wanted`, the lamp at that address; otherwise the only lamp found, or
/// the user's choice among several.
pub(crate) fn select_lamp(
    runtime: &Runtime,
    lamps: Vec<DiscoveredLamp>,
    wanted: Option<&str>,
) -> Result<DiscoveredLamp> {
    if let Some(address) = wanted {
        return lamps
            .into_iter()
            .find(|found| found.address.to_string() == address)
            .ok_or_else(|| usage_err(runtime.messages.lamp_not_found(address)));
    }

    match lamps.len().cmp(&1) {
        Ordering::Less => Err(usage_err(runtime.messages.no_lamp_detected())),
        Ordering::Equal => {
            let mut lamps = lamps;
            let found = lamps.remove(0);
            info!("Selected lamp at {}", found.address);
            Ok(found)
        },
        Ordering::Greater => {
            if !runtime.can_prompt() {
                return Err(usage_err(runtime.messages.several_lamps()));
            }
            let items: Vec<String> = lamps
                .iter()
                .map(|found| describe(runtime, found))
                .collect();
            let index = Select::with_theme(&ColorfulTheme::default())
                .with_prompt(runtime.messages.select_lamp())
                .items(&items)
                .default(0)
                .interact()
                .map_err(|e| map_prompt_error(runtime, e))?;
            let mut lamps = lamps;
            Ok(lamps.swap_remove(index))
        },
    }
}

/// Ask which firmware variant to install.
pub(crate) fn ask_lamp_type(runtime: &Runtime) -> Result<LampType> {
    if !runtime.can_prompt() {
        return Err(usage_err(runtime.messages.lamp_type_required()));
    }
    let items: Vec<&str> = LampType::FLASHABLE
        .iter()
        .map(LampType::as_str)
        .collect();
    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(runtime.messages.which_lamp_type())
        .items(&items)
        .default(0)
        .interact()
        .map_err(|e| map_prompt_error(runtime, e))?;
    Ok(LampType::FLASHABLE[index].clone())
}

/// Ask before touching the lamp; `assume_yes` and non-interactive runs skip
/// the question.
pub(crate) fn confirm_update(runtime: &Runtime, assume_yes: bool) -> Result<()> {
    if assume_yes || !runtime.can_prompt() {
        return Ok(());
    }
    let accepted = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(runtime.messages.confirm_update())
        .default(true)
        .interact()
        .map_err(|e| map_prompt_error(runtime, e))?;
    if accepted {
        Ok(())
    } else {
        Err(CliError::Cancelled(runtime.messages.cancelled()).into())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use lampda::{Lamp, LampAddress};

    use super::*;
    use crate::config::Config;
    use crate::messages::{Lang, Messages};

    fn runtime() -> Runtime {
        Runtime {
            config: Config::default(),
            messages: Messages::new(Lang::En),
            quiet: true,
            non_interactive: true,
        }
    }

    fn serial_lamp(port: &str, version: &str) -> DiscoveredLamp {
        DiscoveredLamp {
            address: LampAddress::Serial(port.to_string()),
            lamp: Lamp {
                lamp_type: Some(LampType::Simple),
                user_software_version: Some(version.to_string()),
                ..Lamp::default()
            },
        }
    }

    fn is_usage(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<CliError>(), Some(CliError::Usage(_)))
    }

    #[test]
    fn test_select_single_lamp() {
        let found = select_lamp(&runtime(), vec![serial_lamp("COM3", "v1.0")], None).unwrap();
        assert_eq!(found.address.to_string(), "COM3");
    }

    #[test]
    fn test_select_by_address() {
        let lamps = vec![
            serial_lamp("COM3", "v1.0"),
            serial_lamp("COM4", "v1.1"),
            DiscoveredLamp {
                address: LampAddress::Drive(PathBuf::from("/media/LMBDROOT")),
                lamp: Lamp::unflashed(),
            },
        ];
        let found = select_lamp(&runtime(), lamps.clone(), Some("COM4")).unwrap();
        assert_eq!(found.lamp.user_software_version.as_deref(), Some("v1.1"));

        let found = select_lamp(&runtime(), lamps.clone(), Some("/media/LMBDROOT")).unwrap();
        assert!(found.address.is_drive());

        let err = select_lamp(&runtime(), lamps, Some("COM9")).unwrap_err();
        assert!(is_usage(&err));
    }

    #[test]
    fn test_select_without_lamps_is_usage_error() {
        let err = select_lamp(&runtime(), Vec::new(), None).unwrap_err();
        assert!(is_usage(&err));
        assert!(err.to_string().contains("No lamp detected"));
    }

    #[test]
    fn test_several_lamps_non_interactive_is_usage_error() {
        let lamps = vec![serial_lamp("COM3", "v1.0"), serial_lamp("COM4", "v1.1")];
        let err = select_lamp(&runtime(), lamps, None).unwrap_err();
        assert!(is_usage(&err));
    }

    #[test]
    fn test_lamp_type_non_interactive_is_usage_error() {
        assert!(is_usage(&ask_lamp_type(&runtime()).unwrap_err()));
    }

    #[test]
    fn test_confirm_skipped_when_non_interactive() {
        assert!(confirm_update(&runtime(), false).is_ok());
        assert!(confirm_update(&runtime(), true).is_ok());
    }

    #[test]
    fn test_describe() {
        let text = describe(&runtime(), &serial_lamp("COM3", "v1.0"));
        assert_eq!(text, "COM3 (simple, v1.0)");
    }
}
