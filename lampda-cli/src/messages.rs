//! User-facing text in English and French.
//!
//! The language is an explicit [`Lang`] value chosen once at startup and
//! carried by [`Messages`]; the texts live in `locales/en.yml` and
//! `locales/fr.yml`.

use clap::ValueEnum;
use lampda::{FlashStage, LampType};
use log::warn;
use rust_i18n::t;

/// Message language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Lang {
    /// English.
    #[default]
    En,
    /// French.
    Fr,
}

impl Lang {
    /// Parse a language tag such as `fr`, `fr_FR.UTF-8` or `en-US`.
    pub fn from_locale(locale: &str) -> Option<Self> {
        let code = locale
            .split(['.', '_', '-'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match code.as_str() {
            "en" | "english" => Some(Self::En),
            "fr" | "francais" | "français" => Some(Self::Fr),
            _ => None,
        }
    }

    /// Language of the host, English when unknown.
    pub fn detect() -> Self {
        sys_locale::get_locale()
            .as_deref()
            .and_then(Self::from_locale)
            .unwrap_or_default()
    }

    /// Locale key of the `locales/*.yml` files.
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
        }
    }

    /// Command line (or `LAMPDA_LANG`) first, then the config file, then the
    /// host locale.
    pub fn resolve(cli: Option<Self>, configured: Option<&str>) -> Self {
        if let Some(lang) = cli {
            return lang;
        }
        if let Some(code) = configured {
            match Self::from_locale(code) {
                Some(lang) => return lang,
                None => warn!("Unknown language '{code}' in config, ignoring"),
            }
        }
        Self::detect()
    }
}

/// Renders user-facing sentences in one language.
///
/// Every lookup passes the locale to `t!`, so the process-wide locale of
/// `rust_i18n` is never read or set.
#[derive(Debug, Clone, Copy)]
pub struct Messages {
    lang: Lang,
}

impl Messages {
    /// Messages in `lang`.
    pub fn new(lang: Lang) -> Self {
        Self { lang }
    }

    fn locale(&self) -> &'static str {
        self.lang.code()
    }

    /// Spinner text while scanning ports.
    pub fn searching(&self) -> String {
        t!("scan.searching", locale = self.locale()).into_owned()
    }

    /// Spinner text while querying the release catalog.
    pub fn fetching_releases(&self) -> String {
        t!("release.fetching", locale = self.locale()).into_owned()
    }

    /// Nothing answered the scan.
    pub fn no_lamp_detected(&self) -> String {
        t!("scan.no_lamp_detected", locale = self.locale()).into_owned()
    }

    /// The lamp runs the latest release.
    pub fn already_up_to_date(&self, lamp: &str) -> String {
        t!("status.already_up_to_date", locale = self.locale(), lamp = lamp).into_owned()
    }

    /// The lamp is behind the latest release.
    pub fn update_target(&self, lamp: &str, current: &str, target: &str) -> String {
        t!(
            "status.update_target",
            locale = self.locale(),
            lamp = lamp,
            current = current,
            target = target
        )
        .into_owned()
    }

    /// The lamp sits in its bootloader without firmware.
    pub fn lamp_without_software(&self, address: &str) -> String {
        t!("status.without_software", locale = self.locale(), address = address).into_owned()
    }

    /// Hint shown when an up-to-date lamp is skipped.
    pub fn force_hint(&self) -> String {
        t!("flash.force_hint", locale = self.locale()).into_owned()
    }

    /// The bootloader drive never appeared.
    pub fn drive_not_found(&self) -> String {
        t!("flash.drive_not_found", locale = self.locale()).into_owned()
    }

    /// The firmware reached the lamp.
    pub fn update_success(&self) -> String {
        t!("flash.success", locale = self.locale()).into_owned()
    }

    /// The local firmware file is missing.
    pub fn uf2_not_found(&self) -> String {
        t!("flash.uf2_not_found", locale = self.locale()).into_owned()
    }

    /// Prompt for the firmware variant.
    pub fn which_lamp_type(&self) -> String {
        t!("flash.which_lamp_type", locale = self.locale()).into_owned()
    }

    /// The firmware variant is needed but cannot be asked for.
    pub fn lamp_type_required(&self) -> String {
        t!("flash.lamp_type_required", locale = self.locale()).into_owned()
    }

    /// The release catalog could not be read.
    pub fn release_fetch_failed(&self) -> String {
        t!("release.fetch_failed", locale = self.locale()).into_owned()
    }

    /// Any other flash failure.
    pub fn update_failed(&self) -> String {
        t!("flash.failed", locale = self.locale()).into_owned()
    }

    /// Installing a published release.
    pub fn official_update(&self, tag: &str) -> String {
        t!("flash.official", locale = self.locale(), tag = tag).into_owned()
    }

    /// Installing a file given on the command line.
    pub fn manual_update(&self, file: &str) -> String {
        t!("flash.manual", locale = self.locale(), file = file).into_owned()
    }

    /// Version the lamp reported after an update.
    pub fn now_running(&self, lamp: &str, version: &str) -> String {
        t!("flash.now_running", locale = self.locale(), lamp = lamp, version = version)
            .into_owned()
    }

    /// The updated lamp did not answer on its port yet.
    pub fn not_back_yet(&self, lamp: &str) -> String {
        t!("flash.not_back_yet", locale = self.locale(), lamp = lamp).into_owned()
    }

    /// Prompt for the lamp to update.
    pub fn select_lamp(&self) -> String {
        t!("scan.select_lamp", locale = self.locale()).into_owned()
    }

    /// More than one lamp and no way to ask.
    pub fn several_lamps(&self) -> String {
        t!("scan.several_lamps", locale = self.locale()).into_owned()
    }

    /// No lamp answered at the requested address.
    pub fn lamp_not_found(&self, address: &str) -> String {
        t!("scan.lamp_not_found", locale = self.locale(), address = address).into_owned()
    }

    /// Confirmation prompt before flashing.
    pub fn confirm_update(&self) -> String {
        t!("flash.confirm", locale = self.locale()).into_owned()
    }

    /// The user backed out of a prompt.
    pub fn cancelled(&self) -> String {
        t!("flash.cancelled", locale = self.locale()).into_owned()
    }

    /// Something other than a lamp answered on the port.
    pub fn not_a_lamp(&self, port: &str) -> String {
        t!("scan.not_a_lamp", locale = self.locale(), port = port).into_owned()
    }

    /// Tag suffix of the newest release.
    pub fn latest_marker(&self) -> String {
        t!("release.latest_marker", locale = self.locale()).into_owned()
    }

    /// The catalog lists no release.
    pub fn no_release(&self) -> String {
        t!("release.none", locale = self.locale()).into_owned()
    }

    /// Banner printed when a terminal session starts.
    pub fn monitor_hint(&self, port: &str) -> String {
        t!("monitor.hint", locale = self.locale(), port = port).into_owned()
    }

    /// Spinner text for a flash stage.
    pub fn stage(&self, stage: FlashStage) -> String {
        let key = match stage {
            FlashStage::Ready => "stage.ready",
            FlashStage::Resetting => "stage.resetting",
            FlashStage::WaitingForDrive => "stage.waiting_for_drive",
            FlashStage::ResolvingAsset => "stage.resolving_asset",
            FlashStage::Copying => "stage.copying",
            FlashStage::Done => "stage.done",
        };
        t!(key, locale = self.locale()).into_owned()
    }

    /// Human name of a lamp type.
    pub fn lamp_type(&self, lamp_type: Option<&LampType>) -> String {
        match lamp_type {
            None | Some(LampType::Unknown) => t!("lamp_type.unknown", locale = self.locale()).into_owned(),
            Some(LampType::Unflashed) => t!("lamp_type.unflashed", locale = self.locale()).into_owned(),
            Some(other) => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_from_locale() {
        assert_eq!(Lang::from_locale("fr"), Some(Lang::Fr));
        assert_eq!(Lang::from_locale("fr_FR.UTF-8"), Some(Lang::Fr));
        assert_eq!(Lang::from_locale("fr-CA"), Some(Lang::Fr));
        assert_eq!(Lang::from_locale("en_US.UTF-8"), Some(Lang::En));
        assert_eq!(Lang::from_locale("EN"), Some(Lang::En));
        assert_eq!(Lang::from_locale("de_DE"), None);
        assert_eq!(Lang::from_locale(""), None);
    }

    #[test]
    fn test_lang_resolution_order() {
        assert_eq!(Lang::resolve(Some(Lang::En), Some("fr")), Lang::En);
        assert_eq!(Lang::resolve(None, Some("fr")), Lang::Fr);
        // An unknown configured language falls through to the host locale.
        assert_eq!(Lang::resolve(None, Some("klingon")), Lang::detect());
    }

    #[test]
    fn test_messages_follow_language() {
        let en = Messages::new(Lang::En);
        let fr = Messages::new(Lang::Fr);

        assert_eq!(en.no_lamp_detected(), "No lamp detected");
        assert_eq!(fr.no_lamp_detected(), "Aucune lamp-da détectée");
        assert_eq!(en.already_up_to_date("COM3"), "The lamp 'COM3' is already up to date");
        assert_eq!(fr.already_up_to_date("COM3"), "La lampe 'COM3' est déjà à jour");
        assert_eq!(
            en.update_target("COM3", "v1.1", "v1.2"),
            "Update the lamp 'COM3': v1.1 -> v1.2"
        );
    }

    #[test]
    fn test_french_texts_and_placeholders() {
        let fr = Messages::new(Lang::Fr);
        assert_eq!(fr.stage(FlashStage::Done), "Terminé");
        assert_eq!(fr.not_a_lamp("COM5"), "COM5 n'est pas une Lamp-da");
        assert_eq!(
            fr.update_target("COM3", "v1.1", "v1.2"),
            "Mettre à jour la lampe 'COM3' : v1.1 -> v1.2"
        );
        assert_eq!(fr.lamp_type(Some(&LampType::Unflashed)), "sans programme");
    }

    #[test]
    fn test_every_stage_has_text() {
        let stages = [
            FlashStage::Ready,
            FlashStage::Resetting,
            FlashStage::WaitingForDrive,
            FlashStage::ResolvingAsset,
            FlashStage::Copying,
            FlashStage::Done,
        ];
        for lang in [Lang::En, Lang::Fr] {
            let messages = Messages::new(lang);
            for stage in stages {
                let text = messages.stage(stage);
                assert!(!text.is_empty());
                assert!(!text.contains("stage."), "missing translation: {text}");
            }
        }
    }

    #[test]
    fn test_lamp_type_names() {
        let en = Messages::new(Lang::En);
        assert_eq!(en.lamp_type(Some(&LampType::Indexable)), "indexable");
        assert_eq!(en.lamp_type(Some(&LampType::Unflashed)), "no software");
        assert_eq!(en.lamp_type(None), "unknown");
    }
}
