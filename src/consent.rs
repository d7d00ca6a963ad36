use gloo_timers::callback::Timeout;
use log::{debug, warn};
use web_sys::{Element, Storage};

use crate::analytics::Analytics;
use crate::components::toast::Notifier;
use crate::config::SiteConfig;
use crate::dom;
use crate::error::{PageError, PageResult};

const GRANTED: &str = "true";
const DECLINED: &str = "declined";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsentFlag {
    Unset,
    Granted,
    Declined,
}

impl ConsentFlag {
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some(GRANTED) => ConsentFlag::Granted,
            Some(DECLINED) => ConsentFlag::Declined,
            _ => ConsentFlag::Unset,
        }
    }

    pub fn as_stored(self) -> Option<&'static str> {
        match self {
            ConsentFlag::Unset => None,
            ConsentFlag::Granted => Some(GRANTED),
            ConsentFlag::Declined => Some(DECLINED),
        }
    }
}

/// The consent decision in `localStorage`.
#[derive(Clone, Debug)]
pub struct ConsentStore {
    key: String,
}

impl ConsentStore {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    fn storage() -> PageResult<Storage> {
        dom::window()?
            .local_storage()
            .map_err(|e| PageError::Storage(format!("{:?}", e)))?
            .ok_or_else(|| PageError::Storage("localStorage unavailable".to_string()))
    }

    /// Unreadable storage counts as no decision.
    pub fn read(&self) -> ConsentFlag {
        let stored = Self::storage().and_then(|storage| {
            storage
                .get_item(&self.key)
                .map_err(|e| PageError::Storage(format!("{:?}", e)))
        });
        match stored {
            Ok(value) => ConsentFlag::from_stored(value.as_deref()),
            Err(e) => {
                warn!("Could not read consent: {}", e);
                ConsentFlag::Unset
            }
        }
    }

    pub fn write(&self, flag: ConsentFlag) -> PageResult<()> {
        let storage = Self::storage()?;
        let result = match flag.as_stored() {
            Some(value) => storage.set_item(&self.key, value),
            None => storage.remove_item(&self.key),
        };
        result.map_err(|e| PageError::Storage(format!("{:?}", e)))
    }
}

#[derive(Clone)]
struct Banner {
    element: Element,
    hide_delay_ms: u32,
}

impl Banner {
    fn reveal(&self) {
        let element = self.element.clone();
        let _ = element.class_list().remove_1("d-none");
        let _ = dom::set_style(&element, "transform", "translateY(100%)");
        let _ = dom::set_style(&element, "transition", "transform 0.3s ease-out");
        Timeout::new(10, move || {
            let _ = dom::set_style(&element, "transform", "translateY(0)");
        })
        .forget();
    }

    fn hide(&self) {
        let element = self.element.clone();
        let _ = dom::set_style(&element, "transform", "translateY(100%)");
        Timeout::new(self.hide_delay_ms, move || {
            let _ = element.class_list().add_1("d-none");
        })
        .forget();
    }
}

/// Applies the stored decision and wires the consent banner.
pub fn init(config: &SiteConfig, notifier: Notifier) -> PageResult<()> {
    let (Some(banner), Some(accept)) = (
        dom::by_id::<Element>("cookieConsent"),
        dom::by_id::<Element>("acceptCookiesBtn"),
    ) else {
        debug!("No cookie banner on this page");
        return Ok(());
    };

    let store = ConsentStore::new(config.consent_key.clone());
    let analytics = Analytics::new(config.measurement_id.clone());
    let banner = Banner { element: banner, hide_delay_ms: config.banner_hide_delay_ms };

    match store.read() {
        ConsentFlag::Granted => {
            if let Err(e) = analytics.enable() {
                warn!("Could not enable analytics: {}", e);
            }
        }
        ConsentFlag::Declined => {
            if let Err(e) = analytics.disable() {
                warn!("Could not fully disable analytics: {}", e);
            }
        }
        ConsentFlag::Unset => {
            let banner = banner.clone();
            Timeout::new(config.banner_reveal_delay_ms, move || banner.reveal()).forget();
        }
    }

    {
        let store = store.clone();
        let analytics = analytics.clone();
        let banner = banner.clone();
        dom::listen(&accept, "click", move |_| {
            if let Err(e) = store.write(ConsentFlag::Granted) {
                warn!("Could not store consent: {}", e);
            }
            if let Err(e) = analytics.enable() {
                warn!("Could not enable analytics: {}", e);
            }
            banner.hide();
            notifier.info("Analytics enabled. Thank you!");
        })?;
    }

    if let Some(decline) = dom::by_id::<Element>("declineCookiesBtn") {
        let banner = banner.clone();
        dom::listen(&decline, "click", move |_| {
            if let Err(e) = store.write(ConsentFlag::Declined) {
                warn!("Could not store consent: {}", e);
            }
            if let Err(e) = analytics.disable() {
                warn!("Could not disable analytics: {}", e);
            }
            banner.hide();
            notifier.info("Analytics disabled. Your privacy is respected.");
        })?;
    }

    if let Some(close) = dom::by_id::<Element>("closeCookiesBtn") {
        dom::listen(&close, "click", move |_| banner.hide())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_values_map_to_flags() {
        assert_eq!(ConsentFlag::from_stored(Some("true")), ConsentFlag::Granted);
        assert_eq!(ConsentFlag::from_stored(Some("declined")), ConsentFlag::Declined);
        assert_eq!(ConsentFlag::from_stored(None), ConsentFlag::Unset);
    }

    #[test]
    fn unknown_values_are_unset() {
        assert_eq!(ConsentFlag::from_stored(Some("")), ConsentFlag::Unset);
        assert_eq!(ConsentFlag::from_stored(Some("false")), ConsentFlag::Unset);
        assert_eq!(ConsentFlag::from_stored(Some("TRUE")), ConsentFlag::Unset);
    }

    #[test]
    fn flags_survive_a_store_round_trip() {
        for flag in [ConsentFlag::Unset, ConsentFlag::Granted, ConsentFlag::Declined] {
            assert_eq!(ConsentFlag::from_stored(flag.as_stored()), flag);
        }
    }
}
