use log::{debug, info, warn};
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::js_sys::{Function, Reflect};
use web_sys::HtmlDocument;

use crate::dom;
use crate::error::{PageError, PageResult};

const EXPIRED: &str = "expires=Thu, 01 Jan 1970 00:00:00 UTC; path=/";

const LEGACY_COOKIES: [&str; 6] = ["__utma", "__utmt", "__utmb", "__utmc", "__utmz", "__utmv"];

#[derive(Serialize)]
struct ConsentUpdate {
    analytics_storage: &'static str,
}

#[derive(Serialize)]
struct PrivacyConfig {
    anonymize_ip: bool,
    allow_google_signals: bool,
    allow_ad_personalization_signals: bool,
}

/// Bridge to the page's gtag script for one measurement id.
#[derive(Clone, Debug)]
pub struct Analytics {
    measurement_id: String,
}

impl Analytics {
    pub fn new(measurement_id: impl Into<String>) -> Self {
        Self { measurement_id: measurement_id.into() }
    }

    pub fn enable(&self) -> PageResult<()> {
        self.set_disable_flag(false)?;
        let Some(gtag) = gtag() else {
            debug!("gtag not present, nothing to enable");
            return Ok(());
        };
        call_gtag(&gtag, "consent", "update", &ConsentUpdate { analytics_storage: "granted" })?;
        call_gtag(
            &gtag,
            "config",
            &self.measurement_id,
            &PrivacyConfig {
                anonymize_ip: true,
                allow_google_signals: false,
                allow_ad_personalization_signals: false,
            },
        )?;
        info!("Google Analytics enabled");
        Ok(())
    }

    /// Denies consent, purges cookies and sets the disable flag. Every step
    /// runs even when an earlier one fails; the first error is returned.
    pub fn disable(&self) -> PageResult<()> {
        run_all([
            step("consent update", || match gtag() {
                Some(gtag) => {
                    call_gtag(&gtag, "consent", "update", &ConsentUpdate { analytics_storage: "denied" })?;
                    info!("Google Analytics disabled");
                    Ok(())
                }
                None => Ok(()),
            }),
            step("cookie purge", || self.purge_cookies()),
            step("disable flag", || self.set_disable_flag(true)),
        ])
    }

    pub fn purge_cookies(&self) -> PageResult<()> {
        let document = dom::document()?
            .dyn_into::<HtmlDocument>()
            .map_err(|_| PageError::NoDocument)?;
        let hostname = dom::window()?.location().hostname()?;
        for cookie in expiry_cookies(&cookie_names(&self.measurement_id), &hostname) {
            document.set_cookie(&cookie)?;
        }
        info!("Google Analytics cookies cleared");
        Ok(())
    }

    fn set_disable_flag(&self, disabled: bool) -> PageResult<()> {
        let window = dom::window()?;
        let key = format!("ga-disable-{}", self.measurement_id);
        Reflect::set(&window, &JsValue::from_str(&key), &JsValue::from_bool(disabled))?;
        Ok(())
    }
}

type Step<'a> = (&'static str, Box<dyn FnOnce() -> PageResult<()> + 'a>);

fn step<'a>(name: &'static str, run: impl FnOnce() -> PageResult<()> + 'a) -> Step<'a> {
    (name, Box::new(run))
}

/// Runs every step, logging failures, and reports the first one.
fn run_all<'a>(steps: impl IntoIterator<Item = Step<'a>>) -> PageResult<()> {
    let mut first = None;
    for (name, step) in steps {
        if let Err(e) = step() {
            warn!("Analytics {} failed: {}", name, e);
            first.get_or_insert(e);
        }
    }
    first.map_or(Ok(()), Err)
}

fn gtag() -> Option<Function> {
    let gtag = dom::global("gtag")?;
    match gtag.dyn_into::<Function>() {
        Ok(gtag) => Some(gtag),
        Err(_) => {
            warn!("window.gtag is not a function");
            None
        }
    }
}

fn call_gtag<T: Serialize>(gtag: &Function, command: &str, target: &str, params: &T) -> PageResult<()> {
    let params = serde_wasm_bindgen::to_value(params).map_err(|e| PageError::Js(e.to_string()))?;
    gtag.call3(
        &JsValue::NULL,
        &JsValue::from_str(command),
        &JsValue::from_str(target),
        &params,
    )?;
    Ok(())
}

/// Every cookie gtag and the legacy analytics.js may have written.
pub fn cookie_names(measurement_id: &str) -> Vec<String> {
    let mut names = vec![
        "_ga".to_string(),
        format!("_ga_{}", measurement_id),
        "_gid".to_string(),
        "_gat".to_string(),
        format!("_gat_gtag_{}", measurement_id.replace('-', "_")),
    ];
    names.extend(LEGACY_COOKIES.iter().map(|name| name.to_string()));
    names
}

/// Cookie domains worth expiring for `hostname`: the host itself and its
/// registrable parent, each bare and dot-prefixed.
pub fn cookie_domains(hostname: &str) -> Vec<String> {
    let hostname = hostname.trim().trim_end_matches('.');
    if hostname.is_empty() {
        return Vec::new();
    }
    let mut domains = vec![hostname.to_string()];
    let is_ip = hostname.parse::<std::net::IpAddr>().is_ok();
    if !is_ip && hostname.contains('.') {
        domains.push(format!(".{}", hostname));
        let labels: Vec<&str> = hostname.rsplit('.').take(2).collect();
        let registrable = format!("{}.{}", labels[1], labels[0]);
        if registrable != hostname {
            domains.push(registrable.clone());
            domains.push(format!(".{}", registrable));
        }
    }
    domains
}

/// `document.cookie` assignments that expire every name on every domain,
/// plus the domainless (host-only) form.
pub fn expiry_cookies(names: &[String], hostname: &str) -> Vec<String> {
    let domains = cookie_domains(hostname);
    let mut cookies = Vec::with_capacity(names.len() * (domains.len() + 1));
    for name in names {
        cookies.push(format!("{}=; {};", name, EXPIRED));
        for domain in &domains {
            cookies.push(format!("{}=; {}; domain={};", name, EXPIRED, domain));
        }
    }
    cookies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_steps_run_after_a_failure() {
        use std::cell::RefCell;

        let ran = RefCell::new(Vec::new());
        let result = run_all([
            step("consent update", || {
                ran.borrow_mut().push("consent");
                Err(PageError::Js("gtag threw".to_string()))
            }),
            step("cookie purge", || {
                ran.borrow_mut().push("purge");
                Err(PageError::Js("SecurityError".to_string()))
            }),
            step("disable flag", || {
                ran.borrow_mut().push("flag");
                Ok(())
            }),
        ]);
        assert_eq!(*ran.borrow(), vec!["consent", "purge", "flag"]);
        match result {
            Err(PageError::Js(message)) => assert_eq!(message, "gtag threw"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn all_steps_succeeding_is_ok() {
        assert!(run_all([step("disable flag", || Ok(()))]).is_ok());
    }

    #[test]
    fn cookie_names_follow_measurement_id() {
        let names = cookie_names("G-XT881QNV2H");
        assert_eq!(names.len(), 11);
        assert!(names.contains(&"_ga_G-XT881QNV2H".to_string()));
        assert!(names.contains(&"_gat_gtag_G_XT881QNV2H".to_string()));
        assert!(names.contains(&"__utmz".to_string()));
    }

    #[test]
    fn subdomain_gets_host_and_registrable_domains() {
        assert_eq!(
            cookie_domains("www.pawtrack.eu"),
            vec!["www.pawtrack.eu", ".www.pawtrack.eu", "pawtrack.eu", ".pawtrack.eu"]
        );
    }

    #[test]
    fn apex_domain_is_not_duplicated() {
        assert_eq!(cookie_domains("pawtrack.eu"), vec!["pawtrack.eu", ".pawtrack.eu"]);
    }

    #[test]
    fn local_hosts_only_get_host_form() {
        assert_eq!(cookie_domains("localhost"), vec!["localhost"]);
        assert_eq!(cookie_domains("127.0.0.1"), vec!["127.0.0.1"]);
        assert!(cookie_domains("").is_empty());
    }

    #[test]
    fn every_cookie_is_expired_at_root_path() {
        let names = vec!["_ga".to_string()];
        let cookies = expiry_cookies(&names, "www.pawtrack.eu");
        assert_eq!(cookies.len(), 5);
        assert_eq!(cookies[0], "_ga=; expires=Thu, 01 Jan 1970 00:00:00 UTC; path=/;");
        assert_eq!(
            cookies[4],
            "_ga=; expires=Thu, 01 Jan 1970 00:00:00 UTC; path=/; domain=.pawtrack.eu;"
        );
        assert!(cookies.iter().all(|c| c.contains("path=/")));
    }
}
