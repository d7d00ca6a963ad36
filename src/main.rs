use log::{info, warn};
use wasm_bindgen_futures::spawn_local;

mod analytics;
mod config;
mod consent;
mod countdown;
mod dom;
mod error;
mod form;
mod widgets;
mod components {
    pub mod launch_card;
    pub mod toast;
}
mod enhancers {
    pub mod checkboxes;
    pub mod modal;
    pub mod range;
    pub mod scroll;
}

use components::toast::Notifier;
use config::SiteConfig;
use error::PageResult;

/// Runs one feature's setup; a failure is logged and the others still run.
fn run(feature: &str, init: impl FnOnce() -> PageResult<()>) {
    match init() {
        Ok(()) => info!("{} ready", feature),
        Err(e) => warn!("{} failed to initialize: {}", feature, e),
    }
}

fn boot() {
    let config = SiteConfig::load();
    let notifier = Notifier::from_config(&config);

    run("Countdown", || countdown::init(&config));
    run("Cookie consent", || consent::init(&config, notifier));
    run("Form", || form::init(notifier));
    run("Smooth scrolling", enhancers::scroll::init);
    run("Range slider", enhancers::range::init);
    run("Service checkboxes", enhancers::checkboxes::init);

    let privacy = enhancers::modal::bind().unwrap_or_else(|e| {
        warn!("Privacy modal failed to initialize: {}", e);
        None
    });

    let ready = widgets::ready(config.widget_ready_timeout_ms);
    spawn_local(async move {
        let library = ready.await;
        if let Some(library) = &library {
            run("Widget components", || widgets::init_components(library));
        }
        if let Some(privacy) = privacy {
            run("Privacy modal", || privacy.resolve(library));
        }
    });
}

fn main() {
    // Initialize console error panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging
    console_log::init_with_level(config::log_level()).expect("error initializing log");

    info!("Starting PawTrack page scripts");
    let loading = dom::document()
        .map(|document| document.ready_state() == "loading")
        .unwrap_or(false);
    if !loading {
        boot();
        return;
    }
    let listening = dom::document().and_then(|document| dom::listen_once(&document, "DOMContentLoaded", |_| boot()));
    if let Err(e) = listening {
        warn!("Could not wait for DOMContentLoaded: {}", e);
        boot();
    }
}
