use std::cell::RefCell;

use futures::future::{self, FutureExt, LocalBoxFuture, Shared};
use gloo_timers::future::TimeoutFuture;
use log::{debug, info, warn};
use serde::Serialize;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::js_sys::{Array, Function, Promise, Reflect};
use web_sys::{Element, EventTarget};

use crate::dom;
use crate::error::{PageError, PageResult};

const NAMESPACE: &str = "mdb";

/// Marker selectors and the constructor each one is upgraded with.
const AUTO_INIT: [(&str, &str); 4] = [
    ("[data-mdb-input-init]", "Input"),
    ("[data-mdb-ripple-init]", "Ripple"),
    ("[data-mdb-alert-init]", "Alert"),
    (".modal", "Modal"),
];

type ReadyFuture = Shared<LocalBoxFuture<'static, Option<Widgets>>>;

thread_local! {
    static READY: RefCell<Option<ReadyFuture>> = RefCell::new(None);
}

/// The optional UI widget library (`window.mdb`).
#[derive(Clone, Debug, PartialEq)]
pub struct Widgets {
    namespace: JsValue,
}

/// A constructed widget instance (toast, modal, ...).
#[derive(Clone, Debug, PartialEq)]
pub struct WidgetHandle(JsValue);

#[derive(Serialize)]
struct ToastOptions {
    autohide: bool,
    delay: u32,
}

impl Widgets {
    pub fn detect() -> Option<Self> {
        dom::global(NAMESPACE).map(|namespace| Self { namespace })
    }

    fn constructor(&self, name: &str) -> Option<Function> {
        dom::property(&self.namespace, name).and_then(|ctor| ctor.dyn_into::<Function>().ok())
    }

    pub fn construct(&self, name: &str, element: &Element, options: Option<JsValue>) -> PageResult<Option<WidgetHandle>> {
        let Some(ctor) = self.constructor(name) else {
            return Ok(None);
        };
        let args = match options {
            Some(options) => Array::of2(element, &options),
            None => Array::of1(element),
        };
        Ok(Some(WidgetHandle(Reflect::construct(&ctor, &args)?)))
    }

    pub fn toast(&self, element: &Element, delay: u32) -> PageResult<Option<WidgetHandle>> {
        let options = serde_wasm_bindgen::to_value(&ToastOptions { autohide: false, delay })
            .map_err(|e| PageError::Js(e.to_string()))?;
        self.construct("Toast", element, Some(options))
    }

    pub fn modal(&self, element: &Element) -> PageResult<Option<WidgetHandle>> {
        let Some(ctor) = self.constructor("Modal") else {
            return Ok(None);
        };
        match dom::property(&ctor, "getOrCreateInstance").and_then(|f| f.dyn_into::<Function>().ok()) {
            Some(get_or_create) => Ok(Some(WidgetHandle(get_or_create.call1(&ctor, element)?))),
            None => self.construct("Modal", element, None),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.constructor(name).is_some()
    }
}

impl WidgetHandle {
    /// Calls a zero-argument method such as `show` or `hide`.
    pub fn call(&self, method: &str) -> PageResult<()> {
        let function = dom::property(&self.0, method)
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or_else(|| PageError::Js(format!("widget has no `{}` method", method)))?;
        function.call0(&self.0)?;
        Ok(())
    }
}

/// Resolves once the widget library is usable, or to `None` when it never
/// shows up. The same future is shared by every caller.
pub fn ready(timeout_ms: u32) -> ReadyFuture {
    READY.with(|slot| {
        slot.borrow_mut()
            .get_or_insert_with(|| wait_for_library(timeout_ms).boxed_local().shared())
            .clone()
    })
}

async fn wait_for_library(timeout_ms: u32) -> Option<Widgets> {
    if let Some(widgets) = Widgets::detect() {
        return Some(widgets);
    }

    let document = dom::document().ok()?;
    let target: EventTarget = match library_script() {
        Some(script) => script.into(),
        None if document.ready_state() != "complete" => dom::window().ok()?.into(),
        None => {
            debug!("No widget library script on the page");
            return None;
        }
    };

    let loaded = JsFuture::from(load_promise(&target));
    let timeout = TimeoutFuture::new(timeout_ms);
    futures::pin_mut!(loaded, timeout);
    let _ = future::select(loaded, timeout).await;

    let widgets = Widgets::detect();
    if widgets.is_none() {
        warn!("Widget library not loaded, continuing without widget components");
    }
    widgets
}

fn library_script() -> Option<Element> {
    let document = dom::document().ok()?;
    if let Ok(Some(script)) = document.query_selector("script[data-widget-library]") {
        return Some(script);
    }
    dom::query_all("script[src]")
        .ok()?
        .into_iter()
        .find(|script| {
            script
                .get_attribute("src")
                .map(|src| is_library_src(&src))
                .unwrap_or(false)
        })
}

fn is_library_src(src: &str) -> bool {
    let file = src.rsplit('/').next().unwrap_or(src);
    file.to_ascii_lowercase().starts_with(NAMESPACE)
}

fn load_promise(target: &EventTarget) -> Promise {
    let target = target.clone();
    Promise::new(&mut |resolve: Function, _reject: Function| {
        let on_load = Closure::once_into_js(move || {
            let _ = resolve.call0(&JsValue::NULL);
        });
        let _ = target.add_event_listener_with_callback("load", on_load.unchecked_ref());
    })
}

/// Upgrades every marked element with its widget constructor.
pub fn init_components(widgets: &Widgets) -> PageResult<()> {
    let mut upgraded = 0;
    for (selector, name) in AUTO_INIT {
        if !widgets.has(name) {
            continue;
        }
        for element in dom::query_all(selector)? {
            match widgets.construct(name, &element, None) {
                Ok(_) => upgraded += 1,
                Err(e) => warn!("Error initializing {} widget: {}", name, e),
            }
        }
    }
    info!("Widget components initialized ({} elements)", upgraded);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_script_is_matched_by_file_name() {
        assert!(is_library_src("https://cdnjs.cloudflare.com/ajax/libs/mdb-ui-kit/7.1.0/mdb.umd.min.js"));
        assert!(is_library_src("/js/mdb.min.js"));
        assert!(!is_library_src("https://www.googletagmanager.com/gtag/js?id=G-XT881QNV2H"));
        assert!(!is_library_src("/js/site.js"));
    }
}
