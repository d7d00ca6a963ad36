use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, warn};
use web_sys::Element;

use crate::dom;
use crate::error::{PageError, PageResult};
use crate::widgets::Widgets;

const MODAL_ID: &str = "privacyModal";
const TRIGGERS: &str = "[data-mdb-target=\"#privacyModal\"]";
const DISMISS: &str = "[data-mdb-dismiss=\"modal\"]";

/// How the privacy modal is opened, decided once the widget library settled.
#[derive(Clone)]
pub enum ModalStrategy {
    LibraryBacked(Widgets),
    Manual(ManualModal),
}

impl ModalStrategy {
    pub fn select(widgets: Option<Widgets>, modal: &Element) -> PageResult<Self> {
        match widgets {
            Some(widgets) if widgets.has("Modal") => Ok(ModalStrategy::LibraryBacked(widgets)),
            _ => Ok(ModalStrategy::Manual(ManualModal::new(modal.clone())?)),
        }
    }

    pub fn open(&self, modal: &Element) -> PageResult<()> {
        match self {
            ModalStrategy::LibraryBacked(widgets) => match widgets.modal(modal)? {
                Some(instance) => instance.call("show"),
                None => Err(PageError::Js("Modal widget unavailable".to_string())),
            },
            ModalStrategy::Manual(manual) => manual.open(),
        }
    }
}

/// Minimal modal + backdrop for pages without the widget library.
#[derive(Clone)]
pub struct ManualModal {
    modal: Element,
    backdrop: Rc<RefCell<Option<Element>>>,
}

impl ManualModal {
    fn new(modal: Element) -> PageResult<Self> {
        let manual = Self { modal, backdrop: Rc::default() };
        for close in dom::elements(manual.modal.query_selector_all(DISMISS)?) {
            let manual = manual.clone();
            dom::listen(&close, "click", move |_| manual.close())?;
        }
        Ok(manual)
    }

    pub fn is_open(&self) -> bool {
        self.backdrop.borrow().is_some()
    }

    fn open(&self) -> PageResult<()> {
        if self.is_open() {
            return Ok(());
        }
        let document = dom::document()?;
        let body = document.body().ok_or(PageError::MissingElement("body"))?;

        self.modal.class_list().add_1("show")?;
        dom::set_style(&self.modal, "display", "block")?;
        body.class_list().add_1("modal-open")?;

        let backdrop = document.create_element("div")?;
        backdrop.set_class_name("modal-backdrop fade show");
        body.append_child(&backdrop)?;
        let manual = self.clone();
        dom::listen(&backdrop, "click", move |_| manual.close())?;
        *self.backdrop.borrow_mut() = Some(backdrop);
        Ok(())
    }

    /// Shared teardown for backdrop clicks and close controls.
    pub fn close(&self) {
        let _ = self.modal.class_list().remove_1("show");
        let _ = dom::set_style(&self.modal, "display", "none");
        if let Ok(Some(body)) = dom::document().map(|d| d.body()) {
            let _ = body.class_list().remove_1("modal-open");
        }
        if let Some(backdrop) = self.backdrop.borrow_mut().take() {
            backdrop.remove();
        }
    }
}

/// A strategy that may not be known yet. Opening before it is known is
/// remembered and honored once it resolves.
#[derive(Debug)]
pub enum Gate<T> {
    Waiting { pending: bool },
    Ready(T),
}

impl<T> Default for Gate<T> {
    fn default() -> Self {
        Gate::Waiting { pending: false }
    }
}

impl<T: Clone> Gate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value to open with right now, if there is one.
    pub fn request(&mut self) -> Option<T> {
        match self {
            Gate::Ready(value) => Some(value.clone()),
            Gate::Waiting { pending } => {
                *pending = true;
                None
            }
        }
    }

    /// Installs the value; hands it back when an open was waiting for it.
    pub fn resolve(&mut self, value: T) -> Option<T> {
        let pending = matches!(self, Gate::Waiting { pending: true });
        *self = Gate::Ready(value.clone());
        pending.then_some(value)
    }
}

/// The bound privacy modal. Triggers work from the start; how the modal
/// opens is settled later by [`PrivacyModal::resolve`].
pub struct PrivacyModal {
    modal: Element,
    gate: Rc<RefCell<Gate<ModalStrategy>>>,
}

impl PrivacyModal {
    /// Picks the strategy once widget readiness settled and opens the modal
    /// if a trigger was clicked in the meantime.
    pub fn resolve(&self, widgets: Option<Widgets>) -> PageResult<()> {
        let strategy = ModalStrategy::select(widgets, &self.modal)?;
        let waiting = self.gate.borrow_mut().resolve(strategy);
        match waiting {
            Some(strategy) => strategy.open(&self.modal),
            None => Ok(()),
        }
    }
}

/// Wires the triggers immediately so their default navigation never runs.
pub fn bind() -> PageResult<Option<PrivacyModal>> {
    let triggers = dom::query_all(TRIGGERS)?;
    if triggers.is_empty() {
        return Ok(None);
    }
    let Some(modal) = dom::by_id::<Element>(MODAL_ID) else {
        debug!("Privacy modal triggers without #{}", MODAL_ID);
        return Ok(None);
    };

    let gate = Rc::new(RefCell::new(Gate::<ModalStrategy>::new()));
    for trigger in triggers {
        let gate = gate.clone();
        let modal = modal.clone();
        dom::listen(&trigger, "click", move |event| {
            event.prevent_default();
            let strategy = gate.borrow_mut().request();
            let Some(strategy) = strategy else {
                debug!("Privacy modal requested before widgets settled");
                return;
            };
            if let Err(e) = strategy.open(&modal) {
                warn!("Error opening privacy modal: {}", e);
            }
        })?;
    }
    Ok(Some(PrivacyModal { modal, gate }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn early_click_opens_once_resolved() {
        let mut gate = Gate::new();
        assert_eq!(gate.request(), None);
        assert_eq!(gate.resolve("manual"), Some("manual"));
    }

    #[test]
    fn resolving_without_a_click_opens_nothing() {
        let mut gate = Gate::new();
        assert_eq!(gate.resolve("manual"), None);
    }

    #[test]
    fn clicks_after_resolve_open_directly() {
        let mut gate = Gate::new();
        gate.resolve("library");
        assert_eq!(gate.request(), Some("library"));
        assert_eq!(gate.request(), Some("library"));
    }

    #[test]
    fn repeated_early_clicks_open_once() {
        let mut gate = Gate::new();
        gate.request();
        gate.request();
        assert_eq!(gate.resolve("manual"), Some("manual"));
        assert!(matches!(gate, Gate::Ready("manual")));
    }
}
