use std::cell::Cell;
use std::rc::Rc;

use gloo_net::http::Request;
use log::{debug, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::js_sys::Function;
use web_sys::{Element, Event, FormData, HtmlButtonElement, HtmlFormElement};

use crate::components::toast::{Notifier, ToastKind};
use crate::dom;
use crate::error::{PageError, PageResult};

const SERVICES_CHECKED: &str = "input[name=\"services[]\"]:checked";
const SERVICE_CHECKBOXES: &str = ".service-checkbox";
const INVALID: &str = "is-invalid";
const SUBMITTING_LABEL: &str = "<i class=\"fas fa-spinner fa-spin me-2\"></i>Submitting...";

pub const MSG_CAPTCHA: &str = "Please complete the reCAPTCHA verification before submitting.";
pub const MSG_NO_SERVICE: &str = "Please select at least one service type.";
pub const MSG_REQUIRED: &str = "Please fill in all required fields.";
pub const MSG_SUBMITTING: &str = "Submitting your application... Please wait.";
pub const MSG_SUCCESS: &str = "Thank you! Your application has been submitted successfully.";
pub const MSG_FAILURE: &str = "There was an error submitting your application. Please try again.";

/// Outcome of the submit-time checks, in the order they are applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Ready,
    MissingCaptcha,
    NoServiceSelected,
    MissingRequired,
}

impl Verdict {
    pub fn from_captcha(solved: bool) -> Self {
        if solved {
            Verdict::Ready
        } else {
            Verdict::MissingCaptcha
        }
    }

    /// Only consulted once the CAPTCHA passed; the service group is reported
    /// ahead of empty required fields.
    pub fn from_fields(invalid_fields: usize, services_checked: usize) -> Self {
        if services_checked == 0 {
            Verdict::NoServiceSelected
        } else if invalid_fields > 0 {
            Verdict::MissingRequired
        } else {
            Verdict::Ready
        }
    }

    /// Only a clean verdict may reach the network.
    pub fn allows_request(self) -> bool {
        self == Verdict::Ready
    }

    pub fn message(self) -> Option<&'static str> {
        match self {
            Verdict::Ready => None,
            Verdict::MissingCaptcha => Some(MSG_CAPTCHA),
            Verdict::NoServiceSelected => Some(MSG_NO_SERVICE),
            Verdict::MissingRequired => Some(MSG_REQUIRED),
        }
    }
}

/// What the page does once the backend answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub reset_form: bool,
    pub reset_captcha: bool,
    pub toast: (ToastKind, &'static str),
}

impl Outcome {
    pub fn from_result(result: &PageResult<()>) -> Self {
        match result {
            Ok(()) => Self {
                reset_form: true,
                reset_captcha: true,
                toast: (ToastKind::Info, MSG_SUCCESS),
            },
            Err(_) => Self {
                reset_form: false,
                reset_captcha: false,
                toast: (ToastKind::Error, MSG_FAILURE),
            },
        }
    }
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// The page's reCAPTCHA widget (`window.grecaptcha`).
#[derive(Clone, Debug)]
pub struct Captcha {
    widget: wasm_bindgen::JsValue,
}

impl Captcha {
    pub fn detect() -> Option<Self> {
        dom::global("grecaptcha").map(|widget| Self { widget })
    }

    fn method(&self, name: &str) -> Option<Function> {
        dom::property(&self.widget, name).and_then(|f| f.dyn_into::<Function>().ok())
    }

    /// Empty when the challenge has not been solved.
    pub fn response(&self) -> String {
        self.method("getResponse")
            .and_then(|f| f.call0(&self.widget).ok())
            .and_then(|token| token.as_string())
            .unwrap_or_default()
    }

    pub fn reset(&self) {
        if let Some(reset) = self.method("reset") {
            if let Err(e) = reset.call0(&self.widget) {
                warn!("Could not reset reCAPTCHA: {:?}", e);
            }
        }
    }
}

/// Flags empty required fields; each flag clears on the field's next input.
fn mark_required(form: &HtmlFormElement) -> PageResult<usize> {
    let mut invalid = 0;
    for field in dom::elements(form.query_selector_all("[required]")?) {
        if !is_blank(&dom::field_value(&field)) {
            continue;
        }
        invalid += 1;
        field.class_list().add_1(INVALID)?;
        let target = field.clone();
        dom::listen_once(&field, "input", move |_| {
            let _ = target.class_list().remove_1(INVALID);
        })?;
    }
    Ok(invalid)
}

struct SubmitButton {
    button: Option<HtmlButtonElement>,
    label: String,
}

impl SubmitButton {
    fn busy(form: &HtmlFormElement) -> Self {
        let button = form
            .query_selector("button[type=\"submit\"]")
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlButtonElement>().ok());
        let label = button.as_ref().map(|b| b.inner_html()).unwrap_or_default();
        if let Some(button) = &button {
            button.set_disabled(true);
            button.set_inner_html(SUBMITTING_LABEL);
        }
        Self { button, label }
    }

    fn restore(self) {
        if let Some(button) = self.button {
            button.set_disabled(false);
            button.set_inner_html(&self.label);
        }
    }
}

async fn post(form: &HtmlFormElement) -> PageResult<()> {
    let body = FormData::new_with_form(form)?;
    let response = Request::post(&form.action())
        .body(body)
        .send()
        .await
        .map_err(|e| PageError::Js(e.to_string()))?;
    if response.ok() {
        Ok(())
    } else {
        Err(PageError::Js(format!(
            "Submission failed: {} {}",
            response.status(),
            response.status_text()
        )))
    }
}

/// `reset()` fires no `change`, so the service labels are told explicitly.
fn resync_services(form: &HtmlFormElement) -> PageResult<()> {
    for checkbox in dom::elements(form.query_selector_all(SERVICE_CHECKBOXES)?) {
        checkbox.dispatch_event(&Event::new("change")?)?;
    }
    Ok(())
}

async fn submit(form: HtmlFormElement, notifier: Notifier, captcha: Option<Captcha>) {
    let button = SubmitButton::busy(&form);
    notifier.info(MSG_SUBMITTING);

    let result = post(&form).await;
    match &result {
        Ok(()) => info!("Questionnaire submitted"),
        Err(e) => gloo_console::error!("Form submission error:", e.to_string()),
    }

    let outcome = Outcome::from_result(&result);
    let (kind, message) = outcome.toast;
    notifier.show(kind, message);
    if outcome.reset_form {
        form.reset();
        if let Err(e) = resync_services(&form) {
            warn!("Could not refresh service labels: {}", e);
        }
    }
    if outcome.reset_captcha {
        if let Some(captcha) = captcha {
            captcha.reset();
        }
    }

    button.restore();
}

fn on_submit(form: &HtmlFormElement, notifier: Notifier, in_flight: &Rc<Cell<bool>>) -> PageResult<()> {
    if in_flight.get() {
        debug!("Submission already in progress");
        return Ok(());
    }

    let captcha = Captcha::detect();
    let solved = captcha.as_ref().map_or(true, |c| !c.response().is_empty());
    if let Some(message) = Verdict::from_captcha(solved).message() {
        notifier.error(message);
        return Ok(());
    }

    let invalid = mark_required(form)?;
    let services = form.query_selector_all(SERVICES_CHECKED)?.length() as usize;
    let verdict = Verdict::from_fields(invalid, services);
    if !verdict.allows_request() {
        if let Some(message) = verdict.message() {
            notifier.error(message);
        }
        return Ok(());
    }

    in_flight.set(true);
    let form = form.clone();
    let in_flight = in_flight.clone();
    spawn_local(async move {
        submit(form, notifier, captcha).await;
        in_flight.set(false);
    });
    Ok(())
}

pub fn init(notifier: Notifier) -> PageResult<()> {
    let Some(form) = dom::document()?
        .query_selector("form")?
        .and_then(|el: Element| el.dyn_into::<HtmlFormElement>().ok())
    else {
        debug!("No form on this page");
        return Ok(());
    };

    debug!("reCAPTCHA loaded: {}", Captcha::detect().is_some());

    let in_flight = Rc::new(Cell::new(false));
    let target = form.clone();
    dom::listen(&target, "submit", move |event| {
        event.prevent_default();
        if let Err(e) = on_submit(&form, notifier, &in_flight) {
            warn!("Form submission aborted: {}", e);
            notifier.error(MSG_FAILURE);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_service_blocks_even_when_fields_are_valid() {
        assert_eq!(Verdict::from_fields(0, 0), Verdict::NoServiceSelected);
    }

    #[test]
    fn service_check_is_reported_before_required_fields() {
        assert_eq!(Verdict::from_fields(3, 0), Verdict::NoServiceSelected);
        assert_eq!(Verdict::from_fields(3, 1), Verdict::MissingRequired);
    }

    #[test]
    fn complete_form_is_ready() {
        assert_eq!(Verdict::from_fields(0, 2), Verdict::Ready);
        assert_eq!(Verdict::Ready.message(), None);
    }

    #[test]
    fn unsolved_captcha_blocks() {
        assert_eq!(Verdict::from_captcha(false), Verdict::MissingCaptcha);
        assert_eq!(Verdict::from_captcha(true), Verdict::Ready);
    }

    #[test]
    fn every_block_has_a_message() {
        assert_eq!(Verdict::MissingCaptcha.message(), Some(MSG_CAPTCHA));
        assert_eq!(Verdict::NoServiceSelected.message(), Some(MSG_NO_SERVICE));
        assert_eq!(Verdict::MissingRequired.message(), Some(MSG_REQUIRED));
    }

    #[test]
    fn zero_services_never_reach_the_network() {
        for invalid in [0, 1, 5] {
            assert!(!Verdict::from_fields(invalid, 0).allows_request());
        }
        assert!(!Verdict::MissingCaptcha.allows_request());
        assert!(Verdict::from_fields(0, 1).allows_request());
    }

    #[test]
    fn accepted_submission_resets_the_form() {
        assert_eq!(
            Outcome::from_result(&Ok(())),
            Outcome {
                reset_form: true,
                reset_captcha: true,
                toast: (ToastKind::Info, MSG_SUCCESS),
            }
        );
    }

    #[test]
    fn failed_submission_keeps_what_was_entered() {
        let failed = Err(PageError::Js("Submission failed: 500 Internal Server Error".to_string()));
        assert_eq!(
            Outcome::from_result(&failed),
            Outcome {
                reset_form: false,
                reset_captcha: false,
                toast: (ToastKind::Error, MSG_FAILURE),
            }
        );
    }

    #[test]
    fn whitespace_only_values_are_blank() {
        assert!(is_blank(""));
        assert!(is_blank("   \n\t"));
        assert!(!is_blank(" Rex "));
    }
}
