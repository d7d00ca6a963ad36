use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use log::warn;
use wasm_bindgen_futures::spawn_local;
use web_sys::Element;
use yew::prelude::*;
use yew::AppHandle;
use yew_hooks::prelude::*;

use crate::config::SiteConfig;
use crate::dom;
use crate::error::{PageError, PageResult};
use crate::widgets::{self, WidgetHandle, Widgets};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Error,
}

impl ToastKind {
    pub fn title(self) -> &'static str {
        match self {
            ToastKind::Info => "Info",
            ToastKind::Error => "Error",
        }
    }

    pub fn icon_class(self) -> &'static str {
        match self {
            ToastKind::Info => "fas fa-info-circle text-info me-2",
            ToastKind::Error => "fas fa-exclamation-triangle text-danger me-2",
        }
    }

    pub fn container_class(self) -> &'static str {
        match self {
            ToastKind::Info => "toast-container z-max position-fixed top-0 end-0 p-3",
            ToastKind::Error => "toast-container position-fixed top-0 end-0 p-3",
        }
    }
}

/// Shows info and error toasts with the lifetimes from [`SiteConfig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Notifier {
    info_ms: u32,
    error_ms: u32,
    fade_ms: u32,
    widget_timeout_ms: u32,
}

impl Notifier {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            info_ms: config.info_toast_ms,
            error_ms: config.error_toast_ms,
            fade_ms: config.toast_fade_ms,
            widget_timeout_ms: config.widget_ready_timeout_ms,
        }
    }

    pub fn lifetime_ms(&self, kind: ToastKind) -> u32 {
        match kind {
            ToastKind::Info => self.info_ms,
            ToastKind::Error => self.error_ms,
        }
    }

    pub fn info(&self, message: &str) {
        self.show(ToastKind::Info, message);
    }

    pub fn error(&self, message: &str) {
        self.show(ToastKind::Error, message);
    }

    pub fn show(&self, kind: ToastKind, message: &str) {
        let notifier = *self;
        let message = message.to_owned();
        spawn_local(async move {
            let widgets = widgets::ready(notifier.widget_timeout_ms).await;
            if let Err(e) = notifier.mount(kind, message, widgets) {
                warn!("Error showing toast: {}", e);
            }
        });
    }

    fn mount(&self, kind: ToastKind, message: String, widgets: Option<Widgets>) -> PageResult<()> {
        let document = dom::document()?;
        let body = document.body().ok_or(PageError::MissingElement("body"))?;
        let container = document.create_element("div")?;
        container.set_class_name(kind.container_class());
        body.append_child(&container)?;

        let app: Rc<RefCell<Option<AppHandle<Toast>>>> = Rc::default();
        let on_dismissed = {
            let app = app.clone();
            let container = container.clone();
            Callback::from(move |_| {
                let handle = app.borrow_mut().take();
                if let Some(handle) = handle {
                    handle.destroy();
                }
                container.remove();
            })
        };

        let props = ToastProps {
            kind,
            message,
            lifetime_ms: self.lifetime_ms(kind),
            fade_ms: self.fade_ms,
            widgets,
            on_dismissed,
        };
        let handle = yew::Renderer::<Toast>::with_root_and_props(container, props).render();
        *app.borrow_mut() = Some(handle);
        Ok(())
    }
}

#[derive(Properties, PartialEq)]
pub struct ToastProps {
    pub kind: ToastKind,
    pub message: String,
    pub lifetime_ms: u32,
    pub fade_ms: u32,
    pub widgets: Option<Widgets>,
    pub on_dismissed: Callback<()>,
}

#[function_component(Toast)]
pub fn toast(props: &ToastProps) -> Html {
    let node = use_node_ref();
    let instance = use_mut_ref(|| None::<WidgetHandle>);
    let dismissed = use_mut_ref(|| false);
    let visible = use_state(|| false);

    let dismiss = {
        let instance = instance.clone();
        let visible = visible.clone();
        let on_dismissed = props.on_dismissed.clone();
        let fade_ms = props.fade_ms;
        Callback::from(move |_: ()| {
            if std::mem::replace(&mut *dismissed.borrow_mut(), true) {
                return;
            }
            match instance.borrow().as_ref() {
                Some(handle) => {
                    if let Err(e) = handle.call("hide") {
                        warn!("Error hiding toast: {}", e);
                    }
                }
                None => visible.set(false),
            }
            let on_dismissed = on_dismissed.clone();
            Timeout::new(fade_ms, move || on_dismissed.emit(())).forget();
        })
    };

    {
        let node = node.clone();
        let instance = instance.clone();
        let visible = visible.clone();
        let widgets = props.widgets.clone();
        let lifetime_ms = props.lifetime_ms;
        use_effect_with_deps(
            move |_| {
                let shown = match (widgets, node.cast::<Element>()) {
                    (Some(widgets), Some(element)) => match widgets.toast(&element, lifetime_ms) {
                        Ok(Some(handle)) => match handle.call("show") {
                            Ok(()) => {
                                *instance.borrow_mut() = Some(handle);
                                true
                            }
                            Err(e) => {
                                warn!("Error showing toast widget: {}", e);
                                false
                            }
                        },
                        Ok(None) => false,
                        Err(e) => {
                            warn!("Error creating toast widget: {}", e);
                            false
                        }
                    },
                    _ => false,
                };
                if !shown {
                    visible.set(true);
                }
                || ()
            },
            (),
        );
    }

    {
        let dismiss = dismiss.clone();
        let _expiry = use_timeout(move || dismiss.emit(()), props.lifetime_ms);
    }

    let onclose = Callback::from(move |_: MouseEvent| dismiss.emit(()));

    html! {
        <div
            ref={node}
            class={classes!("toast", (*visible).then(|| "show"))}
            role="alert"
            aria-live="assertive"
            aria-atomic="true"
            data-mdb-autohide="false"
        >
            <div class="toast-header">
                <i class={props.kind.icon_class()}></i>
                <strong class="me-auto">{ props.kind.title() }</strong>
                <button type="button" class="btn-close" aria-label="Close" onclick={onclose}></button>
            </div>
            <div class="toast-body">{ props.message.clone() }</div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetimes_come_from_config() {
        let notifier = Notifier::from_config(&SiteConfig::default());
        assert_eq!(notifier.lifetime_ms(ToastKind::Info), 60_000);
        assert_eq!(notifier.lifetime_ms(ToastKind::Error), 10_000);
    }

    #[test]
    fn variants_differ_in_icon_and_title() {
        assert_eq!(ToastKind::Info.title(), "Info");
        assert_eq!(ToastKind::Error.title(), "Error");
        assert!(ToastKind::Info.icon_class().contains("text-info"));
        assert!(ToastKind::Error.icon_class().contains("text-danger"));
        assert!(ToastKind::Error.container_class().starts_with("toast-container"));
    }
}
