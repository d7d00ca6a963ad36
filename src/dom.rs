use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{AddEventListenerOptions, Document, Element, Event, EventTarget, HtmlElement, NodeList, Window};

use crate::error::{PageError, PageResult};

pub fn window() -> PageResult<Window> {
    web_sys::window().ok_or(PageError::NoWindow)
}

pub fn document() -> PageResult<Document> {
    window()?.document().ok_or(PageError::NoDocument)
}

pub fn by_id<T: JsCast>(id: &str) -> Option<T> {
    document().ok()?.get_element_by_id(id)?.dyn_into::<T>().ok()
}

pub fn elements(list: NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

pub fn query_all(selector: &str) -> PageResult<Vec<Element>> {
    Ok(elements(document()?.query_selector_all(selector)?))
}

/// Reads a global like `window.gtag`, `None` when it is undefined or null.
pub fn global(name: &str) -> Option<JsValue> {
    let window = web_sys::window()?;
    property(&window, name)
}

pub fn property(target: &JsValue, name: &str) -> Option<JsValue> {
    web_sys::js_sys::Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

/// `value` property of any form control.
pub fn field_value(element: &Element) -> String {
    property(element, "value")
        .and_then(|value| value.as_string())
        .unwrap_or_default()
}

/// Registers `handler` for the lifetime of the page.
pub fn listen<F>(target: &EventTarget, event: &str, handler: F) -> PageResult<()>
where
    F: FnMut(Event) + 'static,
{
    let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
    callback.forget();
    Ok(())
}

/// Registers `handler` for a single dispatch of `event`.
pub fn listen_once<F>(target: &EventTarget, event: &str, handler: F) -> PageResult<()>
where
    F: FnOnce(Event) + 'static,
{
    let options = AddEventListenerOptions::new();
    options.set_once(true);
    let callback = Closure::once_into_js(handler);
    target.add_event_listener_with_callback_and_add_event_listener_options(
        event,
        callback.unchecked_ref(),
        &options,
    )?;
    Ok(())
}

pub fn set_style(element: &Element, property: &str, value: &str) -> PageResult<()> {
    if let Some(element) = element.dyn_ref::<HtmlElement>() {
        element.style().set_property(property, value)?;
    }
    Ok(())
}

pub fn is_mobile_agent(user_agent: &str) -> bool {
    ["iPhone", "iPad", "iPod", "Android"]
        .iter()
        .any(|marker| user_agent.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mobile_agents_are_detected() {
        assert!(is_mobile_agent(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15"
        ));
        assert!(is_mobile_agent("Mozilla/5.0 (Linux; Android 14; Pixel 8)"));
        assert!(!is_mobile_agent(
            "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
        ));
    }
}
