use std::cell::RefCell;

use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement, HtmlInputElement};

use crate::dom;
use crate::error::PageResult;

const EMPHASIS: [&str; 2] = ["border-primary", "bg-light"];
const BORDER_WIDTH: &str = "border-width";
const CHECKED_WIDTH: &str = "2px";

/// Inline `border-width` to put back when the emphasis is removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restore {
    Clear,
    Set(String),
}

impl Restore {
    pub fn from_inline(value: &str) -> Self {
        if value.is_empty() {
            Restore::Clear
        } else {
            Restore::Set(value.to_string())
        }
    }
}

/// What the label looked like before it was emphasized.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Saved {
    width: Restore,
    added: Vec<&'static str>,
}

/// The parts of a label this enhancer touches: its classes and the inline
/// `border-width` (empty when unset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelLook {
    pub classes: Vec<String>,
    pub border_width: String,
}

impl LabelLook {
    fn has(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Emphasis bookkeeping for one label.
#[derive(Debug, Default)]
pub struct LabelState {
    saved: Option<Saved>,
}

impl LabelState {
    /// The look the label should switch to, or `None` when nothing changes.
    /// Checking twice keeps the first snapshot; unchecking puts back exactly
    /// what was there before.
    pub fn toggle(&mut self, current: &LabelLook, checked: bool) -> Option<LabelLook> {
        if checked {
            if self.saved.is_some() {
                return None;
            }
            let added: Vec<&'static str> = EMPHASIS.into_iter().filter(|c| !current.has(c)).collect();
            let mut classes = current.classes.clone();
            classes.extend(added.iter().map(|c| c.to_string()));
            self.saved = Some(Saved { width: Restore::from_inline(&current.border_width), added });
            Some(LabelLook { classes, border_width: CHECKED_WIDTH.to_string() })
        } else {
            let saved = self.saved.take()?;
            let classes = current
                .classes
                .iter()
                .filter(|c| !saved.added.iter().any(|added| *added == c.as_str()))
                .cloned()
                .collect();
            let border_width = match saved.width {
                Restore::Set(width) => width,
                Restore::Clear => String::new(),
            };
            Some(LabelLook { classes, border_width })
        }
    }
}

struct LabelStyle {
    label: HtmlElement,
    state: RefCell<LabelState>,
}

impl LabelStyle {
    fn look(&self) -> PageResult<LabelLook> {
        Ok(LabelLook {
            classes: self.label.class_name().split_whitespace().map(str::to_string).collect(),
            border_width: self.label.style().get_property_value(BORDER_WIDTH)?,
        })
    }

    fn apply(&self, checked: bool) -> PageResult<()> {
        let Some(next) = self.state.borrow_mut().toggle(&self.look()?, checked) else {
            return Ok(());
        };
        self.label.set_class_name(&next.classes.join(" "));
        let style = self.label.style();
        if next.border_width.is_empty() {
            style.remove_property(BORDER_WIDTH)?;
        } else {
            style.set_property(BORDER_WIDTH, &next.border_width)?;
        }
        Ok(())
    }
}

fn label_for(checkbox: &Element) -> Option<HtmlElement> {
    let id = checkbox.id();
    if id.is_empty() {
        return None;
    }
    dom::document()
        .ok()?
        .query_selector(&format!("label[for=\"{}\"]", id))
        .ok()
        .flatten()?
        .dyn_into::<HtmlElement>()
        .ok()
}

pub fn init() -> PageResult<()> {
    for checkbox in dom::query_all(".service-checkbox")? {
        let Ok(input) = checkbox.clone().dyn_into::<HtmlInputElement>() else {
            continue;
        };
        let Some(label) = label_for(&checkbox) else {
            continue;
        };
        let label = LabelStyle { label, state: RefCell::default() };
        dom::listen(&checkbox, "change", move |_| {
            if let Err(e) = label.apply(input.checked()) {
                log::warn!("Could not style service label: {}", e);
            }
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inline_width_is_cleared_on_restore() {
        assert_eq!(Restore::from_inline(""), Restore::Clear);
    }

    #[test]
    fn explicit_inline_width_is_put_back() {
        assert_eq!(Restore::from_inline("1px"), Restore::Set("1px".to_string()));
    }

    fn look(classes: &[&str], border_width: &str) -> LabelLook {
        LabelLook {
            classes: classes.iter().map(|c| c.to_string()).collect(),
            border_width: border_width.to_string(),
        }
    }

    #[test]
    fn unchecking_restores_the_original_look() {
        let start = look(&["form-check-label", "bg-light"], "1px");
        let mut state = LabelState::default();

        let on = state.toggle(&start, true).unwrap();
        assert_eq!(on, look(&["form-check-label", "bg-light", "border-primary"], "2px"));

        let off = state.toggle(&on, false).unwrap();
        assert_eq!(off, start);
    }

    #[test]
    fn unchecking_clears_a_width_that_was_not_inline() {
        let start = look(&["form-check-label"], "");
        let mut state = LabelState::default();
        let on = state.toggle(&start, true).unwrap();
        assert_eq!(state.toggle(&on, false).unwrap(), start);
    }

    #[test]
    fn checking_twice_keeps_the_first_snapshot() {
        let start = look(&["form-check-label"], "1px");
        let mut state = LabelState::default();
        let on = state.toggle(&start, true).unwrap();
        assert_eq!(state.toggle(&on, true), None);
        assert_eq!(state.toggle(&on, false).unwrap(), start);
    }

    #[test]
    fn unchecking_an_untouched_label_changes_nothing() {
        let mut state = LabelState::default();
        assert_eq!(state.toggle(&look(&["bg-light"], "3px"), false), None);
    }
}
