use web_sys::{ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition};

use crate::dom;
use crate::error::PageResult;

/// What a click on an in-page link should do.
#[derive(Debug, PartialEq, Eq)]
pub enum AnchorAction<'a> {
    /// Let the browser (or the modal trigger) handle it.
    Ignore,
    ScrollTo(&'a str),
}

pub fn anchor_action(href: &str, is_modal_trigger: bool) -> AnchorAction<'_> {
    match href {
        "#" if !is_modal_trigger => AnchorAction::Ignore,
        href if href.starts_with('#') && href.len() > 1 => AnchorAction::ScrollTo(href),
        _ => AnchorAction::Ignore,
    }
}

pub fn init() -> PageResult<()> {
    for anchor in dom::query_all("a[href^=\"#\"]")? {
        let link = anchor.clone();
        dom::listen(&anchor, "click", move |event| {
            let href = link.get_attribute("href").unwrap_or_default();
            let AnchorAction::ScrollTo(selector) = anchor_action(&href, link.has_attribute("data-mdb-target")) else {
                return;
            };
            let Ok(document) = dom::document() else {
                return;
            };
            if let Ok(Some(target)) = document.query_selector(selector) {
                event.prevent_default();
                let options = ScrollIntoViewOptions::new();
                options.set_behavior(ScrollBehavior::Smooth);
                options.set_block(ScrollLogicalPosition::Start);
                target.scroll_into_view_with_scroll_into_view_options(&options);
            }
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_hash_is_ignored() {
        assert_eq!(anchor_action("#", false), AnchorAction::Ignore);
    }

    #[test]
    fn bare_hash_modal_trigger_scrolls_nowhere() {
        assert_eq!(anchor_action("#", true), AnchorAction::Ignore);
    }

    #[test]
    fn section_links_scroll() {
        assert_eq!(anchor_action("#questionnaire", false), AnchorAction::ScrollTo("#questionnaire"));
        assert_eq!(anchor_action("#features", true), AnchorAction::ScrollTo("#features"));
    }
}
