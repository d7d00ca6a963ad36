use web_sys::{Element, HtmlInputElement};

use crate::dom;
use crate::error::{PageError, PageResult};

const RANGE_ID: &str = "usefulnessRange";
const DISPLAY_ID: &str = "rangeValue";

pub const LABELS: [&str; 5] = [
    "Not useful",
    "Slightly useful",
    "Moderately useful",
    "Very useful",
    "Extremely useful",
];

/// Label for a 1-based slider value.
pub fn label(value: i64) -> &'static str {
    usize::try_from(value - 1)
        .ok()
        .and_then(|index| LABELS.get(index))
        .copied()
        .unwrap_or("Unknown")
}

pub fn display_text(raw: &str) -> String {
    match raw.trim().parse::<i64>() {
        Ok(value) => format!("{} - {}", value, label(value)),
        Err(_) => format!("{} - Unknown", raw.trim()),
    }
}

fn display_node(input: &HtmlInputElement) -> PageResult<Element> {
    if let Some(node) = dom::by_id::<Element>(DISPLAY_ID) {
        return Ok(node);
    }
    let node = dom::document()?.create_element("div")?;
    node.set_id(DISPLAY_ID);
    node.set_class_name("text-center mt-2 fw-bold text-primary");
    input
        .parent_node()
        .ok_or(PageError::MissingElement("usefulnessRange parent"))?
        .append_child(&node)?;
    Ok(node)
}

fn update(input: &HtmlInputElement) -> PageResult<()> {
    display_node(input)?.set_text_content(Some(&display_text(&input.value())));
    Ok(())
}

pub fn init() -> PageResult<()> {
    let Some(input) = dom::by_id::<HtmlInputElement>(RANGE_ID) else {
        return Ok(());
    };
    update(&input)?;
    let target = input.clone();
    dom::listen(&target, "input", move |_| {
        if let Err(e) = update(&input) {
            log::warn!("Could not update range label: {}", e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_map_to_labels() {
        assert_eq!(label(1), "Not useful");
        assert_eq!(label(3), "Moderately useful");
        assert_eq!(label(5), "Extremely useful");
    }

    #[test]
    fn out_of_range_values_are_unknown() {
        assert_eq!(label(0), "Unknown");
        assert_eq!(label(6), "Unknown");
        assert_eq!(label(-4), "Unknown");
    }

    #[test]
    fn display_text_combines_value_and_label() {
        assert_eq!(display_text("4"), "4 - Very useful");
        assert_eq!(display_text(""), " - Unknown");
    }
}
