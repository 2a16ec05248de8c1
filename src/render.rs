//! HTML fragments for the form rows, detail panels and page navigation.

use crate::fields::FieldDirectory;
use crate::form::{Affordance, ClauseView};
use crate::pagination::PageLink;
use crate::table::DetailPanel;

const CATALOG_LABEL: &str = "Catalog...";

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// The repeatable clause rows of the search form.
pub fn render_form(views: &[ClauseView], directory: &FieldDirectory) -> String {
    let field_items = directory
        .entries()
        .iter()
        .map(|entry| {
            format!(
                r##"<a class="dropdown-item" href="#" data-key="{}">{}</a>"##,
                escape_html(&entry.key),
                escape_html(&entry.label)
            )
        })
        .collect::<String>();

    let rows = views
        .iter()
        .map(|view| render_clause(view, &field_items))
        .collect::<Vec<_>>()
        .join("\n");
    format!("<div id=\"repeatable\">\n{rows}\n</div>")
}

fn render_clause(view: &ClauseView, field_items: &str) -> String {
    let catalog = view
        .catalog
        .as_ref()
        .map(|menu| {
            let items = menu
                .values
                .iter()
                .map(|value| {
                    format!(
                        r##"<a class="dropdown-item" href="#">{}</a>"##,
                        escape_html(value)
                    )
                })
                .collect::<String>();
            let label = menu.selected.as_deref().unwrap_or(CATALOG_LABEL);
            format!(
                r#"<div class="catalog-button-group"><button type="button" class="dropdown-toggle">{}</button><div class="dropdown-menu">{items}</div></div>"#,
                escape_html(label)
            )
        })
        .unwrap_or_default();
    let (action, symbol) = match view.affordance {
        Affordance::Add => ("btn-add", "+"),
        Affordance::Remove => ("btn-remove", "-"),
    };
    format!(
        r#"<div class="entry" data-clause="{id}"><div class="input-group-prepend"><div class="field-button-group"><button type="button" class="dropdown-toggle">{label}</button><div class="dropdown-menu">{field_items}</div></div>{catalog}</div><input type="text" name="{name}" value="{value}"><button type="button" class="{action}">{symbol}</button></div>"#,
        id = view.id.get(),
        label = escape_html(&view.label),
        name = escape_html(view.key.as_deref().unwrap_or("")),
        value = escape_html(&view.value),
    )
}

/// The child row content for an expanded result row.
pub fn render_detail_panel(panel: &DetailPanel) -> String {
    format!(
        r#"<div class="json" id="{}">{}</div>"#,
        escape_html(panel.element_id()),
        panel.tree().render_html()
    )
}

pub fn render_pagination(links: &[PageLink]) -> String {
    if links.is_empty() {
        return String::new();
    }
    let items = links
        .iter()
        .map(|link| match link {
            PageLink::Previous { href, disabled } => page_item(href, "&laquo;", *disabled, false),
            PageLink::Page {
                number,
                href,
                active,
            } => page_item(href, &number.to_string(), false, *active),
            PageLink::Gap => page_item("#", "...", true, false),
            PageLink::Next { href, disabled } => page_item(href, "&raquo;", *disabled, false),
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("<nav aria-label=\"Page navigation\"><ul class=\"pagination\">\n{items}\n</ul></nav>")
}

fn page_item(href: &str, text: &str, disabled: bool, active: bool) -> String {
    let mut class = String::from("page-item");
    if disabled {
        class.push_str(" disabled");
    }
    if active {
        class.push_str(" active");
    }
    format!(
        r#"<li class="{class}"><a class="page-link" href="{}">{text}</a></li>"#,
        escape_html(href)
    )
}
