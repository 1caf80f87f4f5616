//! Fixture markup for the two supported sites
//!
//! Minimal but structurally faithful pages: the selectors the built-in
//! profiles target resolve here the way they do on the live sites. Used by
//! the CLI demo and the end-to-end tests.

use ecolens_core::{ReadStrategy, SiteId, SiteProfile};
use ecolens_page::{Page, Selector};

/// Home-page markup with the profile root and destination input present
pub fn home_html(site: SiteId) -> &'static str {
    match site {
        SiteId::Skyscanner => {
            r#"
            <html><body>
              <div id="pagewrap">
                <header>Where next?</header>
                <input id="destinationInput-input" value="">
              </div>
            </body></html>
            "#
        }
        SiteId::Kayak => {
            r#"
            <html><body>
              <div class="keel">
                <header>Search flights</header>
                <div class="zEiP-destination"><div class="vvTc-item"></div></div>
              </div>
            </body></html>
            "#
        }
    }
}

/// Results-page markup with only the profile root present; content arrives
/// later through `result_content_html`
pub fn results_html(site: SiteId) -> &'static str {
    match site {
        SiteId::Skyscanner => r#"<html><body><div id="pagewrap"></div></body></html>"#,
        SiteId::Kayak => r#"<html><body><div class="keel"></div></body></html>"#,
    }
}

/// The search-submission control whose appearance arms capture
pub fn search_button_html(site: SiteId) -> &'static str {
    match site {
        SiteId::Skyscanner => r#"<button data-testid="desktop-cta">Search</button>"#,
        SiteId::Kayak => r#"<button class="Iqt3-mod-size-large">Search</button>"#,
    }
}

/// A result-content block, including one per-result action control
pub fn result_content_html(site: SiteId, text: &str) -> String {
    match site {
        SiteId::Skyscanner => format!(
            r#"<div class="TicketStub">
                 <div class="UpperTicketBody_screenReaderOnly__YTY2Z">{text}</div>
                 <button class="TicketStub_ctaButton__a1b2c">Select</button>
               </div>"#
        ),
        SiteId::Kayak => format!(
            r#"<div class="nrc6-wrapper">{text}<a class="Iqt3">View Deal</a></div>"#
        ),
    }
}

/// Put a destination into the page the way a user would: into the input's
/// value on Skyscanner, into the selected item's text on Kayak
pub fn enter_destination(page: &Page, profile: &SiteProfile, destination: &str) {
    let Ok(selector) = Selector::parse(&profile.destination_input) else {
        return;
    };
    let Some(node) = page.query(&selector) else {
        return;
    };
    match profile.read_strategy {
        ReadStrategy::InputValue => page.set_value(node, destination),
        ReadStrategy::SelectedItemText => page.set_text(node, destination),
    }
}
