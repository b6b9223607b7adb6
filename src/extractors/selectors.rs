// =============================================================================
// selectors.rs - THE SITE'S MARKUP CONTRACT, WRITTEN DOWN
// =============================================================================
//
// Everything the extractors assume about zerodayinitiative.com markup is in
// this file. When the site changes its layout, this is the file that changes.
//
// A `Step` is one hop from a container to the element inside it. A path of
// steps is walked from the document root, taking the first match each time,
// and the first hop that finds nothing is named in the error.
// =============================================================================

use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractError;
use crate::models::DetailField;

/// One hop down the document tree.
#[derive(Debug, Clone, Copy)]
pub struct Step {
    /// Human name used in errors and logs.
    pub name: &'static str,
    pub css: &'static str,
}

/// Where one detail field lives: row index in the detail table, then cell
/// index among that row's direct `<td>` children.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: DetailField,
    pub row: usize,
    pub cell: usize,
}

// =============================================================================
// Listing page: /advisories/published/
// =============================================================================

pub const LISTING_TABLE_BODY: &[Step] = &[
    Step {
        name: "advisories section",
        css: r#"section[class="blueBg up-advisories nopadding"]"#,
    },
    Step {
        name: "advisories table",
        css: r#"table#search-table[class*="table table-hover table-primary"]"#,
    },
    Step {
        name: "advisories table body",
        css: "tbody",
    },
];

pub const LISTING_ROW: &str = "tr#publishedAdvisories";
pub const LISTING_CELL: &str = r#"td[class="sort-td"]"#;

/// A genuine advisory row has exactly this many cells.
pub const LISTING_CELL_COUNT: usize = 8;

/// Cell indices inside a listing row.
pub mod listing_cell {
    pub const ZDI_ID: usize = 0;
    pub const ZDI_CAN: usize = 1;
    pub const VENDOR: usize = 2;
    pub const CVE_ID: usize = 3;
    pub const CVSS: usize = 4;
    pub const PUBLISHED: usize = 5;
    pub const EXTRA: usize = 6;
    pub const DESCRIPTION: usize = 7;
}

pub const LISTING_DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Detail page: /advisories/ZDI-YY-NNN/
// =============================================================================

pub const DETAIL_TABLE: &[Step] = &[
    Step {
        name: "details section",
        css: r#"section[class="blueBg"]"#,
    },
    Step {
        name: "details content block",
        css: r#"div[class="contentBlock advisories-details"]"#,
    },
    Step {
        name: "details table",
        css: r#"table[style="max-width: 100%;"]"#,
    },
];

pub const DETAIL_ROW: &str = "tr";

/// Rows 0-2 hold the ids, CVE and score already known from the listing.
pub const DETAIL_FIELDS: &[FieldSpec] = &[
    FieldSpec { field: DetailField::AffectedProducts, row: 3, cell: 1 },
    FieldSpec { field: DetailField::VulnerabilityDetails, row: 4, cell: 1 },
    FieldSpec { field: DetailField::AdditionalDetails, row: 5, cell: 1 },
    FieldSpec { field: DetailField::DisclosureTimeline, row: 6, cell: 1 },
];

pub const ANCHOR: &str = "a";

// =============================================================================
// Helpers
// =============================================================================

pub fn parse(css: &'static str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::InvalidSelector {
        css,
        reason: e.to_string(),
    })
}

/// Walk `path` from the document root and return the element at its end.
pub fn locate<'a>(document: &'a Html, path: &[Step]) -> Result<ElementRef<'a>, ExtractError> {
    let mut current = document.root_element();
    for step in path {
        let selector = parse(step.css)?;
        current = current
            .select(&selector)
            .next()
            .ok_or(ExtractError::MissingElement(step.name))?;
    }
    Ok(current)
}

/// Whitespace-trimmed text content of an element and all its descendants.
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Direct `<td>` children of a table row.
pub fn direct_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .collect()
}

/// `href` of the first anchor under `element`, if there is one.
pub fn first_link(element: ElementRef<'_>) -> Result<Option<String>, ExtractError> {
    let anchor = parse(ANCHOR)?;
    Ok(element
        .select(&anchor)
        .find_map(|a| a.value().attr("href"))
        .map(str::to_string))
}
