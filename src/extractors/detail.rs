// =============================================================================
// detail.rs - READING ONE ADVISORY PAGE
// =============================================================================
//
// The advisory page is a two-column table: heading on the left, content on
// the right. Rows are read by position, not by heading text, using the
// `DETAIL_FIELDS` table in selectors.rs. Each field is resolved on its own so
// a layout change reports every field it broke, and the advisory is only
// built when all four resolved.
// =============================================================================

use scraper::{ElementRef, Html};
use tracing::warn;

use super::selectors::{self, FieldSpec};
use crate::error::ExtractError;
use crate::models::{AdvisoryDetail, DetailField};

/// The content of one resolved detail field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    pub field: DetailField,
    pub text: String,
    /// First link inside the cell, if any.
    pub link: Option<String>,
}

/// Which detail fields resolved and which did not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailReport {
    pub resolved: Vec<ResolvedField>,
    pub missing: Vec<DetailField>,
}

impl DetailReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn get(&self, field: DetailField) -> Option<&ResolvedField> {
        self.resolved.iter().find(|r| r.field == field)
    }

    /// Build the advisory detail, or name every field that did not resolve.
    pub fn into_detail(self) -> Result<AdvisoryDetail, ExtractError> {
        if !self.is_complete() {
            return Err(ExtractError::MissingFields {
                missing: self.missing,
            });
        }

        let mut affected_products = String::new();
        let mut vulnerability_details = String::new();
        let mut additional_details = String::new();
        let mut additional_details_link = None;
        let mut disclosure_timeline = String::new();

        for resolved in self.resolved {
            match resolved.field {
                DetailField::AffectedProducts => affected_products = resolved.text,
                DetailField::VulnerabilityDetails => vulnerability_details = resolved.text,
                DetailField::AdditionalDetails => {
                    additional_details = resolved.text;
                    additional_details_link = resolved.link;
                }
                DetailField::DisclosureTimeline => disclosure_timeline = resolved.text,
            }
        }

        Ok(AdvisoryDetail {
            affected_products,
            vulnerability_details,
            additional_details,
            additional_details_link,
            disclosure_timeline,
        })
    }
}

/// Resolve every detail field on `document`.
///
/// Errors only when the table itself cannot be found; missing rows or cells
/// are listed in the report.
pub fn inspect_detail(document: &Html) -> Result<DetailReport, ExtractError> {
    let table = selectors::locate(document, selectors::DETAIL_TABLE)?;
    let row_selector = selectors::parse(selectors::DETAIL_ROW)?;
    let rows: Vec<ElementRef<'_>> = table.select(&row_selector).collect();

    let mut report = DetailReport::default();
    for wanted in selectors::DETAIL_FIELDS {
        match resolve_field(&rows, wanted)? {
            Some(resolved) => report.resolved.push(resolved),
            None => report.missing.push(wanted.field),
        }
    }
    Ok(report)
}

/// Extract the advisory detail from `document`. All fields or none.
pub fn extract_detail(document: &Html) -> Result<AdvisoryDetail, ExtractError> {
    let report = inspect_detail(document)?;
    if !report.is_complete() {
        let resolved: Vec<&str> = report.resolved.iter().map(|r| r.field.label()).collect();
        let missing: Vec<&str> = report.missing.iter().map(|f| f.label()).collect();
        warn!(?resolved, ?missing, "Detail page only partially matched the expected layout");
    }
    report.into_detail()
}

fn resolve_field(
    rows: &[ElementRef<'_>],
    wanted: &FieldSpec,
) -> Result<Option<ResolvedField>, ExtractError> {
    let Some(row) = rows.get(wanted.row) else {
        return Ok(None);
    };
    let cells = selectors::direct_cells(*row);
    let Some(cell) = cells.get(wanted.cell) else {
        return Ok(None);
    };

    Ok(Some(ResolvedField {
        field: wanted.field,
        text: selectors::text_of(*cell),
        link: selectors::first_link(*cell)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{detail_page, ADDITIONAL_WITHOUT_LINK, ADDITIONAL_WITH_LINK};

    #[test]
    fn test_extracts_rows_three_to_six() {
        let doc = Html::parse_document(&detail_page(ADDITIONAL_WITH_LINK));
        let detail = extract_detail(&doc).unwrap();

        assert_eq!(detail.affected_products, "Acme Widget Server");
        assert_eq!(
            detail.vulnerability_details,
            "This vulnerability allows remote attackers to execute arbitrary code on affected installations of Acme Widget Server."
        );
        // Line breaks and indentation between text nodes survive; only the
        // ends are trimmed.
        let indent = " ".repeat(24);
        assert_eq!(
            detail.additional_details,
            format!(
                "Acme has issued an update to correct this vulnerability. More details can be found at: \n{indent}https://acme.example/security/2024-05"
            )
        );
        assert_eq!(
            detail.additional_details_link.as_deref(),
            Some("https://acme.example/security/2024-05")
        );
        assert_eq!(
            detail.disclosure_timeline,
            format!(
                "2024-01-10 - Vulnerability reported to vendor\n{indent}2024-05-22 - Coordinated public release of advisory"
            )
        );
    }

    #[test]
    fn test_link_is_absent_without_anchor() {
        let doc = Html::parse_document(&detail_page(ADDITIONAL_WITHOUT_LINK));
        let detail = extract_detail(&doc).unwrap();

        assert_eq!(detail.additional_details_link, None);
        assert_eq!(
            detail.additional_details,
            ADDITIONAL_WITHOUT_LINK.trim()
        );
    }

    #[test]
    fn test_short_table_reports_missing_fields() {
        let html = r#"<html><body>
            <section class="blueBg">
              <div class="contentBlock advisories-details">
                <table style="max-width: 100%;">
                  <tr><td>ZDI-24-512</td><td>ZDI-CAN-21871</td></tr>
                  <tr><td>CVE ID</td><td>CVE-2024-29205</td></tr>
                  <tr><td>CVSS SCORE</td><td>7.8</td></tr>
                  <tr><td>AFFECTED PRODUCTS</td><td>Acme Widget Server</td></tr>
                  <tr><td>VULNERABILITY DETAILS</td></tr>
                </table>
              </div>
            </section>
        </body></html>"#;
        let doc = Html::parse_document(html);

        let report = inspect_detail(&doc).unwrap();
        assert_eq!(
            report.get(DetailField::AffectedProducts).map(|r| r.text.as_str()),
            Some("Acme Widget Server")
        );
        assert_eq!(
            report.missing,
            vec![
                DetailField::VulnerabilityDetails,
                DetailField::AdditionalDetails,
                DetailField::DisclosureTimeline,
            ]
        );

        let err = extract_detail(&doc).unwrap_err();
        assert!(matches!(err, ExtractError::MissingFields { ref missing } if missing.len() == 3));
    }

    #[test]
    fn test_wrong_table_style_is_structural_failure() {
        let html = r#"<html><body>
            <section class="blueBg">
              <div class="contentBlock advisories-details">
                <table style="width: 100%;"><tr><td>x</td></tr></table>
              </div>
            </section>
        </body></html>"#;
        let doc = Html::parse_document(html);

        let err = extract_detail(&doc).unwrap_err();
        assert!(matches!(err, ExtractError::MissingElement("details table")));
    }
}
