// =============================================================================
// fixtures.rs - HAND-TRIMMED COPIES OF THE ZDI MARKUP (test only)
// =============================================================================
//
// Cut down from saved copies of the live pages: same nesting, same classes,
// same row ids, none of the navigation or scripts.
// =============================================================================

/// One genuine 8-cell listing row. `href: None` leaves the description cell
/// without its link.
pub fn advisory_row(zdi_id: &str, published: &str, href: Option<&str>) -> String {
    let number = zdi_id.rsplit('-').next().unwrap_or("0");
    let description = match href {
        Some(href) => format!(
            r#"<a href="{href}">Acme Widget Server {zdi_id} Stack-based Buffer Overflow Remote Code Execution Vulnerability</a>"#
        ),
        None => format!("Acme Widget Server {zdi_id} Stack-based Buffer Overflow"),
    };
    format!(
        r#"
        <tr id="publishedAdvisories">
            <td class="sort-td">{zdi_id}</td>
            <td class="sort-td">ZDI-CAN-2{number}</td>
            <td class="sort-td">Acme</td>
            <td class="sort-td">CVE-2024-{number}</td>
            <td class="sort-td">7.8</td>
            <td class="sort-td"> {published} </td>
            <td class="sort-td"></td>
            <td class="sort-td">{description}</td>
        </tr>"#
    )
}

/// A row with the advisory id but the wrong number of cells.
pub fn short_row(cells: usize) -> String {
    let tds: String = (0..cells)
        .map(|i| format!(r#"<td class="sort-td">cell {i}</td>"#))
        .collect();
    format!(r#"<tr id="publishedAdvisories">{tds}</tr>"#)
}

/// The listing page wrapped around `rows`.
pub fn listing_page(rows: &[String]) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Published Advisories</title></head>
<body>
    <section class="blueBg">
        <p>Search our advisories</p>
    </section>
    <section class="blueBg up-advisories nopadding">
        <div class="contentBlock">
            <table id="search-table" class="table table-hover table-primary sortable">
                <thead>
                    <tr>
                        <th>ZDI ID</th><th>ZDI CAN</th><th>AFFECTED VENDOR(S)</th><th>CVE</th>
                        <th>CVSS v3.0</th><th>PUBLISHED</th><th>UPDATED</th><th>TITLE</th>
                    </tr>
                </thead>
                <tbody>
                    {rows}
                </tbody>
            </table>
        </div>
    </section>
</body>
</html>"#,
        rows = rows.join("\n")
    )
}

/// A detail page whose ADDITIONAL DETAILS cell contains `additional_cell`.
pub fn detail_page(additional_cell: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body>
    <section class="blueBg">
        <div class="contentBlock advisories-details">
            <h2>Acme Widget Server Stack-based Buffer Overflow Remote Code Execution Vulnerability</h2>
            <table style="max-width: 100%;">
                <tr><td>ZDI-24-512</td><td>ZDI-CAN-21871</td></tr>
                <tr><td>CVE ID</td><td>CVE-2024-29205</td></tr>
                <tr><td>CVSS SCORE</td><td>7.8, AV:L/AC:L/PR:N/UI:R/S:U/C:H/I:H/A:H</td></tr>
                <tr>
                    <td>AFFECTED PRODUCTS</td>
                    <td>
                        Acme Widget Server
                    </td>
                </tr>
                <tr>
                    <td>VULNERABILITY DETAILS</td>
                    <td>
                        This vulnerability allows remote attackers to execute arbitrary code on affected installations of Acme Widget Server.
                    </td>
                </tr>
                <tr>
                    <td>ADDITIONAL DETAILS</td>
                    <td>{additional_cell}</td>
                </tr>
                <tr>
                    <td>DISCLOSURE TIMELINE</td>
                    <td>
                        2024-01-10 - Vulnerability reported to vendor<br/>
                        2024-05-22 - Coordinated public release of advisory
                    </td>
                </tr>
                <tr><td>CREDIT</td><td>Anonymous</td></tr>
            </table>
        </div>
    </section>
</body>
</html>"#
    )
}

pub const ADDITIONAL_WITH_LINK: &str = r#"
                        Acme has issued an update to correct this vulnerability. More details can be found at: <br/>
                        <a href="https://acme.example/security/2024-05">https://acme.example/security/2024-05</a>
                    "#;

pub const ADDITIONAL_WITHOUT_LINK: &str = r#"
                        Given the nature of the vulnerability, the only salient mitigation strategy is to restrict interaction with the application.
                    "#;
