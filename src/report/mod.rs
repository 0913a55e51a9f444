pub mod table;

pub use table::Table;

use chrono::{DateTime, Utc};

use crate::pr::PullRequest;

pub const NO_RESULTS: &str = "No pull requests found.";
const LIST_HEADERS: [&str; 4] = ["Title", "Status", "Created", "Changes"];

/// Build the listing table: one row per pull request, in the given order.
pub fn listing_table(pull_requests: &[PullRequest]) -> Table {
    let mut table = Table::new(&LIST_HEADERS);
    for pr in pull_requests {
        table.push_row(vec![
            pr.title.clone(),
            pr.status.clone(),
            format_timestamp(pr.created_at),
            format_changes(pr),
        ]);
    }
    table
}

/// Render a listing, or the "no results" line when there is nothing to show.
pub fn render_listing(pull_requests: &[PullRequest]) -> String {
    if pull_requests.is_empty() {
        format!("{}\n", NO_RESULTS)
    } else {
        listing_table(pull_requests).render()
    }
}

/// Detail view for a single pull request.
///
/// PR pr-42: "Add OAuth2 login flow"
/// Repository: api | Status: OPEN | Author: alice
/// Branches: feature/oauth -> main
/// Created: 2024-03-05 09:15 | Updated: -
/// Changes: 365 (+320/-45)
pub fn render_detail(pr: &PullRequest) -> String {
    let mut out = String::new();
    out.push_str(&format!("PR {}: \"{}\"\n", pr.id, pr.title));
    out.push_str(&format!(
        "Repository: {} | Status: {} | Author: {}\n",
        pr.repository_name,
        pr.status,
        pr.author.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!(
        "Branches: {} -> {}\n",
        pr.source_branch.as_deref().unwrap_or("-"),
        pr.target_branch.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!(
        "Created: {} | Updated: {}\n",
        format_timestamp(pr.created_at),
        format_timestamp(pr.updated_at)
    ));
    out.push_str(&format!("Changes: {}\n", format_changes(pr)));
    out
}

/// One-line confirmation for a write operation, e.g. "Approved".
pub fn render_outcome(action: &str, pr: &PullRequest) -> String {
    format!(
        "{} pull request {} \"{}\" in {} ({})",
        action, pr.id, pr.title, pr.repository_name, pr.status
    )
}

pub fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_changes(pr: &PullRequest) -> String {
    format!(
        "{} (+{}/-{})",
        pr.total_changes, pr.lines_added, pr.lines_deleted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_pr(id: &str, title: &str) -> PullRequest {
        PullRequest {
            id: id.to_string(),
            title: title.to_string(),
            status: "OPEN".to_string(),
            author: Some("alice".to_string()),
            repository_name: "api".to_string(),
            repository_id: "ocid-api".to_string(),
            source_branch: Some("feature/oauth".to_string()),
            target_branch: Some("main".to_string()),
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, 5, 9, 15, 42).unwrap()),
            updated_at: None,
            lines_added: 320,
            lines_deleted: 45,
            total_changes: 365,
        }
    }

    #[test]
    fn test_empty_listing_reports_no_results() {
        assert_eq!(render_listing(&[]), "No pull requests found.\n");
    }

    #[test]
    fn test_listing_has_one_row_per_pull_request() {
        let prs = vec![sample_pr("pr-1", "One"), sample_pr("pr-2", "Two")];
        let rendered = render_listing(&prs);
        // header border, header, separator, two rows, closing border
        assert_eq!(rendered.lines().count(), 6);
        assert!(rendered.contains("| Title | Status | Created          | Changes        |"));
        assert!(rendered.contains("| One   | OPEN   | 2024-03-05 09:15 | 365 (+320/-45) |"));
    }

    #[test]
    fn test_format_changes() {
        let mut pr = sample_pr("pr-1", "One");
        pr.lines_added = 5;
        pr.lines_deleted = 1;
        pr.total_changes = 6;
        assert_eq!(format_changes(&pr), "6 (+5/-1)");
    }

    #[test]
    fn test_missing_timestamp_renders_dash() {
        assert_eq!(format_timestamp(None), "-");
    }

    #[test]
    fn test_render_detail() {
        let detail = render_detail(&sample_pr("pr-42", "Add OAuth2 login flow"));
        assert!(detail.starts_with("PR pr-42: \"Add OAuth2 login flow\"\n"));
        assert!(detail.contains("Repository: api | Status: OPEN | Author: alice"));
        assert!(detail.contains("Branches: feature/oauth -> main"));
        assert!(detail.contains("Created: 2024-03-05 09:15 | Updated: -"));
        assert!(detail.contains("Changes: 365 (+320/-45)"));
    }

    #[test]
    fn test_render_outcome() {
        let pr = sample_pr("pr-1", "One");
        assert_eq!(
            render_outcome("Approved", &pr),
            "Approved pull request pr-1 \"One\" in api (OPEN)"
        );
    }
}
