//! Targeted edits of record text.
//!
//! Every function rewrites at most one section and leaves all other bytes of
//! the file untouched.

use crate::models::{FeedbackItem, Status};
use crate::store::parser::{is_external_id_key, parse_metadata_line};
use crate::util::truncate_with_ellipsis;

const SUMMARY_MAX_CHARS: usize = 200;

/// Line range of a `## <name>` section: header index and end (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SectionSpan {
    header: usize,
    end: usize,
}

fn lines(content: &str) -> Vec<&str> {
    content.split_inclusive('\n').collect()
}

fn heading_name(line: &str) -> Option<&str> {
    line.strip_prefix("## ").map(str::trim)
}

fn find_section(lines: &[&str], name: &str) -> Option<SectionSpan> {
    let header = lines
        .iter()
        .position(|line| heading_name(line).is_some_and(|heading| heading.eq_ignore_ascii_case(name)))?;
    let end = lines[header + 1..]
        .iter()
        .position(|line| heading_name(line).is_some())
        .map_or(lines.len(), |offset| header + 1 + offset);
    Some(SectionSpan { header, end })
}

fn first_section(lines: &[&str]) -> Option<usize> {
    lines.iter().position(|line| heading_name(line).is_some())
}

fn with_newline(line: &str) -> String {
    if line.ends_with('\n') {
        line.to_string()
    } else {
        format!("{line}\n")
    }
}

/// Text of a full section: header, body and a separating blank line when
/// another section follows.
fn section_text(name: &str, body: &str, followed: bool) -> String {
    let mut text = format!("## {name}\n{}\n", body.trim_end());
    if followed {
        text.push('\n');
    }
    text
}

fn splice(lines: &[&str], start: usize, end: usize, replacement: &str) -> String {
    let mut out = String::new();
    for line in &lines[..start] {
        out.push_str(line);
    }
    out.push_str(replacement);
    for line in &lines[end..] {
        out.push_str(line);
    }
    out
}

fn append_section(content: &str, name: &str, body: &str) -> String {
    let mut out = content.to_string();
    if !out.is_empty() {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        if !out.ends_with("\n\n") {
            out.push('\n');
        }
    }
    out.push_str(&section_text(name, body, false));
    out
}

/// Replace a section's body, or remove the section when `body` is `None`.
///
/// A missing section is appended at the end of the file.
pub fn set_section(content: &str, name: &str, body: Option<&str>) -> String {
    let all = lines(content);
    match (find_section(&all, name), body) {
        (Some(span), Some(body)) => {
            let header = with_newline(all[span.header]);
            let mut replacement = format!("{header}{}\n", body.trim_end());
            if span.end < all.len() {
                replacement.push('\n');
            }
            splice(&all, span.header, span.end, &replacement)
        }
        (Some(span), None) => splice(&all, span.header, span.end, ""),
        (None, Some(body)) => append_section(content, name, body),
        (None, None) => content.to_string(),
    }
}

/// Write the categories section.
///
/// An empty list removes the section. A new section goes after Summary,
/// else before Priority, else before the first section, else at the end.
pub fn set_categories(content: &str, categories: &[String]) -> String {
    let all = lines(content);
    if categories.is_empty() || find_section(&all, "Categories").is_some() {
        let body = (!categories.is_empty()).then(|| categories.join(", "));
        return set_section(content, "Categories", body.as_deref());
    }

    let body = categories.join(", ");
    let insert_at = find_section(&all, "Summary")
        .map(|span| span.end)
        .or_else(|| find_section(&all, "Priority").map(|span| span.header))
        .or_else(|| first_section(&all));

    match insert_at {
        Some(index) if index < all.len() => {
            splice(&all, index, index, &section_text("Categories", &body, true))
        }
        _ => append_section(content, "Categories", &body),
    }
}

/// Replace the `# ` title line, inserting one at the top if missing.
pub fn set_title(content: &str, title: &str) -> String {
    let all = lines(content);
    let title_line = format!("# {}\n", title.trim());
    let position = all.iter().position(|line| line.starts_with("# "));
    match position {
        Some(index) => splice(&all, index, index + 1, &title_line),
        None => format!("{title_line}\n{content}"),
    }
}

/// Record the remote identifier in the Metadata section.
///
/// Returns `None` when the same identifier is already recorded. A different
/// recorded identifier is replaced in place.
pub fn stamp_external_id(
    content: &str,
    external_id: &str,
    provider: &str,
    author: Option<&str>,
    synced_on: &str,
) -> Option<String> {
    let all = lines(content);
    let id_line = format!("- External ID: {external_id}\n");

    let Some(span) = find_section(&all, "Metadata") else {
        return Some(append_section(
            content,
            "Metadata",
            &stamp_lines(external_id, provider, author, synced_on),
        ));
    };

    for index in span.header + 1..span.end {
        if let Some((key, value)) = parse_metadata_line(all[index].trim()) {
            if is_external_id_key(&key) {
                if value == external_id {
                    return None;
                }
                return Some(splice(&all, index, index + 1, &id_line));
            }
        }
    }

    let header = with_newline(all[span.header]);
    let inserted = format!(
        "{header}{}\n",
        stamp_lines(external_id, provider, author, synced_on)
    );
    Some(splice(&all, span.header, span.header + 1, &inserted))
}

fn stamp_lines(external_id: &str, provider: &str, author: Option<&str>, synced_on: &str) -> String {
    let mut lines = vec![
        format!("- External ID: {external_id}"),
        format!("- Provider: {provider}"),
    ];
    if let Some(author) = author.map(str::trim).filter(|author| !author.is_empty()) {
        lines.push(format!("- Author: {author}"));
    }
    lines.push(format!("- Synced: {synced_on}"));
    lines.join("\n")
}

/// Overwrite title, summary, status and description with remote values.
///
/// The local id prefix of the title (`UC001: `) is kept.
pub fn apply_remote_fields(content: &str, local_title: &str, remote: &FeedbackItem) -> String {
    let title = match local_title.split_once(':') {
        Some((prefix, _)) if is_local_id(prefix) => format!("{prefix}: {}", remote.title.trim()),
        _ => remote.title.trim().to_string(),
    };
    let mut updated = set_title(content, &title);
    let summary = summary_from_description(&remote.description);
    if !summary.is_empty() {
        updated = set_section(&updated, "Summary", Some(&summary));
    }
    updated = set_section(&updated, "Status", Some(&status_label(&remote.status)));
    set_section(&updated, "Description", Some(remote.description.trim()))
}

fn is_local_id(prefix: &str) -> bool {
    let letters = prefix.trim_end_matches(|ch: char| ch.is_ascii_digit());
    letters.len() < prefix.len()
        && !letters.is_empty()
        && letters.chars().all(|ch| ch.is_ascii_uppercase())
}

/// First description line, capped at 200 characters.
pub fn summary_from_description(description: &str) -> String {
    let first = description.trim().lines().next().unwrap_or_default().trim();
    truncate_with_ellipsis(first, SUMMARY_MAX_CHARS)
}

/// Priority label derived from the vote count.
pub const fn priority_from_votes(votes: u32) -> &'static str {
    if votes >= 10 {
        "High"
    } else if votes >= 5 {
        "Medium"
    } else {
        "Low"
    }
}

fn status_label(status: &str) -> String {
    status
        .parse::<Status>()
        .map_or_else(|_| status.trim().to_string(), |status| status.label().to_string())
}

/// Render a new local record for an item discovered on the provider.
pub fn render_new_item(item: &FeedbackItem, local_id: &str, provider: &str) -> String {
    let description = item.description.trim();
    let status = if item.status.trim().is_empty() {
        Status::Open.label().to_string()
    } else {
        status_label(&item.status)
    };

    let mut out = format!("# {local_id}: {}\n\n", item.title.trim());
    out.push_str(&section_text(
        "Summary",
        &summary_from_description(description),
        true,
    ));
    out.push_str(&section_text("Priority", priority_from_votes(item.votes), true));
    out.push_str(&section_text("Status", &status, true));
    if !item.categories.is_empty() {
        out.push_str(&section_text("Categories", &item.categories.join(", "), true));
    }
    out.push_str(&section_text("Description", description, true));

    let mut metadata = Vec::new();
    if let Some(external_id) = item.external_id() {
        metadata.push(format!("- External ID: {external_id}"));
    }
    metadata.push(format!("- Provider: {provider}"));
    if let Some(author) = item.metadata_value("author_name") {
        metadata.push(format!("- Author: {author}"));
    }
    metadata.push(format!("- Votes: {}", item.votes));
    if let Some(created) = created_date(&item.created_at) {
        metadata.push(format!("- Created: {created}"));
    }
    out.push_str(&section_text("Metadata", &metadata.join("\n"), false));
    out
}

fn created_date(created_at: &str) -> Option<String> {
    let created_at = created_at.trim();
    if created_at.is_empty() {
        return None;
    }
    let parsed = crate::conflict::parse_timestamp(created_at);
    if parsed == chrono::DateTime::<chrono::Utc>::MIN_UTC {
        Some(created_at.to_string())
    } else {
        Some(parsed.format("%Y-%m-%d").to_string())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const DOC: &str = "# UC001: Login\n\n## Summary\nShort\n\n## Priority\nHigh\n\n## Description\nBody\n";

    #[test]
    fn set_categories_inserts_after_summary() {
        let updated = set_categories(DOC, &["auth".to_string(), "ux".to_string()]);
        assert_eq!(
            updated,
            "# UC001: Login\n\n## Summary\nShort\n\n## Categories\nauth, ux\n\n## Priority\nHigh\n\n## Description\nBody\n"
        );
    }

    #[test]
    fn set_categories_inserts_before_priority_without_summary() {
        let doc = "# T\n\n## Priority\nLow\n";
        let updated = set_categories(doc, &["a".to_string()]);
        assert_eq!(updated, "# T\n\n## Categories\na\n\n## Priority\nLow\n");
    }

    #[test]
    fn set_categories_inserts_before_first_section() {
        let doc = "# T\n\n## Description\nText\n";
        let updated = set_categories(doc, &["a".to_string()]);
        assert_eq!(updated, "# T\n\n## Categories\na\n\n## Description\nText\n");
    }

    #[test]
    fn set_categories_appends_without_sections() {
        let updated = set_categories("# T\n", &["a".to_string()]);
        assert_eq!(updated, "# T\n\n## Categories\na\n");

        let updated = set_categories("# T\n\n## Summary\nS\n", &["a".to_string()]);
        assert_eq!(updated, "# T\n\n## Summary\nS\n\n## Categories\na\n");
    }

    #[test]
    fn set_categories_replaces_and_removes() {
        let with = set_categories(DOC, &["auth".to_string()]);
        let replaced = set_categories(&with, &["billing".to_string()]);
        assert!(replaced.contains("## Categories\nbilling\n\n## Priority"));

        let removed = set_categories(&replaced, &[]);
        assert_eq!(removed, DOC);
    }

    #[test]
    fn stamp_appends_metadata_section() {
        let stamped = stamp_external_id("# UC001: Login\n", "7", "fider", None, "2024-06-01").unwrap();
        assert_eq!(
            stamped,
            "# UC001: Login\n\n## Metadata\n- External ID: 7\n- Provider: fider\n- Synced: 2024-06-01\n"
        );
    }

    #[test]
    fn stamp_inserts_into_existing_metadata() {
        let doc = "# T\n\n## Metadata\n- Votes: 3\n";
        let stamped = stamp_external_id(doc, "9", "clearflask", Some("Jana"), "2024-06-01").unwrap();
        assert_eq!(
            stamped,
            "# T\n\n## Metadata\n- External ID: 9\n- Provider: clearflask\n- Author: Jana\n- Synced: 2024-06-01\n- Votes: 3\n"
        );
    }

    #[test]
    fn stamp_is_noop_for_same_id_and_replaces_other_id() {
        let doc = "# T\n\n## Metadata\n- Fider ID: 9\n- Votes: 3\n";
        assert_eq!(stamp_external_id(doc, "9", "fider", None, "2024-06-01"), None);

        let restamped = stamp_external_id(doc, "10", "fider", None, "2024-06-01").unwrap();
        assert_eq!(restamped, "# T\n\n## Metadata\n- External ID: 10\n- Votes: 3\n");
    }

    #[test]
    fn set_section_preserves_surrounding_bytes() {
        let updated = set_section(DOC, "Priority", Some("Low"));
        assert_eq!(
            updated,
            "# UC001: Login\n\n## Summary\nShort\n\n## Priority\nLow\n\n## Description\nBody\n"
        );
    }

    #[test]
    fn apply_remote_fields_keeps_local_prefix() {
        let mut remote = FeedbackItem::remote("7", "Login via SSO");
        remote.description = "New body\nmore".to_string();
        remote.status = "planned".to_string();
        let updated = apply_remote_fields(DOC, "UC001: Login", &remote);
        assert!(updated.starts_with("# UC001: Login via SSO\n"));
        assert!(updated.contains("## Summary\nNew body\n\n"));
        assert!(updated.contains("## Priority\nHigh\n"));
        assert!(updated.contains("## Description\nNew body\nmore\n"));
        assert!(updated.ends_with("## Status\nPlanned\n"));
    }

    #[test]
    fn render_new_item_layout() {
        let mut item = FeedbackItem::remote("10", "Dark mode");
        item.description = "Please add dark mode\nIt hurts my eyes".to_string();
        item.votes = 6;
        item.created_at = "2024-02-03T04:05:06Z".to_string();
        item.metadata
            .insert("author_name".to_string(), "Petr".to_string());

        let rendered = render_new_item(&item, "UC003", "fider");
        assert_eq!(
            rendered,
            "# UC003: Dark mode\n\n\
## Summary\nPlease add dark mode\n\n\
## Priority\nMedium\n\n\
## Status\nOpen\n\n\
## Description\nPlease add dark mode\nIt hurts my eyes\n\n\
## Metadata\n- External ID: 10\n- Provider: fider\n- Author: Petr\n- Votes: 6\n- Created: 2024-02-03\n"
        );
    }

    #[test]
    fn priority_thresholds() {
        assert_eq!(priority_from_votes(0), "Low");
        assert_eq!(priority_from_votes(5), "Medium");
        assert_eq!(priority_from_votes(10), "High");
    }
}
