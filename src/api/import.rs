//! Bulk import: payload builders and the import operations.
//!
//! The import endpoints take hand-built XML documents. Every text node and
//! attribute value is escaped here; server-computed issue fields are filtered
//! through a [`DenyList`] before anything is emitted.

use std::collections::{BTreeSet, HashMap};

use reqwest::StatusCode;
use tracing::{debug, error, info, instrument, warn};

use super::client::{query, quote, ApiRequest, Connection};
use super::error::Result;
use super::response::Parsed;
use super::types::{Comment, FieldValue, Issue, Link, User, WorkItem};
use super::xml::{escape_attr, escape_text};
use crate::config::Settings;

/// Issue fields the server computes itself and rejects on import.
pub const DENIED_ISSUE_FIELDS: [&str; 15] = [
    "id",
    "projectShortName",
    "votes",
    "commentsCount",
    "historyUpdated",
    "updatedByFullName",
    "updaterFullName",
    "reporterFullName",
    "links",
    "attachments",
    "jiraId",
    "entityId",
    "tags",
    "sprint",
    "wikified",
];

/// Field names never emitted in an issue import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenyList {
    fields: BTreeSet<String>,
}

impl DenyList {
    /// The fixed deny-list of server-computed fields.
    pub fn standard() -> Self {
        Self {
            fields: DENIED_ISSUE_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Also deny `field`.
    pub fn deny(&mut self, field: &str) {
        self.fields.insert(field.to_string());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }
}

impl Default for DenyList {
    fn default() -> Self {
        Self::standard()
    }
}

/// One issue to import: ordered fields plus attached comments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueRecord {
    pub fields: Vec<(String, FieldValue)>,
    pub comments: Vec<Comment>,
}

impl IssueRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, replacing an earlier value of the same name.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn with_comment(mut self, comment: Comment) -> Self {
        self.comments.push(comment);
        self
    }

    pub fn number_in_project(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == "numberInProject")
            .and_then(|(_, value)| value.first())
    }
}

impl From<&Issue> for IssueRecord {
    fn from(issue: &Issue) -> Self {
        Self {
            fields: issue.fields.clone(),
            comments: issue.comments.clone(),
        }
    }
}

/// An issue import document and the per-record fragments used in diagnostics.
#[derive(Debug, Clone)]
pub struct IssuesXml {
    pub xml: String,
    /// `numberInProject` → the `<issue>` fragment sent for it.
    pub records: HashMap<String, String>,
}

/// Serialize issues for `PUT /import/<project>/issues`.
pub fn issues_xml(issues: &[IssueRecord], deny: &DenyList) -> IssuesXml {
    let mut xml = String::from("<issues>\n");
    let mut records = HashMap::new();

    for issue in issues {
        let record = issue_record_xml(issue, deny);
        xml.push_str(&record);
        if let Some(number) = issue.number_in_project() {
            records.insert(number.to_string(), record);
        }
    }

    xml.push_str("</issues>");
    IssuesXml { xml, records }
}

fn issue_record_xml(issue: &IssueRecord, deny: &DenyList) -> String {
    let mut record = String::from("  <issue>\n");

    for (name, value) in &issue.fields {
        if value.is_absent() || deny.contains(name) {
            continue;
        }
        record.push_str(&format!("    <field name=\"{}\">\n", escape_attr(name)));
        for v in value.values() {
            record.push_str(&format!("      <value>{}</value>\n", escape_text(v.trim())));
        }
        record.push_str("    </field>\n");
    }

    for comment in &issue.comments {
        record.push_str("    <comment");
        for (key, value) in &comment.attributes {
            record.push_str(&format!(" {}=\"{}\"", key, escape_attr(value)));
        }
        record.push_str("/>\n");
    }

    record.push_str("  </issue>\n");
    record
}

/// A user for `PUT /import/users`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportUser {
    pub login: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub jabber: Option<String>,
}

impl ImportUser {
    pub fn new(login: &str) -> Self {
        Self {
            login: login.to_string(),
            ..Self::default()
        }
    }
}

impl From<&User> for ImportUser {
    fn from(user: &User) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            login: user.login.clone(),
            full_name: non_empty(&user.full_name),
            email: non_empty(&user.email),
            jabber: non_empty(&user.jabber),
        }
    }
}

/// Serialize users; only the known attributes are emitted.
pub fn users_xml(users: &[ImportUser]) -> String {
    let mut xml = String::from("<list>\n");
    for user in users {
        let attrs = [
            ("login", Some(&user.login)),
            ("fullName", user.full_name.as_ref()),
            ("email", user.email.as_ref()),
            ("jabber", user.jabber.as_ref()),
        ];
        xml.push_str("  <user ");
        for (key, value) in attrs {
            if let Some(value) = value {
                xml.push_str(&format!("{}=\"{}\" ", key, escape_attr(value)));
            }
        }
        xml.push_str("/>\n");
    }
    xml.push_str("</list>");
    xml
}

/// A link for `PUT /import/links`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportLink {
    pub type_name: String,
    pub source: String,
    pub target: String,
}

impl ImportLink {
    pub fn new(type_name: &str, source: &str, target: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

impl From<&Link> for ImportLink {
    fn from(link: &Link) -> Self {
        Self::new(&link.type_name, &link.source, &link.target)
    }
}

/// Serialize links. Inward/outward type names are never sent.
pub fn links_xml(links: &[ImportLink]) -> String {
    let mut xml = String::from("<list>\n");
    for link in links {
        xml.push_str(&format!(
            "  <link typeName=\"{}\" source=\"{}\" target=\"{}\" />\n",
            escape_attr(&link.type_name),
            escape_attr(&link.source),
            escape_attr(&link.target)
        ));
    }
    xml.push_str("</list>");
    xml
}

/// Serialize work items for `PUT /import/issue/<id>/workitems`.
pub fn work_items_xml(items: &[WorkItem]) -> String {
    let body: String = items.iter().map(|item| item.to_xml(true)).collect();
    format!("<workItems>{}</workItems>", body)
}

/// Tuning for [`Connection::import_issues_with`].
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Maximum number of records resubmitted one by one when a batch comes
    /// back empty. `None` resubmits every record; `Some(0)` disables it.
    pub fallback_budget: Option<usize>,
}

impl From<&Settings> for ImportOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            fallback_budget: settings.import_fallback_budget,
        }
    }
}

/// Outcome for one imported issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportItem {
    /// `numberInProject` of the issue.
    pub id: String,
    pub imported: bool,
    /// The `<item>` element as returned by the server.
    pub xml: String,
}

/// What an issue import produced.
///
/// Partial failure is never an error: inspect [`ImportReport::items`] and
/// [`ImportReport::count_matches`].
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    /// Response body as text (empty when the server returned nothing usable).
    pub response: String,
    pub items: Vec<ImportItem>,
    /// Number of records submitted in this request.
    pub submitted: usize,
    /// Reports of the one-by-one resubmission, if it ran.
    pub fallback: Vec<ImportReport>,
    /// `numberInProject` of records the fallback budget left unsent.
    pub skipped: Vec<String>,
}

impl ImportReport {
    /// Whether the server reported exactly one item per submitted record.
    pub fn count_matches(&self) -> bool {
        self.items.len() == self.submitted
    }

    /// Items the server did not import.
    pub fn failed(&self) -> impl Iterator<Item = &ImportItem> {
        self.items.iter().filter(|item| !item.imported)
    }

    /// True when every submitted record was imported, directly or on fallback.
    ///
    /// Records the fallback budget never resent count as not imported.
    pub fn all_imported(&self) -> bool {
        if !self.fallback.is_empty() || !self.skipped.is_empty() {
            return self.fallback.len() >= self.submitted
                && self.fallback.iter().all(ImportReport::all_imported);
        }
        self.count_matches() && self.failed().next().is_none()
    }
}

fn build_report(project_id: &str, parsed: Parsed, sent: &IssuesXml, submitted: usize) -> ImportReport {
    let root = match parsed {
        Parsed::Xml(root) => root,
        other => {
            error!("Can't parse import response for project {}", project_id);
            debug!("Request was: {}", sent.xml);
            return ImportReport {
                response: other.into_text(),
                submitted,
                ..ImportReport::default()
            };
        }
    };

    let items: Vec<ImportItem> = root
        .descendants_named("item")
        .into_iter()
        .map(|item| ImportItem {
            id: item.attr_or_empty("id"),
            imported: item.attr("imported").map(str::to_lowercase).as_deref() == Some("true"),
            xml: item.to_xml(),
        })
        .collect();
    let response = root.to_xml();

    if items.len() != submitted {
        warn!(
            "Import of {} issues into {} returned {} items: {}",
            submitted,
            project_id,
            items.len(),
            response
        );
    } else {
        for item in &items {
            if item.imported {
                info!("Issue [ {}-{} ] imported successfully", project_id, item.id);
            } else {
                error!(
                    "Failed to import issue [ {}-{} ]. Reason: {}. Request was: {}",
                    project_id,
                    item.id,
                    item.xml,
                    sent.records.get(&item.id).map(String::as_str).unwrap_or_default()
                );
            }
        }
    }

    ImportReport {
        response,
        items,
        submitted,
        fallback: Vec::new(),
        skipped: Vec::new(),
    }
}

impl Connection {
    /// The deny-list for importing into `project_id`.
    ///
    /// Adds the project's time-spent field when time tracking is enabled, and
    /// `markdown` when the server predates markdown support.
    #[instrument(skip(self))]
    pub async fn import_deny_list(&mut self, project_id: &str) -> Result<DenyList> {
        let mut deny = DenyList::standard();

        if let Some(settings) = self.get_project_time_tracking_settings(project_id).await? {
            if settings.enabled {
                if let Some(field) = &settings.time_spent_field {
                    deny.deny(field);
                }
            }
        }

        if !self.is_markdown_supported().await? {
            deny.deny("markdown");
        }

        Ok(deny)
    }

    /// Import users. An empty slice sends nothing and returns `None`.
    #[instrument(skip(self, users), fields(count = users.len()))]
    pub async fn import_users(&mut self, users: &[ImportUser]) -> Result<Option<String>> {
        if users.is_empty() {
            return Ok(None);
        }
        let request = ApiRequest::put("/import/users")
            .body(users_xml(users))
            .ignore_status(StatusCode::BAD_REQUEST);
        Ok(Some(self.request_parsed(request).await?.into_text()))
    }

    /// Import links. An empty slice sends nothing and returns `None`.
    #[instrument(skip(self, links), fields(count = links.len()))]
    pub async fn import_links(&mut self, links: &[ImportLink]) -> Result<Option<String>> {
        if links.is_empty() {
            return Ok(None);
        }
        let request = ApiRequest::put("/import/links")
            .body(links_xml(links))
            .ignore_status(StatusCode::BAD_REQUEST);
        Ok(Some(self.request_parsed(request).await?.into_text()))
    }

    /// Import a prebuilt issues document.
    #[instrument(skip(self, xml))]
    pub async fn import_issues_xml(
        &mut self,
        project_id: &str,
        assignee_group: &str,
        xml: &str,
    ) -> Result<String> {
        let parsed = self.submit_issues(project_id, assignee_group, xml).await?;
        Ok(parsed.into_text())
    }

    /// Import issues with default options.
    pub async fn import_issues(
        &mut self,
        project_id: &str,
        assignee_group: &str,
        issues: &[IssueRecord],
    ) -> Result<Option<ImportReport>> {
        self.import_issues_with(project_id, assignee_group, issues, &ImportOptions::default())
            .await
    }

    /// Import issues in one request, falling back to one request per record
    /// when a multi-record batch comes back empty.
    ///
    /// An empty slice sends nothing and returns `None`.
    #[instrument(skip(self, issues, options), fields(count = issues.len()))]
    pub async fn import_issues_with(
        &mut self,
        project_id: &str,
        assignee_group: &str,
        issues: &[IssueRecord],
        options: &ImportOptions,
    ) -> Result<Option<ImportReport>> {
        if issues.is_empty() {
            return Ok(None);
        }

        let deny = self.import_deny_list(project_id).await?;
        let sent = issues_xml(issues, &deny);
        let parsed = self.submit_issues(project_id, assignee_group, &sent.xml).await?;

        if parsed.is_empty() && issues.len() > 1 {
            let budget = options.fallback_budget.unwrap_or(issues.len());
            warn!(
                "Empty response importing {} issues into {}; resubmitting up to {} one by one",
                issues.len(),
                project_id,
                budget
            );

            let mut fallback = Vec::new();
            for issue in issues.iter().take(budget) {
                let single = issues_xml(std::slice::from_ref(issue), &deny);
                let parsed = self.submit_issues(project_id, assignee_group, &single.xml).await?;
                fallback.push(build_report(project_id, parsed, &single, 1));
            }

            let skipped: Vec<String> = issues
                .iter()
                .skip(budget)
                .map(|issue| issue.number_in_project().unwrap_or_default().to_string())
                .collect();
            if !skipped.is_empty() {
                warn!(
                    "Fallback budget exhausted; issues not sent to {}: {}",
                    project_id,
                    skipped.join(", ")
                );
            }

            let mut report = build_report(project_id, Parsed::Unparsed, &sent, issues.len());
            report.fallback = fallback;
            report.skipped = skipped;
            return Ok(Some(report));
        }

        Ok(Some(build_report(project_id, parsed, &sent, issues.len())))
    }

    async fn submit_issues(
        &mut self,
        project_id: &str,
        assignee_group: &str,
        xml: &str,
    ) -> Result<Parsed> {
        let path = format!(
            "/import/{}/issues?{}",
            quote(project_id),
            query(&[("assigneeGroup", assignee_group)])
        );
        let request = ApiRequest::put(path)
            .body(xml)
            .ignore_status(StatusCode::BAD_REQUEST);
        self.request_parsed(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::xml::parse;

    fn record(number: &str, summary: &str) -> IssueRecord {
        IssueRecord::new()
            .with("numberInProject", number)
            .with("summary", summary)
    }

    #[test]
    fn test_issues_xml_layout() {
        let issues = vec![record("1", "  First  ")
            .with("Fix versions", vec!["1.0".to_string(), "2.0".to_string()])
            .with("assignee", None::<String>)];
        let sent = issues_xml(&issues, &DenyList::standard());

        assert_eq!(
            sent.xml,
            "<issues>\n  <issue>\n    <field name=\"numberInProject\">\n      <value>1</value>\n    </field>\n    <field name=\"summary\">\n      <value>First</value>\n    </field>\n    <field name=\"Fix versions\">\n      <value>1.0</value>\n      <value>2.0</value>\n    </field>\n  </issue>\n</issues>"
        );
        assert!(sent.records.contains_key("1"));
    }

    #[test]
    fn test_denied_fields_never_emitted() {
        let issue = record("3", "Denied")
            .with("id", "ABC-3")
            .with("votes", "7")
            .with("attachments", vec!["a.png".to_string()])
            .with("markdown", "true");
        let mut deny = DenyList::standard();
        deny.deny("markdown");

        let xml = issues_xml(&[issue], &deny).xml;
        assert!(!xml.contains("\"id\""));
        assert!(!xml.contains("votes"));
        assert!(!xml.contains("attachments"));
        assert!(!xml.contains("markdown"));
        assert!(xml.contains("Denied"));
    }

    #[test]
    fn test_issue_text_is_escaped() {
        let xml = issues_xml(&[record("1", "a < b && c > d")], &DenyList::standard()).xml;
        assert!(xml.contains("<value>a &lt; b &amp;&amp; c &gt; d</value>"));
        assert!(parse(xml.as_bytes()).is_ok());
    }

    #[test]
    fn test_comments_are_self_closing_and_escaped() {
        let issue = record("1", "With comment")
            .with_comment(Comment::new("jane", "line one\n\"quoted\" <b>", "1267030230127"));
        let xml = issues_xml(&[issue], &DenyList::standard()).xml;

        assert!(xml.contains(
            "    <comment author=\"jane\" text=\"line one&#xA;&quot;quoted&quot; &lt;b&gt;\" created=\"1267030230127\"/>\n"
        ));
        let root = parse(xml.as_bytes()).unwrap();
        let comment = root.descendants_named("comment")[0];
        assert_eq!(comment.attr("text"), Some("line one\n\"quoted\" <b>"));
    }

    #[test]
    fn test_record_from_issue_keeps_comments() {
        let root = parse(
            br#"<issue id="ABC-1"><field name="summary"><value>S</value></field><comment author="a" text="t"/></issue>"#,
        )
        .unwrap();
        let issue = <Issue as crate::api::types::FromXml>::from_xml(&root);
        let record = IssueRecord::from(&issue);

        assert_eq!(record.comments.len(), 1);
        let xml = issues_xml(&[record], &DenyList::standard()).xml;
        assert!(!xml.contains("ABC-1"));
        assert!(xml.contains("<comment author=\"a\" text=\"t\"/>"));
    }

    #[test]
    fn test_set_replaces_existing_field() {
        let mut issue = record("1", "old");
        issue.set("summary", "new");
        assert_eq!(issue.fields.len(), 2);
        assert_eq!(issue.fields[1].1, FieldValue::Scalar("new".into()));
    }

    #[test]
    fn test_users_xml_known_attributes_only() {
        let mut user = ImportUser::new("jane");
        user.full_name = Some("Jane \"JR\" Roe".into());
        assert_eq!(
            users_xml(&[user]),
            "<list>\n  <user login=\"jane\" fullName=\"Jane &quot;JR&quot; Roe\" />\n</list>"
        );
    }

    #[test]
    fn test_links_xml_omits_type_names() {
        let link = Link {
            type_name: "Depend".into(),
            source: "ABC-1".into(),
            target: "ABC-2".into(),
            type_outward: "depends on".into(),
            type_inward: "is required for".into(),
        };
        let xml = links_xml(&[ImportLink::from(&link)]);
        assert_eq!(
            xml,
            "<list>\n  <link typeName=\"Depend\" source=\"ABC-1\" target=\"ABC-2\" />\n</list>"
        );
    }

    #[test]
    fn test_work_items_xml_wraps_items() {
        let xml = work_items_xml(&[WorkItem::new("1", "15", "jane")]);
        assert!(xml.starts_with("<workItems><workItem>"));
        assert!(xml.ends_with("</workItem></workItems>"));
    }

    #[test]
    fn test_report_counts_and_failures() {
        let issues = vec![record("1", "a"), record("2", "b")];
        let sent = issues_xml(&issues, &DenyList::standard());
        let response = parse(
            br#"<importResult><item id="1" imported="true"/><item id="2" imported="FALSE"><error>bad</error></item></importResult>"#,
        )
        .unwrap();

        let report = build_report("ABC", Parsed::Xml(response), &sent, 2);
        assert!(report.count_matches());
        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.failed().next().unwrap().id, "2");
        assert!(!report.all_imported());
    }

    #[test]
    fn test_report_from_unparsed_response() {
        let sent = issues_xml(&[record("1", "a")], &DenyList::standard());
        let report = build_report("ABC", Parsed::Unparsed, &sent, 1);
        assert_eq!(report.response, "");
        assert!(!report.count_matches());
    }

    #[test]
    fn test_report_with_unsent_records_is_not_all_imported() {
        let sent = issues_xml(&[record("1", "a")], &DenyList::standard());
        let response = parse(br#"<importResult><item id="1" imported="true"/></importResult>"#).unwrap();
        let first = build_report("ABC", Parsed::Xml(response), &sent, 1);
        assert!(first.all_imported());

        let mut report = ImportReport {
            submitted: 2,
            ..ImportReport::default()
        };
        report.fallback = vec![first.clone()];
        report.skipped = vec!["2".to_string()];
        assert!(!report.all_imported());

        report.fallback.push(first);
        report.skipped.clear();
        assert!(report.all_imported());
    }
}
