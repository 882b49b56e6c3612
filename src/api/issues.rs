//! Issue operations: reading, creating, commands, attachments and search.

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use tracing::{debug, info, instrument, warn};

use super::client::{query, quote, redact_system_users, ApiRequest, Connection};
use super::error::{ApiError, Result};
use super::response::{Parsed, RawResponse};
use super::types::{
    bool_param, records, records_named, Attachment, Comment, FromXml, IntelliSense, Issue,
    IssueChange, Link, Sprint,
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Fields for `PUT /issue`. Unset options are not sent.
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub project: String,
    pub summary: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub issue_type: Option<String>,
    pub subsystem: Option<String>,
    pub state: Option<String>,
    pub affects_version: Option<String>,
    pub fixed_version: Option<String>,
    pub fixed_in_build: Option<String>,
    pub permitted_group: Option<String>,
}

impl NewIssue {
    pub fn new(project: &str, summary: &str) -> Self {
        Self {
            project: project.to_string(),
            summary: summary.to_string(),
            ..Self::default()
        }
    }

    fn form_body(&self) -> String {
        let optional = [
            ("description", &self.description),
            ("assignee", &self.assignee),
            ("priority", &self.priority),
            ("type", &self.issue_type),
            ("subsystem", &self.subsystem),
            ("state", &self.state),
            ("affectsVersion", &self.affects_version),
            ("fixVersion", &self.fixed_version),
            ("fixedInBuild", &self.fixed_in_build),
            ("permittedGroup", &self.permitted_group),
        ];

        let mut pairs = vec![("project", self.project.as_str()), ("summary", self.summary.as_str())];
        pairs.extend(
            optional
                .iter()
                .filter_map(|(k, v)| v.as_deref().map(|v| (*k, v))),
        );
        query(&pairs)
    }
}

/// A command to run against an issue.
#[derive(Debug, Clone, Default)]
pub struct Command {
    pub command: String,
    pub comment: Option<String>,
    /// Group allowed to see the comment.
    pub group: Option<String>,
    pub run_as: Option<String>,
    pub disable_notifications: bool,
}

impl Command {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            ..Self::default()
        }
    }

    fn form_body(&self) -> String {
        let mut pairs = vec![("command", self.command.as_str())];
        if let Some(comment) = &self.comment {
            pairs.push(("comment", comment.as_str()));
        }
        if let Some(group) = &self.group {
            pairs.push(("group", group.as_str()));
        }
        if let Some(run_as) = &self.run_as {
            pairs.push(("runAs", run_as.as_str()));
        }
        if self.disable_notifications {
            pairs.push(("disableNotifications", bool_param(true)));
        }
        query(&pairs)
    }
}

/// File content to upload as an attachment.
#[derive(Debug, Clone, Default)]
pub struct NewAttachment {
    pub name: String,
    pub content: Vec<u8>,
    pub content_type: Option<String>,
    pub author_login: String,
    pub group: Option<String>,
    /// Creation time in epoch milliseconds. Defaults to the issue's creation
    /// time, or now when the issue cannot be read.
    pub created: Option<String>,
}

impl NewAttachment {
    pub fn new(name: &str, content: Vec<u8>, author_login: &str) -> Self {
        Self {
            name: name.to_string(),
            content,
            author_login: author_login.to_string(),
            ..Self::default()
        }
    }
}

/// Optional arguments of the intellisense calls.
#[derive(Debug, Clone, Default)]
pub struct IntelliSenseOptions {
    pub caret: Option<u32>,
    pub options_limit: Option<u32>,
}

impl IntelliSenseOptions {
    fn push_pairs(&self, pairs: &mut Vec<(&'static str, String)>) {
        if let Some(caret) = self.caret {
            pairs.push(("caret", caret.to_string()));
        }
        if let Some(limit) = self.options_limit {
            pairs.push(("optionsLimit", limit.to_string()));
        }
    }
}

fn owned_query(pairs: &[(&str, String)]) -> String {
    let borrowed: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
    query(&borrowed)
}

fn now_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}

impl Connection {
    /// Fetch one issue with its fields and comments.
    #[instrument(skip(self))]
    pub async fn get_issue(&mut self, id: &str) -> Result<Issue> {
        let root = self.get_element(&format!("/issue/{}", id)).await?;
        Ok(Issue::from_xml(&root))
    }

    /// Create an issue; the response carries its `Location`.
    #[instrument(skip(self, issue), fields(project = %issue.project))]
    pub async fn create_issue(&mut self, issue: &NewIssue) -> Result<RawResponse> {
        let request = ApiRequest::put("/issue")
            .body(issue.form_body())
            .content_type(FORM_CONTENT_TYPE);
        self.request(&request).await
    }

    #[instrument(skip(self))]
    pub async fn delete_issue(&mut self, id: &str) -> Result<RawResponse> {
        self.request(&ApiRequest::delete(format!("/issue/{}", id))).await
    }

    #[instrument(skip(self))]
    pub async fn get_changes_for_issue(&mut self, id: &str) -> Result<Vec<IssueChange>> {
        let root = self.get_element(&format!("/issue/{}/changes", id)).await?;
        Ok(records_named(&root, "change"))
    }

    #[instrument(skip(self))]
    pub async fn get_comments(&mut self, id: &str) -> Result<Vec<Comment>> {
        let root = self.get_xml(&format!("/issue/{}/comment", id)).await?;
        Ok(records(&root))
    }

    #[instrument(skip(self))]
    pub async fn get_attachments(&mut self, id: &str) -> Result<Vec<Attachment>> {
        let root = self.get_xml(&format!("/issue/{}/attachment", id)).await?;
        Ok(records(&root))
    }

    /// Download an attachment from its server-relative `url`.
    ///
    /// Sent once with the session headers; the body is returned untouched.
    #[instrument(skip(self))]
    pub async fn get_attachment_content(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .session
            .apply(self.client.get(format!("{}{}", self.url, url)))
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        if !status.is_success() {
            let body = redact_system_users(&body);
            return Err(ApiError::status_error(url, status, headers, &body));
        }
        Ok(body.to_vec())
    }

    #[instrument(skip(self))]
    pub async fn delete_attachment(&mut self, issue_id: &str, attachment_id: &str) -> Result<RawResponse> {
        let path = format!("/issue/{}/attachment/{}", issue_id, attachment_id);
        self.request(&ApiRequest::delete(path)).await
    }

    /// Attach a file to an existing issue.
    pub async fn create_attachment(&mut self, issue_id: &str, attachment: &NewAttachment) -> Result<RawResponse> {
        self.upload_attachment("/issue/", issue_id, attachment).await
    }

    /// Attach a file through the import endpoint, keeping author and date.
    pub async fn import_attachment(&mut self, issue_id: &str, attachment: &NewAttachment) -> Result<RawResponse> {
        self.upload_attachment("/import/", issue_id, attachment).await
    }

    #[instrument(skip(self, attachment), fields(name = %attachment.name))]
    async fn upload_attachment(
        &mut self,
        prefix: &str,
        issue_id: &str,
        attachment: &NewAttachment,
    ) -> Result<RawResponse> {
        let created = match &attachment.created {
            Some(created) => created.clone(),
            None => match self.get_issue(issue_id).await {
                Ok(issue) => issue.created().map(str::to_string).unwrap_or_else(now_millis),
                Err(e) => {
                    debug!("Could not read issue {} for attachment date: {}", issue_id, e);
                    now_millis()
                }
            },
        };

        let params = query(&[
            ("authorLogin", attachment.author_login.as_str()),
            ("group", attachment.group.as_deref().unwrap_or_default()),
            ("created", created.as_str()),
        ]);
        let path = format!("{}{}/attachment?{}", prefix, issue_id, params);

        let mut part = Part::bytes(attachment.content.clone()).file_name(attachment.name.clone());
        if let Some(content_type) = &attachment.content_type {
            part = part.mime_str(content_type)?;
        }
        let form = Form::new().part(attachment.name.clone(), part);

        let response = self
            .session
            .apply(self.client.post(format!("{}{}", self.base_url, path)))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = redact_system_users(&response.bytes().await?);
        if status != StatusCode::OK && status != StatusCode::CREATED {
            warn!("Can't create attachment {} for {}: {}", attachment.name, issue_id, status);
            return Err(ApiError::status_error(&path, status, headers, &body));
        }

        info!("Attachment {} uploaded to {}", attachment.name, issue_id);
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    /// Links of an issue; with `outward_only`, only those whose source is `id`.
    #[instrument(skip(self))]
    pub async fn get_links(&mut self, id: &str, outward_only: bool) -> Result<Vec<Link>> {
        let root = self.get_xml(&format!("/issue/{}/link", quote(id))).await?;
        Ok(records::<Link>(&root)
            .into_iter()
            .filter(|link| !outward_only || link.source == id)
            .collect())
    }

    /// Issues of one project (or all projects when `project_id` is empty).
    #[instrument(skip(self))]
    pub async fn get_issues(
        &mut self,
        project_id: &str,
        filter: &str,
        after: u32,
        max: u32,
    ) -> Result<Vec<Issue>> {
        let mut path = String::from("/issue");
        if !project_id.is_empty() {
            path.push_str(&format!("/byproject/{}", quote(project_id)));
        }
        let params = owned_query(&[
            ("after", after.to_string()),
            ("max", max.to_string()),
            ("filter", filter.to_string()),
        ]);
        let root = self.get_xml(&format!("{}?{}", path, params)).await?;
        Ok(records(&root))
    }

    /// Issues across all projects, optionally restricted to `with_fields`.
    #[instrument(skip(self))]
    pub async fn get_all_issues(
        &mut self,
        filter: &str,
        after: u32,
        max: u32,
        with_fields: &[&str],
    ) -> Result<Vec<Issue>> {
        let mut pairs: Vec<(&str, String)> =
            with_fields.iter().map(|f| ("with", f.to_string())).collect();
        pairs.push(("after", after.to_string()));
        pairs.push(("max", max.to_string()));
        pairs.push(("filter", filter.to_string()));

        let root = self.get_xml(&format!("/issue?{}", owned_query(&pairs))).await?;
        Ok(records(&root))
    }

    /// Number of issues matching `filter`.
    ///
    /// The server answers -1 while it is still counting. With
    /// `wait_for_server` the count is polled every `count_poll_interval` until
    /// it settles; otherwise the first answer is returned as-is.
    #[instrument(skip(self))]
    pub async fn get_number_of_issues(&mut self, filter: &str, wait_for_server: bool) -> Result<i64> {
        let path = format!("/issue/count?{}", query(&[("filter", filter)]));
        let request = ApiRequest::get(path.clone()).content_type("application/json");

        loop {
            let response = self.request(&request).await?;
            let value: serde_json::Value = serde_json::from_slice(&response.body)?;
            let count = value
                .get("value")
                .and_then(serde_json::Value::as_i64)
                .ok_or_else(|| ApiError::UnexpectedResponse {
                    path: path.clone(),
                    expected: "issue count",
                })?;

            if !wait_for_server || count != -1 {
                return Ok(count);
            }
            debug!("Server is still counting, polling again in {:?}", self.options.count_poll_interval);
            tokio::time::sleep(self.options.count_poll_interval).await;
        }
    }

    #[instrument(skip(self))]
    pub async fn get_all_sprints(&mut self, agile_id: &str) -> Result<Vec<Sprint>> {
        let root = self.get_xml(&format!("/agile/{}/sprints?", agile_id)).await?;
        Ok(records(&root))
    }

    /// Every issue link on the server.
    #[instrument(skip(self))]
    pub async fn export_issue_links(&mut self) -> Result<Vec<Link>> {
        let root = self.get_element("/export/links").await?;
        Ok(records(&root))
    }

    /// Apply a command to an issue.
    #[instrument(skip(self, command), fields(command = %command.command))]
    pub async fn execute_command(&mut self, issue_id: &str, command: &Command) -> Result<()> {
        let request = ApiRequest::post(format!("/issue/{}/execute", issue_id))
            .body(command.form_body())
            .content_type(FORM_CONTENT_TYPE);
        self.request(&request).await?;
        info!("Command executed");
        Ok(())
    }

    /// The event stream of an issue, as returned.
    #[instrument(skip(self))]
    pub async fn get_events(&mut self, issue_id: &str) -> Result<Parsed> {
        self.get(&format!("/event/issueEvents/{}", quote(issue_id))).await
    }

    /// Completion suggestions for a search query.
    #[instrument(skip(self, options))]
    pub async fn get_search_intellisense(
        &mut self,
        search: &str,
        context: Option<&str>,
        options: &IntelliSenseOptions,
    ) -> Result<IntelliSense> {
        let mut pairs = vec![("filter", search.to_string())];
        if let Some(project) = context.filter(|c| !c.is_empty()) {
            pairs.push(("project", project.to_string()));
        }
        options.push_pairs(&mut pairs);

        let root = self
            .get_element(&format!("/issue/intellisense?{}", owned_query(&pairs)))
            .await?;
        Ok(IntelliSense::from_xml(&root))
    }

    /// Completion suggestions for a command on an issue.
    #[instrument(skip(self, options))]
    pub async fn get_command_intellisense(
        &mut self,
        issue_id: &str,
        command: &str,
        run_as: Option<&str>,
        options: &IntelliSenseOptions,
    ) -> Result<IntelliSense> {
        let mut pairs = vec![("command", command.to_string())];
        if let Some(run_as) = run_as.filter(|r| !r.is_empty()) {
            pairs.push(("runAs", run_as.to_string()));
        }
        options.push_pairs(&mut pairs);

        let path = format!("/issue/{}/execute/intellisense?{}", issue_id, owned_query(&pairs));
        let root = self.get_element(&path).await?;
        Ok(IntelliSense::from_xml(&root))
    }
}
