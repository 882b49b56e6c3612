//! Time tracking: work items, work types and settings.

use reqwest::StatusCode;
use tracing::{info, instrument, warn};

use super::client::{quote, ApiRequest, Connection};
use super::error::{ApiError, Result};
use super::import::work_items_xml;
use super::response::Parsed;
use super::types::{
    bool_param, records, FromXml, GlobalTimeTrackingSettings, ProjectTimeTrackingSettings, WorkItem,
    WorkType,
};
use super::xml::{escape_attr, Element};

/// Treat 404 as "not configured".
fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => Ok(None),
        Err(e) => Err(e),
    }
}

fn global_settings_xml(days_a_week: Option<u32>, hours_a_day: Option<u32>) -> String {
    let mut xml = String::from("<timesettings>");
    if let Some(days) = days_a_week {
        xml.push_str(&format!("<daysAWeek>{}</daysAWeek>", days));
    }
    if let Some(hours) = hours_a_day {
        xml.push_str(&format!("<hoursADay>{}</hoursADay>", hours));
    }
    xml.push_str("</timesettings>");
    xml
}

fn project_settings_xml(
    estimate_field: Option<&str>,
    time_spent_field: Option<&str>,
    enabled: Option<bool>,
) -> String {
    let mut xml = match enabled {
        Some(enabled) => format!("<settings enabled=\"{}\">", bool_param(enabled)),
        None => String::from("<settings>"),
    };
    if let Some(field) = estimate_field.filter(|f| !f.is_empty()) {
        xml.push_str(&format!("<estimation name=\"{}\"/>", escape_attr(field)));
    }
    if let Some(field) = time_spent_field.filter(|f| !f.is_empty()) {
        xml.push_str(&format!("<spentTime name=\"{}\"/>", escape_attr(field)));
    }
    xml.push_str("</settings>");
    xml
}

impl Connection {
    /// Work items logged on an issue. A rejected request yields an empty list.
    #[instrument(skip(self))]
    pub async fn get_work_items(&mut self, issue_id: &str) -> Result<Vec<WorkItem>> {
        let path = format!("/issue/{}/timetracking/workitem", quote(issue_id));
        match self.get_xml_accepting_xml(&path).await {
            Ok(root) => Ok(records(&root)),
            Err(e @ ApiError::Status { .. }) => {
                warn!("Can't get work items: {}", e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn get_xml_accepting_xml(&mut self, path: &str) -> Result<Element> {
        let response = self
            .request(&ApiRequest::get(path).content_type("application/xml"))
            .await?;
        super::xml::parse(&response.body).map_err(|e| ApiError::xml(path, e, &response.body))
    }

    #[instrument(skip(self, item))]
    pub async fn create_work_item(&mut self, issue_id: &str, item: &WorkItem) -> Result<Parsed> {
        let request = ApiRequest::post(format!("/issue/{}/timetracking/workitem", quote(issue_id)))
            .body(item.to_xml(false));
        self.request_parsed(request).await
    }

    /// Import work items with their authors. An empty slice sends nothing.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn import_work_items(&mut self, issue_id: &str, items: &[WorkItem]) -> Result<Option<Parsed>> {
        if items.is_empty() {
            return Ok(None);
        }
        let request = ApiRequest::put(format!("/import/issue/{}/workitems", quote(issue_id)))
            .body(work_items_xml(items))
            .accept("application/xml");
        let parsed = self.request_parsed(request).await?;
        info!("Imported {} work items into {}", items.len(), issue_id);
        Ok(Some(parsed))
    }

    #[instrument(skip(self))]
    pub async fn get_global_time_tracking_settings(&mut self) -> Result<Option<GlobalTimeTrackingSettings>> {
        let root = optional(self.get_element("/admin/timetracking").await)?;
        Ok(root.as_ref().map(GlobalTimeTrackingSettings::from_xml))
    }

    #[instrument(skip(self))]
    pub async fn get_project_time_tracking_settings(
        &mut self,
        project_id: &str,
    ) -> Result<Option<ProjectTimeTrackingSettings>> {
        let path = format!("/admin/project/{}/timetracking", quote(project_id));
        let root = optional(self.get_element(&path).await)?;
        Ok(root.as_ref().map(ProjectTimeTrackingSettings::from_xml))
    }

    #[instrument(skip(self))]
    pub async fn set_global_time_tracking_settings(
        &mut self,
        days_a_week: Option<u32>,
        hours_a_day: Option<u32>,
    ) -> Result<Parsed> {
        let request = ApiRequest::put("/admin/timetracking").body(global_settings_xml(days_a_week, hours_a_day));
        self.request_parsed(request).await
    }

    #[instrument(skip(self))]
    pub async fn set_project_time_tracking_settings(
        &mut self,
        project_id: &str,
        estimate_field: Option<&str>,
        time_spent_field: Option<&str>,
        enabled: Option<bool>,
    ) -> Result<Parsed> {
        let request = ApiRequest::put(format!("/admin/project/{}/timetracking", quote(project_id)))
            .body(project_settings_xml(estimate_field, time_spent_field, enabled));
        self.request_parsed(request).await
    }

    /// Work types of a project, or the global ones. A rejected request
    /// yields an empty list.
    #[instrument(skip(self))]
    pub async fn get_work_types(&mut self, project_id: Option<&str>) -> Result<Vec<WorkType>> {
        let path = match project_id {
            Some(project) => format!("/admin/project/{}/timetracking/worktype", quote(project)),
            None => String::from("/admin/timetracking/worktype"),
        };
        match self.get_element(&path).await {
            Ok(root) => Ok(records(&root)),
            Err(e @ ApiError::Status { .. }) => {
                warn!("Can't get work types: {}", e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Create a work type and read it back from its `Location`.
    #[instrument(skip(self, work_type), fields(name = %work_type.name))]
    pub async fn create_work_type(&mut self, work_type: &WorkType) -> Result<WorkType> {
        if work_type.name.is_empty() {
            return Err(ApiError::InvalidInput("work type name cannot be empty".into()));
        }

        let path = "/admin/timetracking/worktype";
        let response = self
            .request(&ApiRequest::post(path).body(work_type.to_xml()))
            .await?;
        let location = response
            .location()
            .map(str::to_string)
            .ok_or_else(|| ApiError::UnexpectedResponse {
                path: path.to_string(),
                expected: "Location header",
            })?;

        let root = self.get_element(&location).await?;
        Ok(WorkType::from_xml(&root))
    }

    /// Create a work type, or return the existing one with the same name
    /// (case-insensitive) when the server rejects it as a duplicate.
    #[instrument(skip(self, work_type), fields(name = %work_type.name))]
    pub async fn create_work_type_safe(&mut self, work_type: &WorkType) -> Result<WorkType> {
        let err = match self.create_work_type(work_type).await {
            Ok(created) => return Ok(created),
            Err(e) => e,
        };
        if !matches!(err.status(), Some(StatusCode::BAD_REQUEST | StatusCode::CONFLICT)) {
            return Err(err);
        }

        let name = work_type.name.to_lowercase();
        self.get_work_types(None)
            .await?
            .into_iter()
            .find(|existing| existing.name.to_lowercase() == name)
            .ok_or(err)
    }

    #[instrument(skip(self))]
    pub async fn attach_work_type_to_project(&mut self, project_id: &str, work_type_id: &str) -> Result<()> {
        let path = format!(
            "/admin/project/{}/timetracking/worktype/{}",
            quote(project_id),
            quote(work_type_id)
        );
        self.request(&ApiRequest::put(path)).await?;
        Ok(())
    }

    /// Create (or find) a work type and attach it to a project.
    pub async fn create_project_work_type(&mut self, project_id: &str, work_type: &WorkType) -> Result<WorkType> {
        let created = self.create_work_type_safe(work_type).await?;
        self.attach_work_type_to_project(project_id, &created.id).await?;
        Ok(created)
    }
}
