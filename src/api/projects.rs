//! Projects, subsystems, versions, builds and issue link types.

use tracing::{debug, instrument};

use super::client::{query, quote, ApiRequest, Connection};
use super::error::Result;
use super::response::{Parsed, RawResponse};
use super::types::{
    bool_param, records, records_named, Build, FromXml, Group, IssueLinkType, Project, Subsystem,
    Version,
};

/// Placeholder the server returns for a subsystem without an assignee.
const NO_USER: &str = "<no user>";

impl Connection {
    /// Every project visible to the current user.
    #[instrument(skip(self))]
    pub async fn get_projects(&mut self) -> Result<Vec<Project>> {
        let root = self.get_element("/project/all").await?;
        Ok(records(&root))
    }

    #[instrument(skip(self))]
    pub async fn get_project(&mut self, project_id: &str) -> Result<Project> {
        let root = self
            .get_element(&format!("/admin/project/{}", quote(project_id)))
            .await?;
        Ok(Project::from_xml(&root))
    }

    /// Short names of all projects.
    #[instrument(skip(self))]
    pub async fn get_project_ids(&mut self) -> Result<Vec<String>> {
        let root = self.get_xml("/admin/project/").await?;
        Ok(root.elements().map(|e| e.attr_or_empty("id")).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_project_assignee_groups(&mut self, project_id: &str) -> Result<Vec<Group>> {
        let path = format!("/admin/project/{}/assignee/group", quote(project_id));
        let root = self.get_xml(&path).await?;
        Ok(records(&root))
    }

    pub async fn create_project(&mut self, project: &Project) -> Result<Parsed> {
        self.create_project_detailed(
            &project.id,
            &project.name,
            &project.description,
            &project.lead,
            project.starting_number.unwrap_or(1),
        )
        .await
    }

    /// Create a project. Slashes in the name are replaced with spaces.
    #[instrument(skip(self, description))]
    pub async fn create_project_detailed(
        &mut self,
        project_id: &str,
        name: &str,
        description: &str,
        lead_login: &str,
        starting_number: u32,
    ) -> Result<Parsed> {
        let name = name.replace('/', " ");
        let description = format!("{} ", description);
        let starting_number = starting_number.to_string();
        let params = query(&[
            ("projectName", name.as_str()),
            ("description", description.as_str()),
            ("projectLeadLogin", lead_login),
            ("lead", lead_login),
            ("startingNumber", starting_number.as_str()),
        ]);
        self.put(&format!("/admin/project/{}?{}", quote(project_id), params))
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_project(&mut self, project_id: &str) -> Result<RawResponse> {
        let path = format!("/admin/project/{}", quote(project_id));
        self.request(&ApiRequest::delete(path)).await
    }

    #[instrument(skip(self))]
    pub async fn get_subsystem(&mut self, project_id: &str, name: &str) -> Result<Subsystem> {
        let path = format!("/admin/project/{}/subsystem/{}", quote(project_id), quote(name));
        let root = self.get_xml(&path).await?;
        Ok(Subsystem::from_xml(&root))
    }

    #[instrument(skip(self))]
    pub async fn get_subsystems(&mut self, project_id: &str) -> Result<Vec<Subsystem>> {
        let path = format!("/admin/project/{}/subsystem", quote(project_id));
        let root = self.get_xml(&path).await?;
        Ok(records(&root))
    }

    pub async fn create_subsystems(&mut self, project_id: &str, subsystems: &[Subsystem]) -> Result<()> {
        for subsystem in subsystems {
            self.create_subsystem(project_id, subsystem).await?;
        }
        Ok(())
    }

    pub async fn create_subsystem(&mut self, project_id: &str, subsystem: &Subsystem) -> Result<()> {
        let assignee = if subsystem.default_assignee == NO_USER {
            ""
        } else {
            subsystem.default_assignee.as_str()
        };
        self.create_subsystem_detailed(project_id, &subsystem.name, subsystem.is_default, assignee)
            .await
    }

    #[instrument(skip(self))]
    pub async fn create_subsystem_detailed(
        &mut self,
        project_id: &str,
        name: &str,
        is_default: bool,
        default_assignee: &str,
    ) -> Result<()> {
        let params = query(&[
            ("isDefault", bool_param(is_default)),
            ("defaultAssignee", default_assignee),
        ]);
        let path = format!(
            "/admin/project/{}/subsystem/{}?{}",
            quote(project_id),
            quote(name),
            params
        );
        self.put(&path).await?;
        debug!("Created subsystem {}", name);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_subsystem(&mut self, project_id: &str, name: &str) -> Result<Parsed> {
        let path = format!("/admin/project/{}/subsystem/{}", quote(project_id), quote(name));
        self.request_parsed(ApiRequest::delete(path)).await
    }

    /// All versions of a project, released ones included.
    #[instrument(skip(self))]
    pub async fn get_versions(&mut self, project_id: &str) -> Result<Vec<Version>> {
        let path = format!("/admin/project/{}/version?showReleased=true", quote(project_id));
        let root = self.get_xml(&path).await?;
        let names: Vec<String> = root
            .descendants_named("version")
            .into_iter()
            .map(|v| v.attr_or_empty("name"))
            .collect();

        let mut versions = Vec::with_capacity(names.len());
        for name in names {
            versions.push(self.get_version(project_id, &name).await?);
        }
        Ok(versions)
    }

    #[instrument(skip(self))]
    pub async fn get_version(&mut self, project_id: &str, name: &str) -> Result<Version> {
        let path = format!("/admin/project/{}/version/{}", quote(project_id), quote(name));
        let root = self.get_element(&path).await?;
        Ok(Version::from_xml(&root))
    }

    pub async fn create_versions(&mut self, project_id: &str, versions: &[Version]) -> Result<()> {
        for version in versions {
            self.create_version(project_id, version).await?;
        }
        Ok(())
    }

    pub async fn create_version(&mut self, project_id: &str, version: &Version) -> Result<Parsed> {
        self.create_version_detailed(
            project_id,
            &version.name,
            version.is_released,
            version.is_archived,
            version.release_date.as_deref(),
            &version.description,
        )
        .await
    }

    #[instrument(skip(self, description))]
    pub async fn create_version_detailed(
        &mut self,
        project_id: &str,
        name: &str,
        is_released: bool,
        is_archived: bool,
        release_date: Option<&str>,
        description: &str,
    ) -> Result<Parsed> {
        let mut pairs = vec![
            ("description", description),
            ("isReleased", bool_param(is_released)),
            ("isArchived", bool_param(is_archived)),
        ];
        if let Some(date) = release_date {
            pairs.push(("releaseDate", date));
        }
        let path = format!(
            "/admin/project/{}/version/{}?{}",
            quote(project_id),
            quote(name),
            query(&pairs)
        );
        self.put(&path).await
    }

    #[instrument(skip(self))]
    pub async fn get_builds(&mut self, project_id: &str) -> Result<Vec<Build>> {
        let root = self
            .get_xml(&format!("/admin/project/{}/build", quote(project_id)))
            .await?;
        Ok(records(&root))
    }

    #[instrument(skip(self))]
    pub async fn get_issue_link_types(&mut self) -> Result<Vec<IssueLinkType>> {
        let root = self.get_xml("/admin/issueLinkType").await?;
        Ok(records_named(&root, "issueLinkType"))
    }

    /// Create every link type in order, stopping at the first failure.
    pub async fn create_issue_link_types(&mut self, link_types: &[IssueLinkType]) -> Result<()> {
        for link_type in link_types {
            self.create_issue_link_type(link_type).await?;
        }
        Ok(())
    }

    pub async fn create_issue_link_type(&mut self, link_type: &IssueLinkType) -> Result<Parsed> {
        self.create_issue_link_type_detailed(
            &link_type.name,
            &link_type.outward_name,
            &link_type.inward_name,
            link_type.directed,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn create_issue_link_type_detailed(
        &mut self,
        name: &str,
        outward_name: &str,
        inward_name: &str,
        directed: bool,
    ) -> Result<Parsed> {
        let params = query(&[
            ("outwardName", outward_name),
            ("inwardName", inward_name),
            ("directed", bool_param(directed)),
        ]);
        self.put(&format!("/admin/issueLinkType/{}?{}", quote(name), params))
            .await
    }
}
