//! Projects and their per-project settings.

use super::FromXml;
use crate::api::xml::Element;

/// A project as returned by `GET /admin/project/<id>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    /// Short name, used as the issue id prefix.
    pub id: String,
    pub name: String,
    pub description: String,
    /// Login of the project lead.
    pub lead: String,
    pub starting_number: Option<u32>,
}

impl Project {
    pub fn new(id: &str, name: &str, description: &str, lead: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            lead: lead.to_string(),
            starting_number: None,
        }
    }
}

impl FromXml for Project {
    fn from_xml(el: &Element) -> Self {
        Self {
            id: el
                .attr("id")
                .or_else(|| el.attr("shortName"))
                .unwrap_or_default()
                .to_string(),
            name: el.attr_or_empty("name"),
            description: el.attr_or_empty("description"),
            lead: el.attr_or_empty("lead"),
            starting_number: el.attr("startingNumber").and_then(|v| v.parse().ok()),
        }
    }
}

/// A subsystem of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subsystem {
    pub name: String,
    pub is_default: bool,
    pub default_assignee: String,
}

impl FromXml for Subsystem {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.attr_or_empty("name"),
            is_default: el.attr_bool("isDefault"),
            default_assignee: el.attr_or_empty("defaultAssignee"),
        }
    }
}

/// A project version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Version {
    pub name: String,
    pub description: String,
    pub is_released: bool,
    pub is_archived: bool,
    pub release_date: Option<String>,
}

impl FromXml for Version {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.attr_or_empty("name"),
            description: el.attr_or_empty("description"),
            is_released: el.attr_bool("isReleased"),
            is_archived: el.attr_bool("isArchived"),
            release_date: el.attr("releaseDate").map(str::to_string),
        }
    }
}

/// A project build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Build {
    pub name: String,
    pub assemble_date: String,
}

impl FromXml for Build {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.attr_or_empty("name"),
            assemble_date: el.attr_or_empty("assembleDate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::xml::parse;

    #[test]
    fn test_project_from_admin_xml() {
        let project = Project::from_xml(
            &parse(br#"<project id="ABC" name="Alphabet" lead="root" description="Letters" startingNumber="5"/>"#)
                .unwrap(),
        );
        assert_eq!(project.id, "ABC");
        assert_eq!(project.lead, "root");
        assert_eq!(project.starting_number, Some(5));
    }

    #[test]
    fn test_project_falls_back_to_short_name() {
        let project =
            Project::from_xml(&parse(br#"<project shortName="XYZ" name="Other"/>"#).unwrap());
        assert_eq!(project.id, "XYZ");
        assert_eq!(project.starting_number, None);
    }

    #[test]
    fn test_version_flags() {
        let version = Version::from_xml(
            &parse(br#"<version name="1.0" isReleased="true" isArchived="false" releaseDate="1300000000000"/>"#)
                .unwrap(),
        );
        assert!(version.is_released);
        assert!(!version.is_archived);
        assert_eq!(version.release_date.as_deref(), Some("1300000000000"));
    }
}
