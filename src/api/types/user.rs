//! Users, groups, roles and permissions.

use super::FromXml;
use crate::api::xml::{escape_attr, Element};

/// A YouTrack user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub login: String,
    pub full_name: String,
    pub email: String,
    pub jabber: String,
}

impl FromXml for User {
    fn from_xml(el: &Element) -> Self {
        Self {
            login: el.attr_or_empty("login"),
            full_name: el.attr_or_empty("fullName"),
            email: el.attr_or_empty("email"),
            jabber: el.attr_or_empty("jabber"),
        }
    }
}

/// A user group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub description: String,
    pub auto_join: bool,
}

impl Group {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl FromXml for Group {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.attr_or_empty("name"),
            description: el.attr_or_empty("description"),
            auto_join: el.attr_bool("autoJoin"),
        }
    }
}

/// A role: a named set of permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub description: String,
}

impl Role {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

impl FromXml for Role {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.attr_or_empty("name"),
            description: el.attr_or_empty("description"),
        }
    }
}

/// A role granted to a group, optionally limited to some projects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRole {
    pub name: String,
    /// Project ids the role applies to; empty means all projects.
    pub projects: Vec<String>,
}

impl UserRole {
    pub fn new(name: &str, projects: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            projects: projects.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Request body for `PUT /admin/group/<group>/role/<role>`.
    pub fn to_xml(&self) -> String {
        let mut xml = format!("<userRole name=\"{}\">", escape_attr(&self.name));
        if !self.projects.is_empty() {
            xml.push_str("<projects>");
            for project in &self.projects {
                xml.push_str(&format!("<projectRef id=\"{}\"/>", escape_attr(project)));
            }
            xml.push_str("</projects>");
        }
        xml.push_str("</userRole>");
        xml
    }
}

impl FromXml for UserRole {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.attr_or_empty("name"),
            projects: el
                .descendants_named("projectRef")
                .into_iter()
                .map(|p| p.attr_or_empty("id"))
                .collect(),
        }
    }
}

/// A single permission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permission {
    pub name: String,
    pub description: String,
}

impl Permission {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
        }
    }
}

impl FromXml for Permission {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.attr_or_empty("name"),
            description: el.attr_or_empty("description"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::xml::parse;

    #[test]
    fn test_user_from_xml() {
        let user = User::from_xml(
            &parse(br#"<user login="jane" fullName="Jane Roe" email="jane@example.com"/>"#).unwrap(),
        );
        assert_eq!(user.login, "jane");
        assert_eq!(user.full_name, "Jane Roe");
        assert_eq!(user.jabber, "");
    }

    #[test]
    fn test_user_role_round_trip() {
        let role = UserRole::new("Developer", &["ABC", "XYZ"]);
        let xml = role.to_xml();
        assert_eq!(
            xml,
            "<userRole name=\"Developer\"><projects><projectRef id=\"ABC\"/><projectRef id=\"XYZ\"/></projects></userRole>"
        );
        assert_eq!(UserRole::from_xml(&parse(xml.as_bytes()).unwrap()), role);
    }

    #[test]
    fn test_user_role_without_projects() {
        assert_eq!(
            UserRole::new("Observer", &[]).to_xml(),
            "<userRole name=\"Observer\"></userRole>"
        );
    }
}
