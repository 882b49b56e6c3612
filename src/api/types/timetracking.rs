//! Work items, work types and time tracking settings.

use super::FromXml;
use crate::api::xml::{escape_text, Element};

/// Time logged against an issue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkItem {
    pub id: String,
    /// Date in milliseconds since the epoch, as text.
    pub date: String,
    /// Duration in minutes, as text.
    pub duration: String,
    pub description: Option<String>,
    pub author_login: String,
    pub worktype: Option<String>,
}

impl WorkItem {
    pub fn new(date: &str, duration: &str, author_login: &str) -> Self {
        Self {
            date: date.to_string(),
            duration: duration.to_string(),
            author_login: author_login.to_string(),
            ..Self::default()
        }
    }

    /// The `<workItem>` body, with or without the author element.
    pub(crate) fn to_xml(&self, with_author: bool) -> String {
        let mut xml = String::from("<workItem>");
        xml.push_str(&format!("<date>{}</date>", escape_text(&self.date)));
        xml.push_str(&format!("<duration>{}</duration>", escape_text(&self.duration)));
        if let Some(description) = &self.description {
            xml.push_str(&format!("<description>{}</description>", escape_text(description)));
        }
        if let Some(worktype) = &self.worktype {
            xml.push_str(&format!("<worktype><name>{}</name></worktype>", escape_text(worktype)));
        }
        if with_author {
            xml.push_str(&format!(
                "<author login=\"{}\"></author>",
                crate::api::xml::escape_attr(&self.author_login)
            ));
        }
        xml.push_str("</workItem>");
        xml
    }
}

impl FromXml for WorkItem {
    fn from_xml(el: &Element) -> Self {
        Self {
            id: el.child_text("id").unwrap_or_default(),
            date: el.child_text("date").unwrap_or_default(),
            duration: el.child_text("duration").unwrap_or_default(),
            description: el.child_text("description"),
            author_login: el
                .child("author")
                .map(|a| a.attr_or_empty("login"))
                .unwrap_or_default(),
            worktype: el
                .child("worktype")
                .and_then(|w| w.child_text("name")),
        }
    }
}

/// A kind of work (development, testing, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkType {
    pub id: String,
    pub name: String,
    pub auto_attached: bool,
    pub url: String,
}

impl WorkType {
    pub fn new(name: &str, auto_attached: bool) -> Self {
        Self {
            name: name.to_string(),
            auto_attached,
            ..Self::default()
        }
    }

    /// Request body for `POST /admin/timetracking/worktype`.
    pub fn to_xml(&self) -> String {
        format!(
            "<workType><name>{}</name><autoAttached>{}</autoAttached></workType>",
            escape_text(&self.name),
            super::bool_param(self.auto_attached)
        )
    }
}

impl FromXml for WorkType {
    fn from_xml(el: &Element) -> Self {
        Self {
            id: el.child_text("id").unwrap_or_default(),
            name: el.child_text("name").unwrap_or_default(),
            auto_attached: el
                .child_text("autoAttached")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            url: el.child_text("url").unwrap_or_default(),
        }
    }
}

/// Server-wide working calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalTimeTrackingSettings {
    pub days_a_week: Option<u32>,
    pub hours_a_day: Option<u32>,
}

impl FromXml for GlobalTimeTrackingSettings {
    fn from_xml(el: &Element) -> Self {
        Self {
            days_a_week: el.child_text("daysAWeek").and_then(|v| v.trim().parse().ok()),
            hours_a_day: el.child_text("hoursADay").and_then(|v| v.trim().parse().ok()),
        }
    }
}

/// Per-project time tracking configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectTimeTrackingSettings {
    pub enabled: bool,
    pub estimate_field: Option<String>,
    pub time_spent_field: Option<String>,
}

impl FromXml for ProjectTimeTrackingSettings {
    fn from_xml(el: &Element) -> Self {
        let field_name = |tag: &str| {
            el.child(tag)
                .and_then(|f| f.attr("name"))
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        };
        Self {
            enabled: el.attr_bool("enabled"),
            estimate_field: field_name("estimation"),
            time_spent_field: field_name("spentTime"),
        }
    }
}
