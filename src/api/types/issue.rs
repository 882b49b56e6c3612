//! Issue records and the things hanging off an issue.

use std::fmt;

use super::FromXml;
use crate::api::xml::Element;

/// The value of one issue field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldValue {
    /// The field is present but carries nothing.
    #[default]
    Absent,
    Scalar(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Build from the `<value>` texts of a field.
    pub fn from_values(mut values: Vec<String>) -> Self {
        match values.len() {
            0 => FieldValue::Absent,
            1 => FieldValue::Scalar(values.remove(0)),
            _ => FieldValue::List(values),
        }
    }

    /// The first (or only) value.
    pub fn first(&self) -> Option<&str> {
        match self {
            FieldValue::Absent => None,
            FieldValue::Scalar(v) => Some(v),
            FieldValue::List(vs) => vs.first().map(String::as_str),
        }
    }

    /// All values, in order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            FieldValue::Absent => Vec::new(),
            FieldValue::Scalar(v) => vec![v.as_str()],
            FieldValue::List(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Scalar(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Scalar(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        FieldValue::List(values)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Absent)
    }
}

/// An issue as returned by `GET /issue/<id>` and the issue lists.
///
/// Element attributes (`id`, `entityId`, ...) and `<field>` children are both
/// kept as fields, in document order.
#[derive(Debug, Clone, Default)]
pub struct Issue {
    pub id: String,
    pub fields: Vec<(String, FieldValue)>,
    pub comments: Vec<Comment>,
}

impl Issue {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// The first value of a field.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(FieldValue::first)
    }

    pub fn summary(&self) -> &str {
        self.value("summary").unwrap_or_default()
    }

    pub fn description(&self) -> Option<&str> {
        self.value("description")
    }

    pub fn project_short_name(&self) -> Option<&str> {
        self.value("projectShortName")
    }

    pub fn number_in_project(&self) -> Option<&str> {
        self.value("numberInProject")
    }

    pub fn reporter_name(&self) -> Option<&str> {
        self.value("reporterName")
    }

    /// Creation timestamp (milliseconds since the epoch, as text).
    pub fn created(&self) -> Option<&str> {
        self.value("created")
    }

    pub fn updated(&self) -> Option<&str> {
        self.value("updated")
    }
}

impl FromXml for Issue {
    fn from_xml(el: &Element) -> Self {
        let mut fields: Vec<(String, FieldValue)> = el
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), FieldValue::Scalar(v.clone())))
            .collect();

        for field in el.children_named("field") {
            let values = field.children_named("value").map(Element::text).collect();
            fields.push((field.attr_or_empty("name"), FieldValue::from_values(values)));
        }

        Self {
            id: el.attr_or_empty("id"),
            fields,
            comments: el.children_named("comment").map(Comment::from_xml).collect(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.summary())
    }
}

/// An issue comment. All attributes are kept so that exported comments can be
/// re-imported unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    pub attributes: Vec<(String, String)>,
}

impl Comment {
    /// A comment for import.
    pub fn new(author: &str, text: &str, created: &str) -> Self {
        Self {
            attributes: vec![
                ("author".to_string(), author.to_string()),
                ("text".to_string(), text.to_string()),
                ("created".to_string(), created.to_string()),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.get("id")
    }

    pub fn author(&self) -> Option<&str> {
        self.get("author")
    }

    pub fn text(&self) -> Option<&str> {
        self.get("text")
    }

    pub fn created(&self) -> Option<&str> {
        self.get("created")
    }
}

impl FromXml for Comment {
    fn from_xml(el: &Element) -> Self {
        Self {
            attributes: el.attributes.clone(),
        }
    }
}

/// An attachment listed under `/issue/<id>/attachment`.
#[derive(Debug, Clone, Default)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    /// Server-relative download URL.
    pub url: String,
    pub author_login: String,
    pub group: String,
    pub created: String,
}

impl FromXml for Attachment {
    fn from_xml(el: &Element) -> Self {
        Self {
            id: el.attr_or_empty("id"),
            name: el.attr_or_empty("name"),
            url: el.attr_or_empty("url"),
            author_login: el.attr_or_empty("authorLogin"),
            group: el.attr_or_empty("group"),
            created: el.attr_or_empty("created"),
        }
    }
}

/// A link between two issues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    pub type_name: String,
    pub source: String,
    pub target: String,
    pub type_outward: String,
    pub type_inward: String,
}

impl FromXml for Link {
    fn from_xml(el: &Element) -> Self {
        Self {
            type_name: el.attr_or_empty("typeName"),
            source: el.attr_or_empty("source"),
            target: el.attr_or_empty("target"),
            type_outward: el.attr_or_empty("typeOutward"),
            type_inward: el.attr_or_empty("typeInward"),
        }
    }
}

/// A kind of issue link.
#[derive(Debug, Clone, Default)]
pub struct IssueLinkType {
    pub name: String,
    pub outward_name: String,
    pub inward_name: String,
    pub directed: bool,
}

impl FromXml for IssueLinkType {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.attr_or_empty("name"),
            outward_name: el.attr_or_empty("outwardName"),
            inward_name: el.attr_or_empty("inwardName"),
            directed: el.attr_bool("directed"),
        }
    }
}

/// A change of one field inside an [`IssueChange`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldChange {
    pub name: String,
    pub old_values: Vec<String>,
    pub new_values: Vec<String>,
}

/// One entry of an issue's change history.
#[derive(Debug, Clone, Default)]
pub struct IssueChange {
    /// Plain fields describing the change (`updaterName`, `updated`, ...).
    pub fields: Vec<(String, FieldValue)>,
    /// Fields whose value changed.
    pub changes: Vec<FieldChange>,
}

impl IssueChange {
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .and_then(|(_, value)| value.first())
    }

    pub fn updater_name(&self) -> Option<&str> {
        self.value("updaterName")
    }

    pub fn updated(&self) -> Option<&str> {
        self.value("updated")
    }
}

impl FromXml for IssueChange {
    fn from_xml(el: &Element) -> Self {
        let mut change = IssueChange::default();
        for field in el.children_named("field") {
            let name = field.attr_or_empty("name");
            if field.child("oldValue").is_some() || field.child("newValue").is_some() {
                change.changes.push(FieldChange {
                    name,
                    old_values: field.children_named("oldValue").map(Element::text).collect(),
                    new_values: field.children_named("newValue").map(Element::text).collect(),
                });
            } else {
                let values = field.children_named("value").map(Element::text).collect();
                change.fields.push((name, FieldValue::from_values(values)));
            }
        }
        change
    }
}

/// An agile board sprint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sprint {
    pub name: String,
    pub start: String,
    pub finish: String,
}

impl FromXml for Sprint {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.attr_or_empty("name"),
            start: el.attr_or_empty("start"),
            finish: el.attr_or_empty("finish"),
        }
    }
}

/// One completion suggestion.
#[derive(Debug, Clone, Default)]
pub struct IntelliSenseItem {
    pub option: String,
    pub description: String,
    pub prefix: String,
    pub suffix: String,
    pub completion_start: Option<u32>,
    pub completion_end: Option<u32>,
    pub caret: Option<u32>,
}

impl FromXml for IntelliSenseItem {
    fn from_xml(el: &Element) -> Self {
        let completion = el.child("completion");
        let position = |name: &str| {
            completion
                .and_then(|c| c.attr(name))
                .and_then(|v| v.parse().ok())
        };
        Self {
            option: el.child_text("option").unwrap_or_default(),
            description: el.child_text("description").unwrap_or_default(),
            prefix: el.child_text("prefix").unwrap_or_default(),
            suffix: el.child_text("suffix").unwrap_or_default(),
            completion_start: position("start"),
            completion_end: position("end"),
            caret: el.child_text("caret").and_then(|v| v.parse().ok()),
        }
    }
}

/// Query or command completion response.
#[derive(Debug, Clone, Default)]
pub struct IntelliSense {
    pub items: Vec<IntelliSenseItem>,
    /// The query as echoed by the server.
    pub query: Option<String>,
}

impl FromXml for IntelliSense {
    fn from_xml(el: &Element) -> Self {
        Self {
            items: super::records_named(el, "item"),
            query: el.descendants_named("query").first().map(|q| q.text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::xml::parse;

    const ISSUE_XML: &[u8] = br#"<issue id="ABC-12" entityId="74-1">
  <field name="projectShortName"><value>ABC</value></field>
  <field name="numberInProject"><value>12</value></field>
  <field name="summary"><value>Login page &lt;broken&gt;</value></field>
  <field name="Fix versions"><value>1.0</value><value>2.0</value></field>
  <field name="created"><value>1267030230127</value></field>
  <comment id="42-1" author="jane" text="Looks bad" created="1267030230200"/>
</issue>"#;

    #[test]
    fn test_issue_from_xml() {
        let issue = Issue::from_xml(&parse(ISSUE_XML).unwrap());

        assert_eq!(issue.id, "ABC-12");
        assert_eq!(issue.summary(), "Login page <broken>");
        assert_eq!(issue.project_short_name(), Some("ABC"));
        assert_eq!(issue.number_in_project(), Some("12"));
        assert_eq!(issue.value("entityId"), Some("74-1"));
        assert_eq!(
            issue.field("Fix versions"),
            Some(&FieldValue::List(vec!["1.0".into(), "2.0".into()]))
        );
        assert_eq!(issue.comments.len(), 1);
        assert_eq!(issue.comments[0].author(), Some("jane"));
        assert_eq!(issue.to_string(), "ABC-12: Login page <broken>");
    }

    #[test]
    fn test_field_value_from_values() {
        assert_eq!(FieldValue::from_values(vec![]), FieldValue::Absent);
        assert_eq!(
            FieldValue::from_values(vec!["a".into()]),
            FieldValue::Scalar("a".into())
        );
        assert_eq!(FieldValue::from(None::<String>), FieldValue::Absent);
    }

    #[test]
    fn test_issue_change_splits_changes() {
        let root = parse(
            br#"<change>
  <field name="updaterName"><value>jane</value></field>
  <field name="State"><oldValue>Open</oldValue><newValue>Fixed</newValue></field>
</change>"#,
        )
        .unwrap();
        let change = IssueChange::from_xml(&root);

        assert_eq!(change.updater_name(), Some("jane"));
        assert_eq!(change.changes.len(), 1);
        assert_eq!(change.changes[0].old_values, vec!["Open".to_string()]);
        assert_eq!(change.changes[0].new_values, vec!["Fixed".to_string()]);
    }

    #[test]
    fn test_intellisense_items() {
        let root = parse(
            br#"<IntelliSense><suggest>
  <item><completion start="0" end="3"/><option>State</option><description>field</description><suffix>: </suffix><caret>7</caret></item>
  <item><option>Stage</option></item>
</suggest><query caret="3">Sta</query></IntelliSense>"#,
        )
        .unwrap();
        let sense = IntelliSense::from_xml(&root);

        assert_eq!(sense.items.len(), 2);
        assert_eq!(sense.items[0].option, "State");
        assert_eq!(sense.items[0].completion_end, Some(3));
        assert_eq!(sense.items[0].caret, Some(7));
        assert_eq!(sense.items[1].completion_start, None);
        assert_eq!(sense.query.as_deref(), Some("Sta"));
    }
}
