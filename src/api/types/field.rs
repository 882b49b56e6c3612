//! Custom field prototypes and their per-project attachments.

use super::FromXml;
use crate::api::xml::Element;

/// A custom field prototype (`/admin/customfield/field/<name>`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomField {
    pub name: String,
    /// Field type, e.g. `enum[1]`, `user[*]`, `string`.
    pub type_name: String,
    pub is_private: bool,
    pub visible_by_default: bool,
    pub auto_attached: bool,
    pub default_bundle: Option<String>,
    pub attach_bundle_policy: Option<String>,
}

impl CustomField {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            visible_by_default: true,
            ..Self::default()
        }
    }

    fn default_param(el: &Element, name: &str) -> Option<String> {
        el.attr(name).map(str::to_string).or_else(|| {
            el.children_named("defaultParam")
                .find(|p| p.attr("name") == Some(name))
                .and_then(|p| p.attr("value"))
                .map(str::to_string)
        })
    }
}

impl FromXml for CustomField {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.attr_or_empty("name"),
            type_name: el.attr_or_empty("type"),
            is_private: el.attr_bool("isPrivate"),
            visible_by_default: el.attr_bool("visibleByDefault"),
            auto_attached: el.attr_bool("autoAttached"),
            default_bundle: Self::default_param(el, "defaultBundle"),
            attach_bundle_policy: Self::default_param(el, "attachBundlePolicy"),
        }
    }
}

/// A custom field attached to a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectCustomField {
    pub name: String,
    pub type_name: String,
    pub empty_text: String,
    pub can_be_empty: bool,
    /// Extra settings such as the bound `bundle`.
    pub params: Vec<(String, String)>,
}

impl ProjectCustomField {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl FromXml for ProjectCustomField {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.attr_or_empty("name"),
            type_name: el.attr_or_empty("type"),
            empty_text: el.attr_or_empty("emptyText"),
            can_be_empty: el.attr_bool("canBeEmpty"),
            params: el
                .children_named("param")
                .map(|p| (p.attr_or_empty("name"), p.attr_or_empty("value")))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::xml::parse;

    #[test]
    fn test_custom_field_default_params() {
        let field = CustomField::from_xml(
            &parse(
                br#"<customFieldPrototype name="Priority" type="enum[1]" isPrivate="false" visibleByDefault="true" autoAttached="true">
  <defaultParam name="defaultBundle" value="Priorities"/>
</customFieldPrototype>"#,
            )
            .unwrap(),
        );
        assert_eq!(field.type_name, "enum[1]");
        assert!(field.auto_attached);
        assert_eq!(field.default_bundle.as_deref(), Some("Priorities"));
        assert_eq!(field.attach_bundle_policy, None);
    }

    #[test]
    fn test_project_custom_field_params() {
        let pcf = ProjectCustomField::from_xml(
            &parse(
                br#"<projectCustomField name="State" type="state[1]" emptyText="No state" canBeEmpty="false"><param name="bundle" value="States"/></projectCustomField>"#,
            )
            .unwrap(),
        );
        assert_eq!(pcf.empty_text, "No state");
        assert_eq!(pcf.param("bundle"), Some("States"));
    }
}
