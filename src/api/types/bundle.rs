//! Custom field bundles: named sets of legal values for a field type.

use std::fmt;

use super::FromXml;
use crate::api::xml::{escape_attr, escape_text, Element};

/// The bundle flavours the API knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BundleKind {
    Enum,
    Build,
    OwnedField,
    State,
    Version,
    User,
}

impl BundleKind {
    pub const ALL: [BundleKind; 6] = [
        BundleKind::Enum,
        BundleKind::Build,
        BundleKind::OwnedField,
        BundleKind::State,
        BundleKind::Version,
        BundleKind::User,
    ];

    /// Resolve a custom field type such as `enum[*]` or `state[1]`.
    pub fn from_field_type(field_type: &str) -> Option<Self> {
        let base = field_type.split('[').next().unwrap_or_default();
        Self::ALL.into_iter().find(|kind| kind.field_type() == base)
    }

    /// The field type name without cardinality suffix.
    pub fn field_type(self) -> &'static str {
        match self {
            BundleKind::Enum => "enum",
            BundleKind::Build => "build",
            BundleKind::OwnedField => "ownedField",
            BundleKind::State => "state",
            BundleKind::Version => "version",
            BundleKind::User => "user",
        }
    }

    /// Path segment under `/admin/customfield/`.
    pub fn path_segment(self) -> &'static str {
        match self {
            BundleKind::Enum => "bundle",
            BundleKind::Build => "buildBundle",
            BundleKind::OwnedField => "ownedFieldBundle",
            BundleKind::State => "stateBundle",
            BundleKind::Version => "versionBundle",
            BundleKind::User => "userBundle",
        }
    }

    /// Element name of one bundle in the bundle listing.
    pub fn list_tag(self) -> &'static str {
        match self {
            BundleKind::Enum => "enumFieldBundle",
            BundleKind::User => "userFieldBundle",
            other => other.path_segment(),
        }
    }
}

impl fmt::Display for BundleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_type())
    }
}

/// A value to add to or remove from a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleEntry {
    /// A plain value name.
    Name(String),
    /// A value with extra attributes, sent as query parameters.
    Value {
        name: String,
        params: Vec<(String, String)>,
    },
    /// A user in a user bundle.
    User(String),
    /// A group in a user bundle.
    Group(String),
}

impl BundleEntry {
    pub fn name(name: &str) -> Self {
        BundleEntry::Name(name.to_string())
    }

    /// The value name, login or group name.
    pub fn key(&self) -> &str {
        match self {
            BundleEntry::Name(name) | BundleEntry::User(name) | BundleEntry::Group(name) => name,
            BundleEntry::Value { name, .. } => name,
        }
    }
}

/// One value inside a non-user bundle.
pub trait BundleValue: FromXml + Clone {
    const KIND: BundleKind;
    /// Root element of the bundle document.
    const ROOT_TAG: &'static str;
    /// Element of one value.
    const VALUE_TAG: &'static str;

    fn name(&self) -> &str;

    /// Extra attributes, in wire order. Empty ones are skipped on the wire.
    fn attributes(&self) -> Vec<(&'static str, String)>;

    fn to_entry(&self) -> BundleEntry {
        BundleEntry::Value {
            name: self.name().to_string(),
            params: self
                .attributes()
                .into_iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

/// A bundle of plain values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueBundle<V> {
    pub name: String,
    pub values: Vec<V>,
}

impl<V: BundleValue> ValueBundle<V> {
    pub fn new(name: &str, values: Vec<V>) -> Self {
        Self {
            name: name.to_string(),
            values,
        }
    }

    /// Request body for `PUT /admin/customfield/<kind>`.
    pub fn to_xml(&self) -> String {
        let mut xml = format!("<{} name=\"{}\">", V::ROOT_TAG, escape_attr(&self.name));
        for value in &self.values {
            xml.push('<');
            xml.push_str(V::VALUE_TAG);
            for (key, val) in value.attributes() {
                if !val.is_empty() {
                    xml.push_str(&format!(" {}=\"{}\"", key, escape_attr(&val)));
                }
            }
            xml.push_str(&format!(">{}</{}>", escape_text(value.name()), V::VALUE_TAG));
        }
        xml.push_str(&format!("</{}>", V::ROOT_TAG));
        xml
    }
}

impl<V: BundleValue> FromXml for ValueBundle<V> {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.attr_or_empty("name"),
            values: el.children_named(V::VALUE_TAG).map(V::from_xml).collect(),
        }
    }
}

/// An enum value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub description: String,
    pub color_index: String,
}

impl EnumValue {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl FromXml for EnumValue {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.text(),
            description: el.attr_or_empty("description"),
            color_index: el.attr_or_empty("colorIndex"),
        }
    }
}

impl BundleValue for EnumValue {
    const KIND: BundleKind = BundleKind::Enum;
    const ROOT_TAG: &'static str = "enumeration";
    const VALUE_TAG: &'static str = "value";

    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("description", self.description.clone()),
            ("colorIndex", self.color_index.clone()),
        ]
    }
}

/// A build value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildValue {
    pub name: String,
    pub description: String,
    pub assemble_date: String,
}

impl FromXml for BuildValue {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.text(),
            description: el.attr_or_empty("description"),
            assemble_date: el.attr_or_empty("assembleDate"),
        }
    }
}

impl BundleValue for BuildValue {
    const KIND: BundleKind = BundleKind::Build;
    const ROOT_TAG: &'static str = "buildBundle";
    const VALUE_TAG: &'static str = "build";

    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("description", self.description.clone()),
            ("assembleDate", self.assemble_date.clone()),
        ]
    }
}

/// A value owned by a user (e.g. a subsystem).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedFieldValue {
    pub name: String,
    pub description: String,
    pub owner: String,
}

impl FromXml for OwnedFieldValue {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.text(),
            description: el.attr_or_empty("description"),
            owner: el.attr_or_empty("owner"),
        }
    }
}

impl BundleValue for OwnedFieldValue {
    const KIND: BundleKind = BundleKind::OwnedField;
    const ROOT_TAG: &'static str = "ownedFieldBundle";
    const VALUE_TAG: &'static str = "ownedField";

    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("description", self.description.clone()),
            ("owner", self.owner.clone()),
        ]
    }
}

/// A workflow state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateValue {
    pub name: String,
    pub description: String,
    pub is_resolved: bool,
}

impl FromXml for StateValue {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.text(),
            description: el.attr_or_empty("description"),
            is_resolved: el.attr_bool("isResolved"),
        }
    }
}

impl BundleValue for StateValue {
    const KIND: BundleKind = BundleKind::State;
    const ROOT_TAG: &'static str = "stateBundle";
    const VALUE_TAG: &'static str = "state";

    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("description", self.description.clone()),
            ("isResolved", super::bool_param(self.is_resolved).to_string()),
        ]
    }
}

/// A version value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionValue {
    pub name: String,
    pub description: String,
    pub release_date: String,
    pub released: bool,
    pub archived: bool,
}

impl FromXml for VersionValue {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.text(),
            description: el.attr_or_empty("description"),
            release_date: el.attr_or_empty("releaseDate"),
            released: el.attr_bool("released"),
            archived: el.attr_bool("archived"),
        }
    }
}

impl BundleValue for VersionValue {
    const KIND: BundleKind = BundleKind::Version;
    const ROOT_TAG: &'static str = "versions";
    const VALUE_TAG: &'static str = "version";

    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("description", self.description.clone()),
            ("releaseDate", self.release_date.clone()),
            ("released", super::bool_param(self.released).to_string()),
            ("archived", super::bool_param(self.archived).to_string()),
        ]
    }
}

pub type EnumBundle = ValueBundle<EnumValue>;
pub type BuildBundle = ValueBundle<BuildValue>;
pub type OwnedFieldBundle = ValueBundle<OwnedFieldValue>;
pub type StateBundle = ValueBundle<StateValue>;
pub type VersionBundle = ValueBundle<VersionValue>;

/// A bundle of users and groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserBundle {
    pub name: String,
    /// Logins of individual members.
    pub users: Vec<String>,
    /// Names of member groups.
    pub groups: Vec<String>,
}

impl UserBundle {
    pub fn to_xml(&self) -> String {
        let mut xml = format!("<userBundle name=\"{}\">", escape_attr(&self.name));
        for login in &self.users {
            xml.push_str(&format!("<user login=\"{}\"/>", escape_attr(login)));
        }
        for group in &self.groups {
            xml.push_str(&format!("<userGroup name=\"{}\"/>", escape_attr(group)));
        }
        xml.push_str("</userBundle>");
        xml
    }
}

impl FromXml for UserBundle {
    fn from_xml(el: &Element) -> Self {
        Self {
            name: el.attr_or_empty("name"),
            users: el
                .children_named("user")
                .map(|u| u.attr_or_empty("login"))
                .collect(),
            groups: el
                .children_named("userGroup")
                .map(|g| g.attr_or_empty("name"))
                .collect(),
        }
    }
}

/// Any bundle, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bundle {
    Enum(EnumBundle),
    Build(BuildBundle),
    OwnedField(OwnedFieldBundle),
    State(StateBundle),
    Version(VersionBundle),
    User(UserBundle),
}

impl Bundle {
    /// Build the record type matching `kind`.
    pub fn from_xml(kind: BundleKind, el: &Element) -> Self {
        match kind {
            BundleKind::Enum => Bundle::Enum(FromXml::from_xml(el)),
            BundleKind::Build => Bundle::Build(FromXml::from_xml(el)),
            BundleKind::OwnedField => Bundle::OwnedField(FromXml::from_xml(el)),
            BundleKind::State => Bundle::State(FromXml::from_xml(el)),
            BundleKind::Version => Bundle::Version(FromXml::from_xml(el)),
            BundleKind::User => Bundle::User(FromXml::from_xml(el)),
        }
    }

    pub fn kind(&self) -> BundleKind {
        match self {
            Bundle::Enum(_) => EnumValue::KIND,
            Bundle::Build(_) => BuildValue::KIND,
            Bundle::OwnedField(_) => OwnedFieldValue::KIND,
            Bundle::State(_) => StateValue::KIND,
            Bundle::Version(_) => VersionValue::KIND,
            Bundle::User(_) => BundleKind::User,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Bundle::Enum(b) => &b.name,
            Bundle::Build(b) => &b.name,
            Bundle::OwnedField(b) => &b.name,
            Bundle::State(b) => &b.name,
            Bundle::Version(b) => &b.name,
            Bundle::User(b) => &b.name,
        }
    }

    pub fn to_xml(&self) -> String {
        match self {
            Bundle::Enum(b) => b.to_xml(),
            Bundle::Build(b) => b.to_xml(),
            Bundle::OwnedField(b) => b.to_xml(),
            Bundle::State(b) => b.to_xml(),
            Bundle::Version(b) => b.to_xml(),
            Bundle::User(b) => b.to_xml(),
        }
    }

    /// The bundle's members as entries.
    pub fn entries(&self) -> Vec<BundleEntry> {
        fn values<V: BundleValue>(b: &ValueBundle<V>) -> Vec<BundleEntry> {
            b.values.iter().map(BundleValue::to_entry).collect()
        }
        match self {
            Bundle::Enum(b) => values(b),
            Bundle::Build(b) => values(b),
            Bundle::OwnedField(b) => values(b),
            Bundle::State(b) => values(b),
            Bundle::Version(b) => values(b),
            Bundle::User(b) => b
                .users
                .iter()
                .cloned()
                .map(BundleEntry::User)
                .chain(b.groups.iter().cloned().map(BundleEntry::Group))
                .collect(),
        }
    }
}
