//! YouTrack domain records.
//!
//! Records are passive snapshots read from XML elements of the legacy REST
//! API. Links between them are identifier strings, resolved through further
//! [`Connection`](super::Connection) calls.

mod bundle;
mod field;
mod issue;
mod project;
mod timetracking;
mod user;

pub use bundle::{
    Bundle, BundleEntry, BundleKind, BundleValue, BuildBundle, BuildValue, EnumBundle, EnumValue,
    OwnedFieldBundle, OwnedFieldValue, StateBundle, StateValue, UserBundle, ValueBundle,
    VersionBundle, VersionValue,
};
pub use field::{CustomField, ProjectCustomField};
pub use issue::{
    Attachment, Comment, FieldChange, FieldValue, IntelliSense, IntelliSenseItem, Issue, IssueChange,
    IssueLinkType, Link, Sprint,
};
pub use project::{Build, Project, Subsystem, Version};
pub use timetracking::{GlobalTimeTrackingSettings, ProjectTimeTrackingSettings, WorkItem, WorkType};
pub use user::{Group, Permission, Role, User, UserRole};

use super::xml::Element;

/// Construction of a record from an XML element.
pub trait FromXml: Sized {
    fn from_xml(el: &Element) -> Self;
}

/// Build one record per direct child element of `root`.
pub fn records<T: FromXml>(root: &Element) -> Vec<T> {
    root.elements().map(T::from_xml).collect()
}

/// Build one record per element named `tag` anywhere below `root`.
pub fn records_named<T: FromXml>(root: &Element, tag: &str) -> Vec<T> {
    root.descendants_named(tag)
        .into_iter()
        .map(T::from_xml)
        .collect()
}

/// Render `true`/`false` the way the API expects in query strings.
pub(crate) fn bool_param(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
