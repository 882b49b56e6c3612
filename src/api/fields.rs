//! Custom fields, project custom fields and value bundles.

use reqwest::StatusCode;
use tracing::{debug, instrument};

use super::client::{query, quote, ApiRequest, Connection};
use super::error::{ApiError, Result};
use super::response::{Parsed, RawResponse};
use super::types::{
    bool_param, Bundle, BundleEntry, BundleKind, CustomField, EnumBundle, EnumValue, FromXml,
    ProjectCustomField, ValueBundle,
};

fn bundle_kind(field_type: &str) -> Result<BundleKind> {
    BundleKind::from_field_type(field_type)
        .ok_or_else(|| ApiError::InvalidInput(format!("no bundle for field type '{}'", field_type)))
}

fn bundle_path(kind: BundleKind, name: &str) -> String {
    format!("/admin/customfield/{}/{}", kind.path_segment(), quote(name))
}

/// Path that adds `entry` to the bundle `kind`/`name`.
fn add_value_path(kind: BundleKind, name: &str, entry: &BundleEntry) -> String {
    let mut path = format!("{}/", bundle_path(kind, name));

    if kind == BundleKind::User {
        match entry {
            BundleEntry::Group(group) => path.push_str(&format!("group/{}/", quote(group))),
            other => path.push_str(&format!("individual/{}/", quote(other.key()))),
        }
        return path;
    }

    path.push_str(&quote(entry.key()));
    if let BundleEntry::Value { params, .. } = entry {
        let pairs: Vec<(&str, &str)> = params
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if !pairs.is_empty() {
            path.push('?');
            path.push_str(&query(&pairs));
        }
    }
    path
}

/// Path that removes `entry` from the bundle `kind`/`name`.
fn remove_value_path(kind: BundleKind, name: &str, entry: &BundleEntry) -> String {
    let base = bundle_path(kind, name);
    match (kind, entry) {
        (BundleKind::User, BundleEntry::Group(group)) => format!("{}/group/{}", base, quote(group)),
        (BundleKind::User, other) => format!("{}/individual/{}", base, quote(other.key())),
        (_, other) => format!("{}/{}", base, quote(other.key())),
    }
}

impl Connection {
    #[instrument(skip(self))]
    pub async fn get_custom_field(&mut self, name: &str) -> Result<CustomField> {
        let root = self
            .get_element(&format!("/admin/customfield/field/{}", quote(name)))
            .await?;
        Ok(CustomField::from_xml(&root))
    }

    /// Every custom field prototype, each fetched in full.
    #[instrument(skip(self))]
    pub async fn get_custom_fields(&mut self) -> Result<Vec<CustomField>> {
        let root = self.get_xml("/admin/customfield/field").await?;
        let names: Vec<String> = root.elements().map(|e| e.attr_or_empty("name")).collect();

        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            fields.push(self.get_custom_field(&name).await?);
        }
        Ok(fields)
    }

    pub async fn create_custom_field(&mut self, field: &CustomField) -> Result<()> {
        let mut extra = Vec::new();
        if let Some(bundle) = &field.default_bundle {
            extra.push(("defaultBundle", bundle.as_str()));
        }
        if let Some(policy) = &field.attach_bundle_policy {
            extra.push(("attachBundlePolicy", policy.as_str()));
        }
        self.create_custom_field_detailed(
            &field.name,
            &field.type_name,
            field.is_private,
            field.visible_by_default,
            field.auto_attached,
            &extra,
        )
        .await
    }

    pub async fn create_custom_fields(&mut self, fields: &[CustomField]) -> Result<()> {
        for field in fields {
            self.create_custom_field(field).await?;
        }
        Ok(())
    }

    #[instrument(skip(self, extra))]
    pub async fn create_custom_field_detailed(
        &mut self,
        name: &str,
        type_name: &str,
        is_private: bool,
        default_visibility: bool,
        auto_attached: bool,
        extra: &[(&str, &str)],
    ) -> Result<()> {
        let mut pairs = vec![
            ("type", type_name),
            ("isPrivate", bool_param(is_private)),
            ("defaultVisibility", bool_param(default_visibility)),
            ("autoAttached", bool_param(auto_attached)),
        ];
        pairs.extend_from_slice(extra);

        let path = format!("/admin/customfield/field/{}?{}", quote(name), query(&pairs));
        self.put(&path).await?;
        debug!("Created custom field {}", name);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_project_custom_field(&mut self, project_id: &str, name: &str) -> Result<ProjectCustomField> {
        let path = format!("/admin/project/{}/customfield/{}", quote(project_id), quote(name));
        let root = self.get_element(&path).await?;
        Ok(ProjectCustomField::from_xml(&root))
    }

    /// Every custom field of a project, each fetched in full.
    #[instrument(skip(self))]
    pub async fn get_project_custom_fields(&mut self, project_id: &str) -> Result<Vec<ProjectCustomField>> {
        let root = self
            .get_xml(&format!("/admin/project/{}/customfield", quote(project_id)))
            .await?;
        let names: Vec<String> = root
            .descendants_named("projectCustomField")
            .into_iter()
            .map(|e| e.attr_or_empty("name"))
            .collect();

        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            fields.push(self.get_project_custom_field(project_id, &name).await?);
        }
        Ok(fields)
    }

    pub async fn create_project_custom_field(&mut self, project_id: &str, field: &ProjectCustomField) -> Result<Parsed> {
        self.create_project_custom_field_detailed(project_id, &field.name, &field.empty_text, &field.params)
            .await
    }

    /// Attach a custom field to a project. A blank `empty_text` becomes
    /// `No <name>`.
    #[instrument(skip(self, params))]
    pub async fn create_project_custom_field_detailed(
        &mut self,
        project_id: &str,
        name: &str,
        empty_text: &str,
        params: &[(String, String)],
    ) -> Result<Parsed> {
        let empty_text = if empty_text.trim().is_empty() {
            format!("No {}", name)
        } else {
            empty_text.to_string()
        };

        let mut pairs = vec![("emptyFieldText", empty_text.as_str())];
        pairs.extend(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let path = format!(
            "/admin/project/{}/customfield/{}?{}",
            quote(project_id),
            quote(name),
            query(&pairs)
        );
        self.put(&path).await
    }

    #[instrument(skip(self))]
    pub async fn delete_project_custom_field(&mut self, project_id: &str, name: &str) -> Result<()> {
        let path = format!("/admin/project/{}/customfield/{}", quote(project_id), quote(name));
        self.request(&ApiRequest::delete(path)).await?;
        Ok(())
    }

    /// Every bundle for a field type such as `enum[*]` or `user`.
    #[instrument(skip(self))]
    pub async fn get_all_bundles(&mut self, field_type: &str) -> Result<Vec<Bundle>> {
        let kind = bundle_kind(field_type)?;
        let root = self
            .get_element(&format!("/admin/customfield/{}", kind.path_segment()))
            .await?;
        let names: Vec<String> = root
            .descendants_named(kind.list_tag())
            .into_iter()
            .map(|e| e.attr_or_empty("name"))
            .collect();

        let mut bundles = Vec::with_capacity(names.len());
        for name in names {
            bundles.push(self.get_bundle_of_kind(kind, &name).await?);
        }
        Ok(bundles)
    }

    /// One bundle for a field type; the record type follows the kind.
    #[instrument(skip(self))]
    pub async fn get_bundle(&mut self, field_type: &str, name: &str) -> Result<Bundle> {
        let kind = bundle_kind(field_type)?;
        self.get_bundle_of_kind(kind, name).await
    }

    pub async fn get_bundle_of_kind(&mut self, kind: BundleKind, name: &str) -> Result<Bundle> {
        let root = self.get_element(&bundle_path(kind, name)).await?;
        Ok(Bundle::from_xml(kind, &root))
    }

    /// Rename a bundle. The server answers with a redirect on success.
    #[instrument(skip(self, bundle), fields(bundle = %bundle.name()))]
    pub async fn rename_bundle(&mut self, bundle: &Bundle, new_name: &str) -> Result<RawResponse> {
        let path = format!(
            "{}?{}",
            bundle_path(bundle.kind(), bundle.name()),
            query(&[("newName", new_name)])
        );
        let request = ApiRequest::post(path).ignore_status(StatusCode::MOVED_PERMANENTLY);
        self.request(&request).await
    }

    #[instrument(skip(self, bundle), fields(bundle = %bundle.name()))]
    pub async fn create_bundle(&mut self, bundle: &Bundle) -> Result<Parsed> {
        self.put_bundle(bundle.kind(), bundle.to_xml()).await
    }

    async fn put_bundle(&mut self, kind: BundleKind, xml: String) -> Result<Parsed> {
        let request = ApiRequest::put(format!("/admin/customfield/{}", kind.path_segment()))
            .body(xml)
            .ignore_status(StatusCode::BAD_REQUEST);
        self.request_parsed(request).await
    }

    #[instrument(skip(self, bundle), fields(bundle = %bundle.name()))]
    pub async fn delete_bundle(&mut self, bundle: &Bundle) -> Result<RawResponse> {
        let path = bundle_path(bundle.kind(), bundle.name());
        self.request(&ApiRequest::delete(path)).await
    }

    /// Add a value, user or group to a bundle.
    #[instrument(skip(self, bundle), fields(bundle = %bundle.name()))]
    pub async fn add_value_to_bundle(&mut self, bundle: &Bundle, entry: &BundleEntry) -> Result<Parsed> {
        self.put(&add_value_path(bundle.kind(), bundle.name(), entry))
            .await
    }

    #[instrument(skip(self, bundle), fields(bundle = %bundle.name()))]
    pub async fn remove_value_from_bundle(&mut self, bundle: &Bundle, entry: &BundleEntry) -> Result<RawResponse> {
        let path = remove_value_path(bundle.kind(), bundle.name(), entry);
        let request = ApiRequest::delete(path).ignore_status(StatusCode::NO_CONTENT);
        self.request(&request).await
    }

    #[instrument(skip(self))]
    pub async fn get_enum_bundle(&mut self, name: &str) -> Result<EnumBundle> {
        let root = self.get_element(&bundle_path(BundleKind::Enum, name)).await?;
        Ok(EnumBundle::from_xml(&root))
    }

    pub async fn create_enum_bundle(&mut self, bundle: &EnumBundle) -> Result<Parsed> {
        self.put_bundle(BundleKind::Enum, bundle.to_xml()).await
    }

    /// Delete an enum bundle by name.
    #[instrument(skip(self))]
    pub async fn delete_enum_bundle(&mut self, name: &str) -> Result<RawResponse> {
        let bundle = self.get_enum_bundle(name).await?;
        self.delete_bundle(&Bundle::Enum(bundle)).await
    }

    #[instrument(skip(self, values))]
    pub async fn create_enum_bundle_detailed(&mut self, name: &str, values: &[&str]) -> Result<Parsed> {
        let bundle = ValueBundle::new(name, values.iter().map(|v| EnumValue::new(v)).collect());
        self.create_enum_bundle(&bundle).await
    }

    pub async fn add_value_to_enum_bundle(&mut self, name: &str, value: &str) -> Result<Parsed> {
        let bundle = Bundle::Enum(self.get_enum_bundle(name).await?);
        self.add_value_to_bundle(&bundle, &BundleEntry::name(value))
            .await
    }

    /// Add several values; the responses are joined with `, `.
    pub async fn add_values_to_enum_bundle(&mut self, name: &str, values: &[&str]) -> Result<String> {
        let mut results = Vec::with_capacity(values.len());
        for value in values {
            results.push(self.add_value_to_enum_bundle(name, value).await?.into_text());
        }
        Ok(results.join(", "))
    }
}
