//! User, group, role and permission administration.

use tracing::instrument;

use super::client::{query, quote, ApiRequest, Connection};
use super::error::Result;
use super::import::ImportUser;
use super::response::{Parsed, RawResponse};
use super::types::{bool_param, records, FromXml, Group, Permission, Role, User, UserRole};

/// Users are listed in pages of this size.
const USER_PAGE_SIZE: usize = 10;

/// Login the server uses in place of generated system users.
const GUEST_LOGIN: &str = "guest";

fn user_page_path(start: usize, params: &[(&str, &str)]) -> String {
    let mut path = format!("/admin/user/?start={}", start);
    if !params.is_empty() {
        path.push('&');
        path.push_str(&query(params));
    }
    path
}

impl Connection {
    /// Fetch one user. Generated `system_user*` logins resolve to `guest`.
    #[instrument(skip(self))]
    pub async fn get_user(&mut self, login: &str) -> Result<User> {
        let login = if login.starts_with("system_user") {
            GUEST_LOGIN
        } else {
            login
        };
        let root = self.get_element(&format!("/admin/user/{}", quote(login))).await?;
        Ok(User::from_xml(&root))
    }

    /// Create a user through the import endpoint.
    pub async fn create_user(&mut self, user: &User) -> Result<Option<String>> {
        self.import_users(&[ImportUser::from(user)]).await
    }

    pub async fn create_user_detailed(
        &mut self,
        login: &str,
        full_name: &str,
        email: &str,
        jabber: &str,
    ) -> Result<Option<String>> {
        let user = ImportUser {
            login: login.to_string(),
            full_name: Some(full_name.to_string()),
            email: Some(email.to_string()),
            jabber: Some(jabber.to_string()),
        };
        self.import_users(&[user]).await
    }

    /// All users matching `params`, fetched page by page until an empty page.
    #[instrument(skip(self))]
    pub async fn get_users(&mut self, params: &[(&str, &str)]) -> Result<Vec<User>> {
        let mut users = Vec::new();
        let mut start = 0;
        loop {
            let root = self.get_xml(&user_page_path(start, params)).await?;
            let page: Vec<User> = records(&root);
            if page.is_empty() {
                return Ok(users);
            }
            users.extend(page);
            start += USER_PAGE_SIZE;
        }
    }

    /// One page of users starting at `start`.
    #[instrument(skip(self))]
    pub async fn get_users_ten(&mut self, start: usize) -> Result<Vec<User>> {
        let root = self.get_xml(&user_page_path(start, &[])).await?;
        Ok(records(&root))
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&mut self, login: &str) -> Result<RawResponse> {
        self.request(&ApiRequest::delete(format!("/admin/user/{}", quote(login))))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_user_groups(&mut self, login: &str) -> Result<Vec<Group>> {
        let root = self.get_xml(&format!("/admin/user/{}/group", quote(login))).await?;
        Ok(records(&root))
    }

    #[instrument(skip(self))]
    pub async fn set_user_group(&mut self, login: &str, group_name: &str) -> Result<RawResponse> {
        let path = format!("/admin/user/{}/group/{}", quote(login), quote(group_name));
        self.request(&ApiRequest::post(path)).await
    }

    #[instrument(skip(self))]
    pub async fn get_group(&mut self, name: &str) -> Result<Group> {
        let root = self.get_element(&format!("/admin/group/{}", quote(name))).await?;
        Ok(Group::from_xml(&root))
    }

    #[instrument(skip(self))]
    pub async fn get_groups(&mut self) -> Result<Vec<Group>> {
        let root = self.get_xml("/admin/group").await?;
        Ok(records(&root))
    }

    #[instrument(skip(self))]
    pub async fn delete_group(&mut self, name: &str) -> Result<RawResponse> {
        self.request(&ApiRequest::delete(format!("/admin/group/{}", quote(name))))
            .await
    }

    #[instrument(skip(self, group), fields(group = %group.name))]
    pub async fn create_group(&mut self, group: &Group) -> Result<Parsed> {
        let path = format!(
            "/admin/group/{}?autoJoin={}",
            quote(&group.name),
            bool_param(group.auto_join)
        );
        self.put(&path).await
    }

    /// Grant `role` (optionally scoped to projects) to every member of `group`.
    #[instrument(skip(self, group, role), fields(group = %group.name, role = %role.name))]
    pub async fn add_user_role_to_group(&mut self, group: &Group, role: &UserRole) -> Result<RawResponse> {
        let path = format!("/admin/group/{}/role/{}", quote(&group.name), quote(&role.name));
        self.request(&ApiRequest::put(path).body(role.to_xml())).await
    }

    #[instrument(skip(self))]
    pub async fn get_role(&mut self, name: &str) -> Result<Role> {
        let root = self.get_element(&format!("/admin/role/{}", quote(name))).await?;
        Ok(Role::from_xml(&root))
    }

    #[instrument(skip(self))]
    pub async fn get_roles(&mut self) -> Result<Vec<Role>> {
        let root = self.get_xml("/admin/role").await?;
        Ok(records(&root))
    }

    #[instrument(skip(self))]
    pub async fn get_group_roles(&mut self, group_name: &str) -> Result<Vec<UserRole>> {
        let root = self.get_xml(&format!("/admin/group/{}/role", quote(group_name))).await?;
        Ok(records(&root))
    }

    #[instrument(skip(self, role), fields(role = %role.name))]
    pub async fn create_role(&mut self, role: &Role) -> Result<Parsed> {
        let path = format!(
            "/admin/role/{}?description={}",
            quote(&role.name),
            quote(&role.description)
        );
        self.put(&path).await
    }

    /// Rename a role and replace its description.
    #[instrument(skip(self, role), fields(role = %role.name))]
    pub async fn change_role(
        &mut self,
        role: &Role,
        new_name: &str,
        new_description: &str,
    ) -> Result<RawResponse> {
        let path = format!(
            "/admin/role/{}?newName={}&description={}",
            quote(&role.name),
            quote(new_name),
            quote(new_description)
        );
        self.request(&ApiRequest::post(path)).await
    }

    #[instrument(skip(self, role, permission), fields(role = %role.name, permission = %permission.name))]
    pub async fn add_permission_to_role(&mut self, role: &Role, permission: &Permission) -> Result<RawResponse> {
        let path = format!(
            "/admin/role/{}/permission/{}",
            quote(&role.name),
            quote(&permission.name)
        );
        self.request(&ApiRequest::post(path)).await
    }

    #[instrument(skip(self, role), fields(role = %role.name))]
    pub async fn get_role_permissions(&mut self, role: &Role) -> Result<Vec<Permission>> {
        let root = self
            .get_xml(&format!("/admin/role/{}/permission", quote(&role.name)))
            .await?;
        Ok(records(&root))
    }

    #[instrument(skip(self))]
    pub async fn get_permissions(&mut self) -> Result<Vec<Permission>> {
        let root = self.get_xml("/admin/permission").await?;
        Ok(records(&root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_page_path_without_params() {
        assert_eq!(user_page_path(20, &[]), "/admin/user/?start=20");
    }

    #[test]
    fn test_user_page_path_with_params() {
        assert_eq!(
            user_page_path(0, &[("q", "jane doe"), ("group", "dev")]),
            "/admin/user/?start=0&q=jane%20doe&group=dev"
        );
    }
}
