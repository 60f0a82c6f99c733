// Graph v1.0 endpoints used by the router

/// Projection for user entities
pub const USER_FIELDS: &str = "id,displayName,mail,userPrincipalName,accountEnabled";

/// Projection for group entities
pub const GROUP_FIELDS: &str = "id,displayName,description,mail";

/// Projection for `/memberOf` entries
pub const MEMBERSHIP_FIELDS: &str = "id,displayName,description";

/// Projection for `/members` entries
pub const MEMBER_FIELDS: &str = "id,displayName,mail,userPrincipalName";

/// A directory endpoint: path below `/v1.0` plus OData query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: String,
    pub query: Vec<(&'static str, String)>,
}

impl Endpoint {
    fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.query.push((name, value.into()));
        self
    }

    pub fn users(top: u32) -> Self {
        Self::new("/users")
            .param("$top", top.to_string())
            .param("$select", USER_FIELDS)
    }

    pub fn user(id_or_upn: &str) -> Self {
        Self::new(format!("/users/{}", id_or_upn)).param("$select", USER_FIELDS)
    }

    pub fn user_memberships(user_id: &str) -> Self {
        Self::new(format!("/users/{}/memberOf", user_id)).param("$select", MEMBERSHIP_FIELDS)
    }


    pub fn groups(top: u32) -> Self {
        Self::new("/groups")
            .param("$top", top.to_string())
            .param("$select", GROUP_FIELDS)
    }

    pub fn group_members(group_id: &str) -> Self {
        Self::new(format!("/groups/{}/members", group_id)).param("$select", MEMBER_FIELDS)
    }

    pub fn search_groups(prefix: &str) -> Self {
        Self::new("/groups")
            .param(
                "$filter",
                format!("startswith(displayName,{})", odata_literal(prefix)),
            )
            .param("$select", GROUP_FIELDS)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)?;
        for (i, (name, value)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, name, value)?;
        }
        Ok(())
    }
}

/// Quote a string as an OData literal (single quotes doubled)
fn odata_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
