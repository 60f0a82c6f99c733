// Directory query router
// Classifies free text, dispatches directory calls and enriches results

use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::Arc;

use crate::error::DirectoryError;
use crate::http_client::GraphHttpClient;
use crate::intent::{self, Intent, ENRICHED_TOP, FALLBACK_TOP, LIST_TOP};
use crate::models::directory::{entity_id, Entity, QueryResult, NOT_RECOGNIZED_MESSAGE};
use crate::models::graph::Endpoint;

/// Single entry point from free text to directory data
pub struct DirectoryRouter {
    http: Arc<GraphHttpClient>,

    /// Membership lookups in flight at once during enrichment
    enrichment_concurrency: usize,
}

impl DirectoryRouter {
    pub fn new(http: Arc<GraphHttpClient>, enrichment_concurrency: usize) -> Self {
        Self {
            http,
            enrichment_concurrency: enrichment_concurrency.max(1),
        }
    }

    pub fn configured(&self) -> bool {
        self.http.configured()
    }

    /// Answer a free-text question with directory data or an error value
    pub async fn analyze(&self, text: &str) -> QueryResult {
        if !self.configured() {
            return DirectoryError::NotConfigured.into();
        }

        let intent = intent::classify(text);
        tracing::info!(intent = intent.name(), "Classified directory query");
        self.execute(intent).await
    }

    /// Run the directory calls for an already classified intent
    pub async fn execute(&self, intent: Intent) -> QueryResult {
        match intent {
            Intent::ListUsersWithGroups | Intent::MembershipLookup => {
                self.users_with_groups(ENRICHED_TOP).await
            }
            Intent::ListUsers => self.request(Endpoint::users(LIST_TOP)).await,
            Intent::ListGroups => self.request(Endpoint::groups(LIST_TOP)).await,
            Intent::GroupMembers { group_name } => self.group_members(&group_name).await,
            Intent::UserLookup { email } => self.user_lookup(&email).await,
            Intent::GroupSearch { term } => self.request(Endpoint::search_groups(&term)).await,
            Intent::Fallback => self.overview().await,
        }
    }

    async fn request(&self, endpoint: Endpoint) -> QueryResult {
        match self.http.get(&endpoint).await {
            Ok(body) => QueryResult::from_body(body),
            Err(e) => e.into(),
        }
    }

    async fn users_with_groups(&self, top: u32) -> QueryResult {
        match self.request(Endpoint::users(top)).await {
            QueryResult::Collection { value, next_link } => QueryResult::Collection {
                value: self.with_groups(value).await,
                next_link,
            },
            other => other,
        }
    }

    async fn group_members(&self, group_name: &str) -> QueryResult {
        let groups = self.request(Endpoint::search_groups(group_name)).await;
        if let QueryResult::Error { error, kind } = &groups {
            tracing::warn!(
                group_name = group_name,
                kind = kind.as_str(),
                error = %error,
                "Group search failed, falling back"
            );
        }
        let first_id = groups.entities().first().and_then(entity_id).map(String::from);

        match first_id {
            Some(id) => self.request(Endpoint::group_members(&id)).await,
            None => {
                tracing::info!(group_name = group_name, "No group matched, falling back");
                self.overview().await
            }
        }
    }

    async fn user_lookup(&self, email: &str) -> QueryResult {
        match self.request(Endpoint::user(email)).await {
            QueryResult::Entity(user) if entity_id(&user).is_some() => {
                QueryResult::Entity(self.attach_groups(user).await)
            }
            other => other,
        }
    }

    async fn overview(&self) -> QueryResult {
        let users = self.request(Endpoint::users(FALLBACK_TOP)).await;
        let groups = self.request(Endpoint::groups(FALLBACK_TOP)).await;

        QueryResult::Overview {
            message: NOT_RECOGNIZED_MESSAGE.to_string(),
            users: Box::new(users),
            groups: Box::new(groups),
        }
    }

    /// Attach each user's group memberships as a `groups` array
    ///
    /// Output order matches input order. A failed lookup leaves that user
    /// with an empty `groups` array and does not affect the others.
    pub async fn with_groups(&self, users: Vec<Entity>) -> Vec<Entity> {
        stream::iter(users)
            .map(|user| self.attach_groups(user))
            .buffered(self.enrichment_concurrency)
            .collect()
            .await
    }

    async fn attach_groups(&self, mut user: Entity) -> Entity {
        let groups = match entity_id(&user).map(String::from) {
            Some(id) => match self.http.get(&Endpoint::user_memberships(&id)).await {
                Ok(body) => QueryResult::from_body(body).entities().to_vec(),
                Err(e) => {
                    tracing::warn!(user_id = %id, error = %e, "Failed to get groups for user");
                    Vec::new()
                }
            },
            None => {
                tracing::warn!("User entry has no id, skipping membership lookup");
                Vec::new()
            }
        };

        user.insert(
            "groups".to_string(),
            Value::Array(groups.into_iter().map(Value::Object).collect()),
        );
        user
    }
}
