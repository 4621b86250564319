//! GraphQL resolver layer
//!
//! Wire names follow the persisted columns (`user_id`, `suggested_part`, ...)
//! rather than GraphQL's usual camelCase. Root fields are nullable, so one
//! failing field leaves the others in `data`.

use async_graphql::{Context, EmptySubscription, Error as GqlError, Object, Result, Schema, ID};
use crate::classify::{Classification, ClassificationService};
use crate::model::{Message, Part};
use crate::storage::SqliteStore;

pub type PartmatchSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the executable schema with the store and classifier as shared data
pub fn build_schema(store: SqliteStore, classifier: ClassificationService) -> PartmatchSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(store)
        .data(classifier)
        .finish()
}

/// SDL of the schema; needs no store or classifier
pub fn schema_sdl() -> String {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .finish()
        .sdl()
}

/// Log a failed operation and turn it into a client-facing error
fn report(operation: &'static str) -> impl FnOnce(crate::Error) -> GqlError {
    move |e| {
        tracing::error!(operation, "{}", e);
        GqlError::new(e.to_string())
    }
}

#[Object]
impl Part {
    async fn id(&self) -> ID {
        ID(self.id.to_string())
    }

    async fn name(&self) -> &str {
        &self.name
    }

    async fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[graphql(name = "created_at")]
    async fn created_at(&self) -> &str {
        &self.created_at
    }
}

#[Object]
impl Message {
    async fn id(&self) -> ID {
        ID(self.id.to_string())
    }

    #[graphql(name = "user_id")]
    async fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn text(&self) -> &str {
        &self.text
    }

    #[graphql(name = "part_id")]
    async fn part_id(&self) -> Option<ID> {
        self.part_id.map(|id| ID(id.to_string()))
    }

    /// Raw model answer, not necessarily a part name
    #[graphql(name = "suggested_part")]
    async fn suggested_part(&self) -> Option<&str> {
        self.suggested_part.as_deref()
    }

    /// Name of the linked part, if any
    #[graphql(name = "part_name")]
    async fn part_name(&self) -> Option<&str> {
        self.part_name.as_deref()
    }

    #[graphql(name = "created_at")]
    async fn created_at(&self) -> &str {
        &self.created_at
    }
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// All parts, newest first
    async fn parts(&self, ctx: &Context<'_>) -> Result<Option<Vec<Option<Part>>>> {
        let store = ctx.data::<SqliteStore>()?;
        let parts = store
            .run(|store| store.list_parts())
            .await
            .map_err(report("parts"))?;
        Ok(Some(parts.into_iter().map(Some).collect()))
    }

    /// All messages, newest first
    async fn messages(&self, ctx: &Context<'_>) -> Result<Option<Vec<Option<Message>>>> {
        let store = ctx.data::<SqliteStore>()?;
        let messages = store
            .run(|store| store.list_messages())
            .await
            .map_err(report("messages"))?;
        Ok(Some(messages.into_iter().map(Some).collect()))
    }

    /// A single part by id
    async fn part(&self, ctx: &Context<'_>, id: ID) -> Result<Option<Part>> {
        let id: i64 = id
            .parse()
            .map_err(|_| GqlError::new(format!("invalid part id: {}", id.as_str())))?;
        let store = ctx.data::<SqliteStore>()?;
        let part = store
            .run(move |store| store.get_part(id))
            .await
            .map_err(report("part"))?;
        Ok(part)
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn add_part(
        &self,
        ctx: &Context<'_>,
        name: String,
        description: Option<String>,
    ) -> Result<Option<Part>> {
        let store = ctx.data::<SqliteStore>()?;
        let part = store
            .run(move |store| store.insert_part(&name, description.as_deref()))
            .await
            .map_err(report("addPart"))?;

        tracing::info!(id = part.id, name = %part.name, "Added part");
        Ok(Some(part))
    }

    /// Classify the message text, then store it with the suggested part.
    ///
    /// Nothing is written when classification fails. A failed write after a
    /// successful classification discards the label.
    async fn add_message(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "user_id")] user_id: String,
        text: String,
    ) -> Result<Option<Message>> {
        let classifier = ctx.data::<ClassificationService>()?;
        let store = ctx.data::<SqliteStore>()?;

        let label = classifier
            .classify(&text)
            .await
            .map_err(report("addMessage"))?;
        tracing::info!(suggested_part = %label, "Classified message");

        let (message, classification) = store
            .run(move |store| store.insert_message(&user_id, &text, &label))
            .await
            .map_err(report("addMessage"))?;

        match classification {
            Classification::MatchedPart { part_id, .. } => {
                tracing::debug!(id = message.id, part_id, "Linked message to part");
            }
            Classification::UnmatchedLabel(label) => {
                tracing::debug!(id = message.id, %label, "Suggested part matches no catalog entry");
            }
        }
        Ok(Some(message))
    }
}
