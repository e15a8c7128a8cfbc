use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::ReturnDocument,
    Client, Collection, Database,
};
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use crate::{
    config::MongoDb,
    core::{SiteError, SiteResult},
    model::{
        timestamp, Analytics, AnalyticsEvent, ContactSubmission, PricingRequest, Submission,
        SubmissionKind, TriageUpdate, ANALYTICS_ID,
    },
};

use super::SubmissionStore;

const ANALYTICS_COLLECTION: &str = "analytics";

/// Document-database store used by the server deployment.
///
/// Submissions live in `contacts` and `pricingrequests`, keyed by their
/// string id. The client is created on first use so that it binds to the
/// serving runtime rather than the one active during startup.
pub struct MongoStore {
    config: MongoDb,
    database: OnceCell<Database>,
}

impl MongoStore {
    pub fn new(config: MongoDb) -> Self {
        Self {
            config,
            database: OnceCell::new(),
        }
    }

    async fn database(&self) -> SiteResult<&Database> {
        self.database
            .get_or_try_init(|| async {
                log::info!("Connecting to MongoDB database '{}'...", self.config.database);
                let client = Client::with_uri_str(&self.config.uri).await?;
                Ok::<_, SiteError>(client.database(&self.config.database))
            })
            .await
    }

    async fn collection<T>(&self, kind: SubmissionKind) -> SiteResult<Collection<T>>
    where
        T: Send + Sync,
    {
        Ok(self.database().await?.collection::<T>(kind.collection()))
    }

    async fn list_typed<T>(&self, kind: SubmissionKind) -> SiteResult<Vec<T>>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let cursor = self
            .collection::<T>(kind)
            .await?
            .find(doc! {})
            .sort(doc! { "created_at": -1, "_id": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_typed<T>(
        &self,
        kind: SubmissionKind,
        id: &str,
        update: &TriageUpdate,
    ) -> SiteResult<Option<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        let mut set = Document::new();
        if let Some(status) = update.status {
            set.insert("status", status.as_str());
        }
        if let Some(priority) = update.priority {
            set.insert("priority", priority.as_str());
        }
        set.insert("updated_at", timestamp::format(&timestamp::now()));

        Ok(self
            .collection::<T>(kind)
            .await?
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?)
    }
}

#[async_trait]
impl SubmissionStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn insert(&self, submission: &Submission) -> SiteResult<()> {
        let kind = submission.kind();
        match submission {
            Submission::Contact(contact) => {
                self.collection::<ContactSubmission>(kind)
                    .await?
                    .insert_one(contact)
                    .await?;
            }
            Submission::Pricing(request) => {
                self.collection::<PricingRequest>(kind)
                    .await?
                    .insert_one(request)
                    .await?;
            }
        }
        log::debug!("Inserted {} {}", kind, submission.id());
        Ok(())
    }

    async fn list(&self, kind: SubmissionKind) -> SiteResult<Vec<Submission>> {
        Ok(match kind {
            SubmissionKind::Contact => self
                .list_typed::<ContactSubmission>(kind)
                .await?
                .into_iter()
                .map(Submission::Contact)
                .collect(),
            SubmissionKind::PricingRequest => self
                .list_typed::<PricingRequest>(kind)
                .await?
                .into_iter()
                .map(Submission::Pricing)
                .collect(),
        })
    }

    async fn update_triage(
        &self,
        kind: SubmissionKind,
        id: &str,
        update: &TriageUpdate,
    ) -> SiteResult<Option<Submission>> {
        Ok(match kind {
            SubmissionKind::Contact => self
                .update_typed::<ContactSubmission>(kind, id, update)
                .await?
                .map(Submission::Contact),
            SubmissionKind::PricingRequest => self
                .update_typed::<PricingRequest>(kind, id, update)
                .await?
                .map(Submission::Pricing),
        })
    }

    async fn record(&self, event: AnalyticsEvent) -> SiteResult<Analytics> {
        let analytics = self
            .database()
            .await?
            .collection::<Analytics>(ANALYTICS_COLLECTION);

        let mut inc = Document::new();
        inc.insert(event.field(), 1_i64);

        analytics
            .find_one_and_update(
                doc! { "_id": ANALYTICS_ID },
                doc! {
                    "$inc": inc,
                    "$set": { "last_updated": timestamp::format(&timestamp::now()) },
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| SiteError::Storage("analytics upsert returned no document".into()))
    }

    async fn analytics(&self) -> SiteResult<Option<Analytics>> {
        Ok(self
            .database()
            .await?
            .collection::<Analytics>(ANALYTICS_COLLECTION)
            .find_one(doc! { "_id": ANALYTICS_ID })
            .await?)
    }
}
