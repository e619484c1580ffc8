use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dpdrbot_core::{
    ConversationLogEntry, ConversationStore, PlanId, UserId, UserProfile, UserSubscription,
};
use dpdrbot_entities::{conversations, usage_stats, users};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
    Set,
};
use tracing::{debug, info};

async fn create_table<E>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute_unprepared(&backend.build(&stmt).to_string())
        .await?;
    Ok(())
}

fn profile_from_model(model: users::Model) -> UserProfile {
    let plan: PlanId = model.plan.parse().unwrap_or_default();
    let subscription = plan.is_paid().then(|| {
        UserSubscription::new(plan, model.plan_expiry.map(|expiry| expiry.and_utc()))
    });

    UserProfile {
        user_id: model.user_id,
        username: model.username,
        subscription,
    }
}

/// sea-orm backed store for user profiles, conversation logs and daily usage.
pub struct DatabaseStore {
    db: DatabaseConnection,
}

impl DatabaseStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        info!("Connecting to database");
        let db = Database::connect(database_url).await?;
        Self::with_connection(db).await
    }

    /// Wrap an existing connection, creating missing tables.
    pub async fn with_connection(db: DatabaseConnection) -> anyhow::Result<Self> {
        create_table(&db, users::Entity).await?;
        create_table(&db, conversations::Entity).await?;
        create_table(&db, usage_stats::Entity).await?;

        info!("DatabaseStore initialized");
        Ok(Self { db })
    }
}

#[async_trait]
impl ConversationStore for DatabaseStore {
    async fn get_user(&self, user_id: UserId) -> anyhow::Result<Option<UserProfile>> {
        let model = users::Entity::find_by_id(user_id).one(&self.db).await?;
        Ok(model.map(profile_from_model))
    }

    async fn upsert_user(&self, profile: &UserProfile) -> anyhow::Result<()> {
        let now = Utc::now().naive_utc();
        let plan = profile
            .subscription
            .map_or(PlanId::Free, |sub| sub.plan)
            .to_string();
        let plan_expiry = profile
            .subscription
            .and_then(|sub| sub.expires_at)
            .map(|expiry| expiry.naive_utc());

        let existing = users::Entity::find_by_id(profile.user_id)
            .one(&self.db)
            .await?;

        if let Some(model) = existing {
            users::Entity::update(users::ActiveModel {
                user_id: Set(profile.user_id),
                username: Set(profile.username.clone()),
                plan: Set(plan),
                plan_expiry: Set(plan_expiry),
                created_at: Set(model.created_at),
                updated_at: Set(now),
            })
            .exec(&self.db)
            .await?;
        } else {
            users::ActiveModel {
                user_id: Set(profile.user_id),
                username: Set(profile.username.clone()),
                plan: Set(plan),
                plan_expiry: Set(plan_expiry),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&self.db)
            .await?;
        }

        debug!("Upserted user {}", profile.user_id);
        Ok(())
    }

    async fn log_conversation(&self, entry: &ConversationLogEntry) -> anyhow::Result<()> {
        conversations::ActiveModel {
            user_id: Set(entry.user_id),
            message: Set(entry.message.clone()),
            response: Set(entry.response.clone()),
            timestamp: Set(entry.timestamp.naive_utc()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        debug!("Logged conversation for user {}", entry.user_id);
        Ok(())
    }

    async fn increment_daily_usage(&self, user_id: UserId, date: NaiveDate) -> anyhow::Result<()> {
        let existing = usage_stats::Entity::find_by_id((user_id, date))
            .one(&self.db)
            .await?;

        if let Some(row) = existing {
            usage_stats::Entity::update(usage_stats::ActiveModel {
                user_id: Set(user_id),
                date: Set(date),
                message_count: Set(row.message_count.saturating_add(1)),
            })
            .exec(&self.db)
            .await?;
        } else {
            usage_stats::ActiveModel {
                user_id: Set(user_id),
                date: Set(date),
                message_count: Set(1),
            }
            .insert(&self.db)
            .await?;
        }

        Ok(())
    }

    async fn daily_usage(&self, user_id: UserId, date: NaiveDate) -> anyhow::Result<u32> {
        let count = usage_stats::Entity::find_by_id((user_id, date))
            .one(&self.db)
            .await?
            .map_or(0, |row| row.message_count);
        Ok(u32::try_from(count).unwrap_or(0))
    }
}
