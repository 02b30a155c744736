use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, DbConn, DbErr, EntityTrait, IntoActiveModel, Iterable, PrimaryKeyToColumn,
    PrimaryKeyTrait,
};

use quire_core::error::RepoError;
use quire_core::ports::BaseRepository;

/// Generic PostgreSQL repository implementation.
pub struct PostgresBaseRepository<E>
where
    E: EntityTrait,
{
    pub(crate) db: DbConn,
    _entity: PhantomData<E>,
}

impl<E> PostgresBaseRepository<E>
where
    E: EntityTrait,
{
    pub fn new(db: DbConn) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }
}

/// Map a SeaORM error, recognising unique and foreign-key violations.
pub(crate) fn repo_err(err: DbErr) -> RepoError {
    let message = err.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("duplicate") || lowered.contains("unique") {
        RepoError::Constraint("Entity already exists".to_string())
    } else if lowered.contains("foreign key") {
        RepoError::Constraint("Referenced entity does not exist".to_string())
    } else if matches!(err, DbErr::Conn(_) | DbErr::ConnectionAcquire(_)) {
        RepoError::Connection(message)
    } else {
        RepoError::Query(message)
    }
}

/// `ON CONFLICT (<primary key>) DO UPDATE SET <every column>`.
pub(crate) fn upsert_on_primary_key<E: EntityTrait>() -> OnConflict {
    OnConflict::columns(E::PrimaryKey::iter().map(|key| key.into_column()))
        .update_columns(E::Column::iter())
        .to_owned()
}

#[async_trait]
impl<E, T, ID> BaseRepository<T, ID> for PostgresBaseRepository<E>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync + Send,
    E::ActiveModel: ActiveModelTrait<Entity = E> + Send + Sync,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = ID>,
    ID: Send + Sync + Into<sea_orm::Value> + Clone + Copy + 'static,
    T: From<E::Model> + Into<E::ActiveModel> + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError> {
        let result = E::find_by_id(id).one(&self.db).await.map_err(repo_err)?;

        Ok(result.map(Into::into))
    }

    async fn save(&self, entity: T) -> Result<T, RepoError> {
        // Ids are assigned in the domain, so a save is an upsert keyed on them.
        let active_model: E::ActiveModel = entity.into();
        let model = E::insert(active_model)
            .on_conflict(upsert_on_primary_key::<E>())
            .exec_with_returning(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(model.into())
    }

    async fn delete(&self, id: ID) -> Result<(), RepoError> {
        let result = E::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(repo_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}
