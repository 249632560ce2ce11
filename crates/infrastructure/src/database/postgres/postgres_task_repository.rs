use async_trait::async_trait;
use recur_core::{EngineError, EngineResult};
use recur_domain::{
    entities::{SeriesState, Task},
    repositories::TaskRepository,
};
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::{
    database::mapping::MappingHelpers,
    error_handling::{RepositoryErrorHelpers, RepositoryOperation},
    task_context,
};

const TASK_COLUMNS: &str = "id, name, description, project_id, tags, priority, due_date, completed_at, status, recurrence, recurring_parent_id, series_state, created_at, updated_at";

pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 运行数据库迁移
    pub async fn run_migrations(pool: &PgPool) -> EngineResult<()> {
        debug!("Running PostgreSQL database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                project_id BIGINT,
                tags TEXT[] NOT NULL DEFAULT '{}',
                priority TEXT NOT NULL DEFAULT 'MEDIUM',
                due_date DATE,
                completed_at TIMESTAMPTZ,
                status TEXT NOT NULL DEFAULT 'NOT_STARTED',
                recurrence JSONB,
                recurring_parent_id BIGINT REFERENCES tasks(id) ON DELETE SET NULL,
                series_state TEXT NOT NULL DEFAULT 'ACTIVE',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(pool)
        .await?;

        // 幂等性依赖部分唯一索引 (recurring_parent_id, due_date)
        let indexes = vec![
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_parent_due ON tasks(recurring_parent_id, due_date) WHERE recurring_parent_id IS NOT NULL",
            "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)",
            "CREATE INDEX IF NOT EXISTS idx_tasks_series_state ON tasks(series_state)",
            "CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks(due_date)",
            "CREATE INDEX IF NOT EXISTS idx_tasks_recurring_parent_id ON tasks(recurring_parent_id)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql).execute(pool).await?;
        }

        debug!("Successfully completed PostgreSQL database migrations");
        Ok(())
    }

    fn row_to_task(row: &sqlx::postgres::PgRow) -> EngineResult<Task> {
        use sqlx::Row;

        let tags = MappingHelpers::parse_tags_postgres(row, "tags");
        let recurrence = MappingHelpers::parse_recurrence_postgres(row, "recurrence")?;

        Ok(Task {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            project_id: row.try_get("project_id")?,
            tags,
            priority: row.try_get("priority")?,
            due_date: row.try_get("due_date")?,
            completed_at: row.try_get("completed_at")?,
            status: row.try_get("status")?,
            recurrence,
            recurring_parent_id: row.try_get("recurring_parent_id")?,
            series_state: row.try_get("series_state")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn insert_task(&self, task: &Task) -> Result<sqlx::postgres::PgRow, sqlx::Error> {
        let recurrence_value = MappingHelpers::recurrence_to_value(task.recurrence.as_ref())
            .map_err(|e| sqlx::Error::Encode(e.to_string().into()))?;

        sqlx::query(&format!(
            r#"
            INSERT INTO tasks (name, description, project_id, tags, priority, due_date, completed_at, status, recurrence, recurring_parent_id, series_state)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.project_id)
        .bind(&task.tags)
        .bind(task.priority)
        .bind(task.due_date)
        .bind(task.completed_at)
        .bind(task.status)
        .bind(recurrence_value)
        .bind(task.recurring_parent_id)
        .bind(task.series_state)
        .fetch_one(&self.pool)
        .await
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    #[instrument(skip(self, task), fields(task_name = %task.name))]
    async fn create(&self, task: &Task) -> EngineResult<Task> {
        let context = task_context!(RepositoryOperation::Create, task_name = &task.name);

        let row = self
            .insert_task(task)
            .await
            .map_err(|e| RepositoryErrorHelpers::task_database_error(context.clone(), e))?;

        let created_task = Self::row_to_task(&row)?;
        RepositoryErrorHelpers::log_operation_success(
            context,
            &created_task.entity_description(),
            Some(&format!("ID: {}", created_task.id)),
        );
        Ok(created_task)
    }

    #[instrument(skip(self), fields(task_id = %id))]
    async fn get_by_id(&self, id: i64) -> EngineResult<Option<Task>> {
        let context = task_context!(RepositoryOperation::Read, task_id = id);

        let row = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::task_database_error(context.clone(), e))?;

        match row {
            Some(row) => {
                let task = Self::row_to_task(&row)?;
                debug!("查询任务成功: ID {}, 名称: {}", task.id, task.name);
                Ok(Some(task))
            }
            None => {
                debug!("查询任务不存在: ID {}", id);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, task), fields(
        task_id = %task.id,
        task_name = %task.name,
    ))]
    async fn update(&self, task: &Task) -> EngineResult<()> {
        let context = task_context!(
            RepositoryOperation::Update,
            task_id = task.id,
            task_name = &task.name
        );

        let recurrence_value = MappingHelpers::recurrence_to_value(task.recurrence.as_ref())?;

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET name = $2, description = $3, project_id = $4, tags = $5,
                priority = $6, due_date = $7, completed_at = $8, status = $9,
                recurrence = $10, recurring_parent_id = $11, series_state = $12,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(task.id)
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.project_id)
        .bind(&task.tags)
        .bind(task.priority)
        .bind(task.due_date)
        .bind(task.completed_at)
        .bind(task.status)
        .bind(recurrence_value)
        .bind(task.recurring_parent_id)
        .bind(task.series_state)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::task_database_error(context.clone(), e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryErrorHelpers::task_not_found(context));
        }

        RepositoryErrorHelpers::log_operation_success(
            context,
            &task.entity_description(),
            Some(&format!("状态: {:?}", task.status)),
        );
        Ok(())
    }

    #[instrument(skip(self), fields(task_id = %id))]
    async fn delete(&self, id: i64) -> EngineResult<bool> {
        let context = task_context!(RepositoryOperation::Delete, task_id = id);

        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::task_database_error(context.clone(), e))?;

        if result.rows_affected() == 0 {
            debug!("删除任务不存在: ID {}", id);
            return Ok(false);
        }

        RepositoryErrorHelpers::log_operation_success(context, &format!("任务 (ID: {id})"), None);
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn get_active_recurring(&self) -> EngineResult<Vec<Task>> {
        let context = task_context!(RepositoryOperation::Query)
            .with_additional_info("查询活跃的循环父任务".to_string());

        let rows = sqlx::query(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM tasks
            WHERE recurrence IS NOT NULL
              AND recurring_parent_id IS NULL
              AND series_state = 'ACTIVE'
            ORDER BY id
            "#,
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::task_database_error(context.clone(), e))?;

        let tasks: EngineResult<Vec<Task>> = rows.iter().map(Self::row_to_task).collect();
        let result = tasks?;
        debug!("查询活跃循环任务成功，返回 {} 个任务", result.len());
        Ok(result)
    }

    #[instrument(skip(self), fields(parent_id = %parent_id))]
    async fn get_latest_instance(&self, parent_id: i64) -> EngineResult<Option<Task>> {
        let context = task_context!(RepositoryOperation::Query, task_id = parent_id)
            .with_additional_info("查询最新实例".to_string());

        let row = sqlx::query(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM tasks
            WHERE recurring_parent_id = $1
            ORDER BY due_date DESC
            LIMIT 1
            "#,
        ))
        .bind(parent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::task_database_error(context.clone(), e))?;

        row.as_ref().map(Self::row_to_task).transpose()
    }

    #[instrument(skip(self, instance), fields(
        parent_id = ?instance.recurring_parent_id,
        due_date = ?instance.due_date,
    ))]
    async fn create_instance(&self, instance: &Task) -> EngineResult<Task> {
        let context = task_context!(RepositoryOperation::Create, task_name = &instance.name)
            .with_additional_info(format!(
                "父任务 {:?} 到期 {:?}",
                instance.recurring_parent_id, instance.due_date
            ));

        match self.insert_task(instance).await {
            Ok(row) => {
                let created_task = Self::row_to_task(&row)?;
                RepositoryErrorHelpers::log_operation_success(
                    context,
                    &created_task.entity_description(),
                    Some(&format!("ID: {}", created_task.id)),
                );
                Ok(created_task)
            }
            // 唯一索引冲突说明同一到期日的实例已存在，交由调用方幂等处理
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(EngineError::DuplicateOccurrence {
                    parent_id: instance.recurring_parent_id.unwrap_or(-1),
                    due_date: instance.due_date.unwrap_or_default(),
                })
            }
            Err(e) => Err(RepositoryErrorHelpers::task_database_error(context, e)),
        }
    }

    #[instrument(skip(self), fields(task_id = %task_id, state = %state.as_str()))]
    async fn update_series_state(&self, task_id: i64, state: SeriesState) -> EngineResult<()> {
        let context = task_context!(RepositoryOperation::Update, task_id = task_id)
            .with_additional_info(format!("更新序列状态为 {}", state.as_str()));

        let result = sqlx::query(
            "UPDATE tasks SET series_state = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(task_id)
        .bind(state)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::task_database_error(context.clone(), e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryErrorHelpers::task_not_found(context));
        }

        RepositoryErrorHelpers::log_operation_success(
            context,
            &format!("任务 (ID: {task_id})"),
            Some(&format!("序列状态: {}", state.as_str())),
        );
        Ok(())
    }
}
