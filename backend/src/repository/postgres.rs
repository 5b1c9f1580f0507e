use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};

use super::{
    DANGLING_REFERENCE, EMAIL_TAKEN, EVENT_HAS_ORDERS, RepoError, RepoResult, Repository,
    USER_HAS_ORDERS, USERNAME_TAKEN,
};
use crate::models::{
    AdminDashboardStats, CreateDishRequest, CreateEventRequest, DishFilter, Event, EventFilter,
    MenuItem, NewOrder, NewUser, Order, OrderFilter, OrderStatus, UpdateDishRequest,
    UpdateEventRequest, User, UserChanges,
};

const USER_COLUMNS: &str = "id, username, email, password, role, phone, created_at";
const EVENT_COLUMNS: &str = "id, title, description, image_url, category, status, menu_options, min_guests, max_guests, created_at";
const DISH_COLUMNS: &str = "id, name, description, price, category, event_id, created_at";
const ORDER_COLUMNS: &str = "id, user_id, event_id, date, guest_count, menu_selection, total_amount, status, notes, created_at";

/// Maps a driver error to a `RepoError`. Unique violations are named after the
/// offending column; foreign-key violations carry `fk_message`.
fn classify(err: sqlx::Error, fk_message: &str) -> RepoError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let message = match db.constraint() {
                Some("users_username_key") => USERNAME_TAKEN,
                Some("users_email_key") => EMAIL_TAKEN,
                _ => "record already exists",
            };
            return RepoError::Conflict(message.to_string());
        }
        if db.is_foreign_key_violation() {
            return RepoError::Conflict(fk_message.to_string());
        }
    }
    RepoError::Database(err)
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        classify(err, DANGLING_REFERENCE)
    }
}

/// PostgresRepository
///
/// The production implementation of `Repository`, backed by a pooled Postgres
/// connection. Schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled schema. Idempotent.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn get_user(&self, id: i32) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (username, email, password, role, phone) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(user.username)
            .bind(user.email)
            .bind(user.password)
            .bind(user.role)
            .bind(user.phone)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Partial update through `COALESCE`: `None` keeps the stored value and an
    /// empty phone clears it.
    async fn update_user(&self, id: i32, changes: UserChanges) -> RepoResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET \
                email = COALESCE($2, email), \
                phone = CASE WHEN $3::TEXT IS NULL THEN phone ELSE NULLIF($3, '') END, \
                password = COALESCE($4, password), \
                role = COALESCE($5, role) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.email)
            .bind(changes.phone)
            .bind(changes.password)
            .bind(changes.role)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_user(&self, id: i32) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, USER_HAS_ORDERS))?;
        Ok(res.rows_affected() > 0)
    }

    // --- EVENTS ---

    async fn list_events(&self, filter: &EventFilter) -> RepoResult<Vec<Event>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE 1 = 1"));

        if let Some(category) = &filter.category {
            builder.push(" AND category = ");
            builder.push_bind(category.clone());
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        Ok(builder
            .build_query_as::<Event>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_event(&self, id: i32) -> RepoResult<Option<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_event(&self, req: CreateEventRequest) -> RepoResult<Event> {
        let sql = format!(
            "INSERT INTO events (title, description, image_url, category, status, menu_options, min_guests, max_guests) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {EVENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(req.title)
            .bind(req.description)
            .bind(req.image_url)
            .bind(req.category)
            .bind(req.status)
            .bind(req.menu_options)
            .bind(req.min_guests)
            .bind(req.max_guests)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_event(&self, id: i32, req: UpdateEventRequest) -> RepoResult<Option<Event>> {
        let sql = format!(
            "UPDATE events SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                image_url = CASE WHEN $4::TEXT IS NULL THEN image_url ELSE NULLIF($4, '') END, \
                category = COALESCE($5, category), \
                status = COALESCE($6, status), \
                menu_options = COALESCE($7, menu_options), \
                min_guests = COALESCE($8, min_guests), \
                max_guests = COALESCE($9, max_guests) \
             WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .bind(req.title)
            .bind(req.description)
            .bind(req.image_url)
            .bind(req.category)
            .bind(req.status)
            .bind(req.menu_options)
            .bind(req.min_guests)
            .bind(req.max_guests)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Menu items go with the event (`ON DELETE CASCADE`); orders block it.
    async fn delete_event(&self, id: i32) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, EVENT_HAS_ORDERS))?;
        Ok(res.rows_affected() > 0)
    }

    // --- DISHES ---

    async fn list_dishes(&self, filter: &DishFilter) -> RepoResult<Vec<MenuItem>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {DISH_COLUMNS} FROM menu_items WHERE 1 = 1"));

        if let Some(event_id) = filter.event_id {
            builder.push(" AND event_id = ");
            builder.push_bind(event_id);
        }
        if let Some(category) = &filter.category {
            builder.push(" AND category = ");
            builder.push_bind(category.clone());
        }
        builder.push(" ORDER BY category ASC, name ASC, id ASC");

        Ok(builder
            .build_query_as::<MenuItem>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_dish(&self, id: i32) -> RepoResult<Option<MenuItem>> {
        let sql = format!("SELECT {DISH_COLUMNS} FROM menu_items WHERE id = $1");
        Ok(sqlx::query_as::<_, MenuItem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_dishes(&self, ids: &[i32]) -> RepoResult<Vec<MenuItem>> {
        let sql = format!("SELECT {DISH_COLUMNS} FROM menu_items WHERE id = ANY($1)");
        Ok(sqlx::query_as::<_, MenuItem>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_dish(&self, req: CreateDishRequest) -> RepoResult<MenuItem> {
        let sql = format!(
            "INSERT INTO menu_items (name, description, price, category, event_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {DISH_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, MenuItem>(&sql)
            .bind(req.name)
            .bind(req.description)
            .bind(req.price)
            .bind(req.category)
            .bind(req.event_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_dish(&self, id: i32, req: UpdateDishRequest) -> RepoResult<Option<MenuItem>> {
        let sql = format!(
            "UPDATE menu_items SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                price = COALESCE($4, price), \
                category = COALESCE($5, category) \
             WHERE id = $1 RETURNING {DISH_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, MenuItem>(&sql)
            .bind(id)
            .bind(req.name)
            .bind(req.description)
            .bind(req.price)
            .bind(req.category)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_dish(&self, id: i32) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- ORDERS ---

    async fn list_orders(&self, filter: &OrderFilter) -> RepoResult<Vec<Order>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1 = 1"));

        if let Some(status) = filter.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }
        if let Some(user_id) = filter.user_id {
            builder.push(" AND user_id = ");
            builder.push_bind(user_id);
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        Ok(builder
            .build_query_as::<Order>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_order(&self, id: i32) -> RepoResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        Ok(sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// create_order
    ///
    /// One transaction: the order row, then every order item in a single multi-row
    /// insert. Any error drops `tx` before commit, which rolls everything back.
    async fn create_order(&self, order: NewOrder) -> RepoResult<Order> {
        let mut tx = self.pool.begin().await?;

        let menu_selection: Vec<i32> = order.items.iter().map(|(dish_id, _)| *dish_id).collect();
        let sql = format!(
            "INSERT INTO orders (user_id, event_id, date, guest_count, menu_selection, total_amount, status, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7) RETURNING {ORDER_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Order>(&sql)
            .bind(order.user_id)
            .bind(order.event_id)
            .bind(order.date)
            .bind(order.guest_count)
            .bind(&menu_selection)
            .bind(order.total_amount)
            .bind(order.notes)
            .fetch_one(&mut *tx)
            .await?;

        if !order.items.is_empty() {
            let mut items: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO order_items (order_id, menu_item_id, unit_price) ");
            items.push_values(order.items.iter(), |mut row, (dish_id, unit_price)| {
                row.push_bind(created.id)
                    .push_bind(*dish_id)
                    .push_bind(*unit_price);
            });
            items.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        tracing::debug!(order_id = created.id, items = order.items.len(), "order committed");
        Ok(created)
    }

    async fn transition_order(
        &self,
        id: i32,
        from: OrderStatus,
        to: OrderStatus,
    ) -> RepoResult<Option<Order>> {
        let sql = format!(
            "UPDATE orders SET status = $3 WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_order(&self, id: i32) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- DASHBOARD ---

    async fn get_stats(&self) -> RepoResult<AdminDashboardStats> {
        Ok(sqlx::query_as::<_, AdminDashboardStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM events) AS total_events,
                (SELECT COUNT(*) FROM menu_items) AS total_dishes,
                COUNT(*) AS total_orders,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending_orders,
                COUNT(*) FILTER (WHERE status = 'confirmed') AS confirmed_orders,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed_orders,
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled_orders,
                COALESCE(SUM(total_amount) FILTER (WHERE status IN ('confirmed', 'completed')), 0)::BIGINT AS revenue
            FROM orders
            "#,
        )
        .fetch_one(&self.pool)
        .await?)
    }
}
