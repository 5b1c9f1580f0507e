use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    AdminDashboardStats, CreateDishRequest, CreateEventRequest, DishFilter, Event, EventFilter,
    MenuItem, NewOrder, NewUser, Order, OrderFilter, OrderStatus, UpdateDishRequest,
    UpdateEventRequest, User, UserChanges,
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

// Conflict messages shared by every implementation so clients see the same text.
pub const USERNAME_TAKEN: &str = "username already taken";
pub const EMAIL_TAKEN: &str = "email already registered";
pub const EVENT_HAS_ORDERS: &str = "event has orders and cannot be deleted";
pub const USER_HAS_ORDERS: &str = "user has orders and cannot be deleted";
pub const DANGLING_REFERENCE: &str = "referenced record does not exist";

/// RepoError
///
/// Failure of a persistence call. Unique and foreign-key violations are surfaced as
/// `Conflict` so handlers can answer 409 instead of 500.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository Trait
///
/// The persistence contract used by handlers and the auth extractor. `Send + Sync`
/// so the trait object (`Arc<dyn Repository>`) can cross Axum task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: i32) -> RepoResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn update_user(&self, id: i32, changes: UserChanges) -> RepoResult<Option<User>>;
    // Fails with `Conflict` while the user still has orders.
    async fn delete_user(&self, id: i32) -> RepoResult<bool>;

    // --- Events ---
    async fn list_events(&self, filter: &EventFilter) -> RepoResult<Vec<Event>>;
    async fn get_event(&self, id: i32) -> RepoResult<Option<Event>>;
    async fn create_event(&self, req: CreateEventRequest) -> RepoResult<Event>;
    async fn update_event(&self, id: i32, req: UpdateEventRequest) -> RepoResult<Option<Event>>;
    // Removes the event's menu as well. Fails with `Conflict` if orders reference it.
    async fn delete_event(&self, id: i32) -> RepoResult<bool>;

    // --- Menu items (dishes) ---
    async fn list_dishes(&self, filter: &DishFilter) -> RepoResult<Vec<MenuItem>>;
    async fn get_dish(&self, id: i32) -> RepoResult<Option<MenuItem>>;
    // Returns the dishes that exist among `ids`, in no particular order.
    async fn get_dishes(&self, ids: &[i32]) -> RepoResult<Vec<MenuItem>>;
    async fn create_dish(&self, req: CreateDishRequest) -> RepoResult<MenuItem>;
    async fn update_dish(&self, id: i32, req: UpdateDishRequest) -> RepoResult<Option<MenuItem>>;
    async fn delete_dish(&self, id: i32) -> RepoResult<bool>;

    // --- Orders ---
    async fn list_orders(&self, filter: &OrderFilter) -> RepoResult<Vec<Order>>;
    async fn get_order(&self, id: i32) -> RepoResult<Option<Order>>;
    // Inserts the order and its items atomically; nothing is written on failure.
    async fn create_order(&self, order: NewOrder) -> RepoResult<Order>;
    // Compare-and-set: only applies when the current status is still `from`.
    async fn transition_order(
        &self,
        id: i32,
        from: OrderStatus,
        to: OrderStatus,
    ) -> RepoResult<Option<Order>>;
    async fn delete_order(&self, id: i32) -> RepoResult<bool>;

    // --- Dashboard ---
    async fn get_stats(&self) -> RepoResult<AdminDashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
