use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;

// --- Enumerations (Mapped to Postgres enum types) ---

/// Role
///
/// The RBAC tier of a user. Stored in the `user_role` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    Client,
    Admin,
}

/// EventStatus
///
/// Only `active` events accept new orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum EventStatus {
    #[default]
    Active,
    Inactive,
}

/// OrderStatus
///
/// Lifecycle of an order. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Canonical account row from the `users` table. Carries the password hash, so it is
/// never serialized directly; handlers convert it into a `UserProfile`.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    // scrypt output in `hash.salt` form.
    pub password: String,
    pub role: Role,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// UserProfile
///
/// Public view of a user returned by every user-facing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfile {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            phone: user.phone,
            created_at: user.created_at,
        }
    }
}

/// Event
///
/// A cateable event from the `events` table (wedding, corporate lunch, ...).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Event {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: String,
    pub status: EventStatus,
    // Free-text labels shown to the client (e.g. "buffet", "plated").
    pub menu_options: Vec<String>,
    pub min_guests: i32,
    pub max_guests: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// MenuItem
///
/// A dish offered for exactly one event. Prices are integer cents.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MenuItem {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub category: String,
    pub event_id: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Order
///
/// A client's booking for an event. `menu_selection` holds dish ids; the priced lines
/// live in `order_items` and are written in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Order {
    pub id: i32,
    pub user_id: i32,
    pub event_id: i32,
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub guest_count: i32,
    pub menu_selection: Vec<i32>,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub notes: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Insert payload for an order, assembled by the handler after pricing.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i32,
    pub event_id: i32,
    pub date: NaiveDate,
    pub guest_count: i32,
    pub notes: Option<String>,
    // (menu_item_id, unit_price) snapshot, one per selected dish.
    pub items: Vec<(i32, i64)>,
    pub total_amount: i64,
}

/// Insert payload for a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub phone: Option<String>,
}

/// Column changes for a user update. `None` leaves the column untouched; an empty
/// `phone` clears it.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Public self-registration (POST /api/register). Always yields a `client`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// CreateUserRequest
///
/// Admin-side account creation (POST /api/users); the role is chosen explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

/// UpdateUserRequest
///
/// Partial update. Admins may send `role`; the self-service endpoint rejects it.
/// Omitted fields are left as they are. Send `"phone": ""` to remove a stored number.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }
}

/// CreateEventRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub category: String,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub menu_options: Vec<String>,
    pub min_guests: i32,
    pub max_guests: i32,
}

impl CreateEventRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require_non_empty("title", &self.title)?;
        require_non_empty("category", &self.category)?;
        validate_guest_bounds(self.min_guests, self.max_guests)
    }
}

/// UpdateEventRequest
///
/// Partial update payload (PUT /api/events/{id}). Only provided fields change;
/// an empty `imageUrl` removes the stored image.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateEventRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_guests: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_guests: Option<i32>,
}

impl UpdateEventRequest {
    /// Validates the update against the row it will be applied to, so guest bounds
    /// stay consistent when only one side changes.
    pub fn validate_against(&self, current: &Event) -> Result<(), ApiError> {
        if let Some(title) = &self.title {
            require_non_empty("title", title)?;
        }
        if let Some(category) = &self.category {
            require_non_empty("category", category)?;
        }
        validate_guest_bounds(
            self.min_guests.unwrap_or(current.min_guests),
            self.max_guests.unwrap_or(current.max_guests),
        )
    }
}

/// CreateDishRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateDishRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    pub category: String,
    pub event_id: i32,
}

impl CreateDishRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require_non_empty("name", &self.name)?;
        require_non_empty("category", &self.category)?;
        validate_price(self.price)
    }
}

/// UpdateDishRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateDishRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl UpdateDishRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(category) = &self.category {
            require_non_empty("category", category)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }
}

/// CreateOrderRequest
///
/// Client booking (POST /api/orders). The total is computed server-side.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateOrderRequest {
    pub event_id: i32,
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub guest_count: i32,
    pub menu_selection: Vec<i32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateOrderRequest {
    /// Shape checks that need no database lookups.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.guest_count < 1 {
            return Err(ApiError::Validation("guestCount must be at least 1".into()));
        }
        if self.menu_selection.is_empty() {
            return Err(ApiError::Validation("menuSelection must not be empty".into()));
        }
        let mut seen = self.menu_selection.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != self.menu_selection.len() {
            return Err(ApiError::Validation("menuSelection contains duplicate dishes".into()));
        }
        Ok(())
    }
}

/// UpdateOrderStatusRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

// --- Query Filters ---

/// EventFilter (GET /api/events)
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventFilter {
    pub category: Option<String>,
    pub status: Option<EventStatus>,
}

/// DishFilter (GET /api/dishes)
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DishFilter {
    pub event_id: Option<i32>,
    pub category: Option<String>,
}

/// OrderFilter (GET /api/orders)
///
/// `user_id` is forced to the caller's id for non-admins.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<i32>,
}

// --- Dashboard Schemas (Output) ---

/// AdminDashboardStats
///
/// Output schema for GET /api/admin/stats. Revenue counts confirmed and completed orders.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub total_events: i64,
    pub total_dishes: i64,
    pub total_orders: i64,
    pub pending_orders: i64,
    pub confirmed_orders: i64,
    pub completed_orders: i64,
    pub cancelled_orders: i64,
    pub revenue: i64,
}

// --- Validation helpers ---

fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.trim().chars().count() < 3 {
        return Err(ApiError::Validation("username must be at least 3 characters".into()));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ApiError::Validation("email is not valid".into())),
    }
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < 6 {
        return Err(ApiError::Validation("password must be at least 6 characters".into()));
    }
    Ok(())
}

fn validate_guest_bounds(min: i32, max: i32) -> Result<(), ApiError> {
    if min < 1 {
        return Err(ApiError::Validation("minGuests must be at least 1".into()));
    }
    if max < min {
        return Err(ApiError::Validation("maxGuests must not be below minGuests".into()));
    }
    Ok(())
}

/// Highest accepted dish price in minor units (ten million per portion).
pub const MAX_PRICE: i64 = 1_000_000_000;

fn validate_price(price: i64) -> Result<(), ApiError> {
    if price < 0 {
        return Err(ApiError::Validation("price must not be negative".into()));
    }
    if price > MAX_PRICE {
        return Err(ApiError::Validation(format!("price must not exceed {MAX_PRICE}")));
    }
    Ok(())
}

/// Total for an order: every guest gets one portion of each selected dish.
pub fn order_total(guest_count: i32, dishes: &[MenuItem]) -> Result<i64, ApiError> {
    dishes
        .iter()
        .try_fold(0i64, |acc, dish| acc.checked_add(dish.price))
        .and_then(|per_guest| per_guest.checked_mul(i64::from(guest_count)))
        .ok_or_else(|| ApiError::Validation("order total out of range".into()))
}

/// Stored form of an email address, shared by every write path.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_string()
}
