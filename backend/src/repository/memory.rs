use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    DANGLING_REFERENCE, EMAIL_TAKEN, EVENT_HAS_ORDERS, RepoError, RepoResult, Repository,
    USER_HAS_ORDERS, USERNAME_TAKEN,
};
use crate::models::{
    AdminDashboardStats, CreateDishRequest, CreateEventRequest, DishFilter, Event, EventFilter,
    MenuItem, NewOrder, NewUser, Order, OrderFilter, OrderStatus, UpdateDishRequest,
    UpdateEventRequest, User, UserChanges,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    events: BTreeMap<i32, Event>,
    dishes: BTreeMap<i32, MenuItem>,
    orders: BTreeMap<i32, Order>,
    // (order_id, menu_item_id, unit_price)
    order_items: Vec<(i32, Option<i32>, i64)>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// InMemoryRepository
///
/// A `Repository` held entirely in process memory. It enforces the same unique and
/// referential constraints as the Postgres schema, so handler and router tests can
/// run without a database. Each call holds one lock for its whole duration, which
/// gives `create_order` the same all-or-nothing behaviour as a transaction.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored order item rows. Lets tests observe what a failed order left behind.
    pub async fn order_item_count(&self) -> usize {
        self.tables.read().await.order_items.len()
    }

    /// Unit prices recorded on an order's items, in insertion order.
    pub async fn order_item_prices(&self, order_id: i32) -> Vec<i64> {
        self.tables
            .read()
            .await
            .order_items
            .iter()
            .filter(|item| item.0 == order_id)
            .map(|item| item.2)
            .collect()
    }
}

// Newest first, matching `ORDER BY created_at DESC, id DESC`.
fn newest_first<T>(rows: impl DoubleEndedIterator<Item = T>) -> Vec<T> {
    rows.rev().collect()
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: i32) -> RepoResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        Ok(newest_first(self.tables.read().await.users.values().cloned()))
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(RepoError::Conflict(USERNAME_TAKEN.into()));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(RepoError::Conflict(EMAIL_TAKEN.into()));
        }
        let id = tables.next_id();
        let row = User {
            id,
            username: user.username,
            email: user.email,
            password: user.password,
            role: user.role,
            phone: user.phone,
            created_at: Utc::now(),
        };
        tables.users.insert(id, row.clone());
        Ok(row)
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> RepoResult<Option<User>> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &changes.email {
            if tables.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(RepoError::Conflict(EMAIL_TAKEN.into()));
            }
        }
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(phone) = changes.phone {
            user.phone = (!phone.is_empty()).then_some(phone);
        }
        if let Some(password) = changes.password {
            user.password = password;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: i32) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.orders.values().any(|o| o.user_id == id) {
            return Err(RepoError::Conflict(USER_HAS_ORDERS.into()));
        }
        Ok(tables.users.remove(&id).is_some())
    }

    async fn list_events(&self, filter: &EventFilter) -> RepoResult<Vec<Event>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .events
                .values()
                .filter(|e| filter.category.as_ref().is_none_or(|c| &e.category == c))
                .filter(|e| filter.status.is_none_or(|s| e.status == s))
                .cloned(),
        ))
    }

    async fn get_event(&self, id: i32) -> RepoResult<Option<Event>> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn create_event(&self, req: CreateEventRequest) -> RepoResult<Event> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let row = Event {
            id,
            title: req.title,
            description: req.description,
            image_url: req.image_url,
            category: req.category,
            status: req.status,
            menu_options: req.menu_options,
            min_guests: req.min_guests,
            max_guests: req.max_guests,
            created_at: Utc::now(),
        };
        tables.events.insert(id, row.clone());
        Ok(row)
    }

    async fn update_event(&self, id: i32, req: UpdateEventRequest) -> RepoResult<Option<Event>> {
        let mut tables = self.tables.write().await;
        let Some(event) = tables.events.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = req.title {
            event.title = title;
        }
        if let Some(description) = req.description {
            event.description = description;
        }
        if let Some(image_url) = req.image_url {
            event.image_url = (!image_url.is_empty()).then_some(image_url);
        }
        if let Some(category) = req.category {
            event.category = category;
        }
        if let Some(status) = req.status {
            event.status = status;
        }
        if let Some(menu_options) = req.menu_options {
            event.menu_options = menu_options;
        }
        if let Some(min_guests) = req.min_guests {
            event.min_guests = min_guests;
        }
        if let Some(max_guests) = req.max_guests {
            event.max_guests = max_guests;
        }
        Ok(Some(event.clone()))
    }

    async fn delete_event(&self, id: i32) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.orders.values().any(|o| o.event_id == id) {
            return Err(RepoError::Conflict(EVENT_HAS_ORDERS.into()));
        }
        if tables.events.remove(&id).is_none() {
            return Ok(false);
        }
        tables.dishes.retain(|_, d| d.event_id != id);
        Ok(true)
    }

    async fn list_dishes(&self, filter: &DishFilter) -> RepoResult<Vec<MenuItem>> {
        let tables = self.tables.read().await;
        let mut dishes: Vec<MenuItem> = tables
            .dishes
            .values()
            .filter(|d| filter.event_id.is_none_or(|id| d.event_id == id))
            .filter(|d| filter.category.as_ref().is_none_or(|c| &d.category == c))
            .cloned()
            .collect();
        dishes.sort_by(|a, b| (&a.category, &a.name, a.id).cmp(&(&b.category, &b.name, b.id)));
        Ok(dishes)
    }

    async fn get_dish(&self, id: i32) -> RepoResult<Option<MenuItem>> {
        Ok(self.tables.read().await.dishes.get(&id).cloned())
    }

    async fn get_dishes(&self, ids: &[i32]) -> RepoResult<Vec<MenuItem>> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.dishes.get(id).cloned()).collect())
    }

    async fn create_dish(&self, req: CreateDishRequest) -> RepoResult<MenuItem> {
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&req.event_id) {
            return Err(RepoError::Conflict(DANGLING_REFERENCE.into()));
        }
        let id = tables.next_id();
        let row = MenuItem {
            id,
            name: req.name,
            description: req.description,
            price: req.price,
            category: req.category,
            event_id: req.event_id,
            created_at: Utc::now(),
        };
        tables.dishes.insert(id, row.clone());
        Ok(row)
    }

    async fn update_dish(&self, id: i32, req: UpdateDishRequest) -> RepoResult<Option<MenuItem>> {
        let mut tables = self.tables.write().await;
        let Some(dish) = tables.dishes.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = req.name {
            dish.name = name;
        }
        if let Some(description) = req.description {
            dish.description = description;
        }
        if let Some(price) = req.price {
            dish.price = price;
        }
        if let Some(category) = req.category {
            dish.category = category;
        }
        Ok(Some(dish.clone()))
    }

    /// Order items keep their price snapshot; the dish reference is nulled.
    async fn delete_dish(&self, id: i32) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.dishes.remove(&id).is_none() {
            return Ok(false);
        }
        for item in tables.order_items.iter_mut().filter(|item| item.1 == Some(id)) {
            item.1 = None;
        }
        Ok(true)
    }

    async fn list_orders(&self, filter: &OrderFilter) -> RepoResult<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .orders
                .values()
                .filter(|o| filter.status.is_none_or(|s| o.status == s))
                .filter(|o| filter.user_id.is_none_or(|id| o.user_id == id))
                .cloned(),
        ))
    }

    async fn get_order(&self, id: i32) -> RepoResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    /// Checks every reference before writing anything, so a failure leaves no rows.
    async fn create_order(&self, order: NewOrder) -> RepoResult<Order> {
        let mut tables = self.tables.write().await;
        let references_ok = tables.users.contains_key(&order.user_id)
            && tables.events.contains_key(&order.event_id)
            && order
                .items
                .iter()
                .all(|(dish_id, _)| tables.dishes.contains_key(dish_id));
        if !references_ok {
            return Err(RepoError::Conflict(DANGLING_REFERENCE.into()));
        }

        let id = tables.next_id();
        let row = Order {
            id,
            user_id: order.user_id,
            event_id: order.event_id,
            date: order.date,
            guest_count: order.guest_count,
            menu_selection: order.items.iter().map(|(dish_id, _)| *dish_id).collect(),
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            notes: order.notes,
            created_at: Utc::now(),
        };
        tables.orders.insert(id, row.clone());
        tables
            .order_items
            .extend(order.items.iter().map(|(dish_id, price)| (id, Some(*dish_id), *price)));
        Ok(row)
    }

    async fn transition_order(
        &self,
        id: i32,
        from: OrderStatus,
        to: OrderStatus,
    ) -> RepoResult<Option<Order>> {
        let mut tables = self.tables.write().await;
        match tables.orders.get_mut(&id) {
            Some(order) if order.status == from => {
                order.status = to;
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_order(&self, id: i32) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.orders.remove(&id).is_none() {
            return Ok(false);
        }
        tables.order_items.retain(|item| item.0 != id);
        Ok(true)
    }

    async fn get_stats(&self) -> RepoResult<AdminDashboardStats> {
        let tables = self.tables.read().await;
        let count = |status: OrderStatus| {
            tables.orders.values().filter(|o| o.status == status).count() as i64
        };
        let revenue = tables
            .orders
            .values()
            .filter(|o| matches!(o.status, OrderStatus::Confirmed | OrderStatus::Completed))
            .fold(0i64, |acc, o| acc.saturating_add(o.total_amount));
        Ok(AdminDashboardStats {
            total_users: tables.users.len() as i64,
            total_events: tables.events.len() as i64,
            total_dishes: tables.dishes.len() as i64,
            total_orders: tables.orders.len() as i64,
            pending_orders: count(OrderStatus::Pending),
            confirmed_orders: count(OrderStatus::Confirmed),
            completed_orders: count(OrderStatus::Completed),
            cancelled_orders: count(OrderStatus::Cancelled),
            revenue,
        })
    }
}
