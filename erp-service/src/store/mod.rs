//! Persistence behind one object-safe trait.
//!
//! Handlers hold an `Arc<dyn Storage>`. `PgStore` is the production backend;
//! `MemoryStore` keeps everything in process and backs the HTTP tests and
//! database-less runs.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use shared::Page;
use thiserror::Error;

use crate::models::*;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    ForeignKey(String),
    #[error("{0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("connection pool error: {0}")]
    Pool(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<shared::RuleError> for StoreError {
    fn from(err: shared::RuleError) -> Self {
        StoreError::Invalid(err.to_string())
    }
}

/// A stored row: generated id, writable data and creation time.
pub trait Record: Sized + Clone + Send + Sync + 'static {
    type Data: Clone + Send + Sync + 'static;
    type Changes: Clone + Default + Send + Sync + 'static;

    /// Human name used in "not found" messages.
    const ENTITY: &'static str;

    fn id(&self) -> i32;
    fn data(&self) -> &Self::Data;
    fn assemble(id: i32, data: Self::Data, created_at: DateTime<Utc>) -> Self;
    fn apply(&mut self, changes: Self::Changes);
    fn has_changes(changes: &Self::Changes) -> bool;
}

/// Changeset of append-only tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoChanges;

/// Plain CRUD over one table. Lists come back in id order.
pub trait Repo<R: Record> {
    fn list_rows(&self) -> BoxFuture<'_, StoreResult<Vec<R>>>;
    fn find_row(&self, id: i32) -> BoxFuture<'_, StoreResult<Option<R>>>;
    fn insert_row(&self, data: R::Data) -> BoxFuture<'_, StoreResult<R>>;
    fn update_row(&self, id: i32, changes: R::Changes) -> BoxFuture<'_, StoreResult<R>>;
    fn delete_row(&self, id: i32) -> BoxFuture<'_, StoreResult<()>>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(flatten)]
    pub log: SystemAuditLog,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAuditEntry {
    #[serde(flatten)]
    pub log: ChatAuditLog,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub module: Option<String>,
    pub entity_type: Option<String>,
    pub action: Option<String>,
    pub user_id: Option<i32>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Case-insensitive substring of username, entity type, action or module.
    pub search: Option<String>,
    pub ascending: bool,
    pub page: Page,
}

#[derive(Debug, Clone, Default)]
pub struct ChatAuditFilter {
    pub user_id: Option<i32>,
    pub room_id: Option<i32>,
    pub action: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub ascending: bool,
    pub page: Page,
}

/// Builds the NF-e row once its number and series are known.
pub type NfeDraft = Box<dyn FnOnce(i32, i32) -> StoreResult<NfeData> + Send>;

/// Counts removed by a chat cleanup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPurge {
    pub messages: usize,
    pub rooms: usize,
}

pub trait Storage:
    Repo<User>
    + Repo<Company>
    + Repo<SystemAuditLog>
    + Repo<SystemAlert>
    + Repo<Employee>
    + Repo<Department>
    + Repo<Position>
    + Repo<Leave>
    + Repo<Payroll>
    + Repo<FiscalCertificate>
    + Repo<FiscalNcm>
    + Repo<FiscalCfop>
    + Repo<FiscalCst>
    + Repo<FiscalConfig>
    + Repo<Customer>
    + Repo<Nfe>
    + Repo<NfeItem>
    + Repo<NfeEvento>
    + Repo<Supplier>
    + Repo<RawMaterial>
    + Repo<MeasurementUnit>
    + Repo<Quotation>
    + Repo<QuotationItem>
    + Repo<SupplierQuotation>
    + Repo<Product>
    + Repo<ProductFormula>
    + Repo<ProductPricing>
    + Repo<QualityInspection>
    + Repo<NonConformity>
    + Repo<ChatRoom>
    + Repo<ChatParticipant>
    + Repo<ChatMessage>
    + Repo<ChatUpload>
    + Repo<ChatPreferences>
    + Repo<ChatAuditLog>
    + Repo<SupportTicket>
    + Repo<KnowledgeArticle>
    + Repo<Expense>
    + Repo<Account>
    + Repo<ProductionOrder>
    + Repo<ProductionLoss>
    + Repo<Equipment>
    + Repo<MaintenanceOrder>
    + Repo<InventoryTransaction>
    + Repo<Order>
    + Repo<OrderItem>
    + Repo<ProdutoFiscal>
    + Send
    + Sync
{
    fn user_by_username(&self, username: String) -> BoxFuture<'_, StoreResult<Option<User>>>;

    fn search_audit_logs(
        &self,
        filter: AuditFilter,
    ) -> BoxFuture<'_, StoreResult<(Vec<AuditEntry>, i64)>>;

    fn search_chat_audit_logs(
        &self,
        filter: ChatAuditFilter,
    ) -> BoxFuture<'_, StoreResult<(Vec<ChatAuditEntry>, i64)>>;

    fn employee_leaves(&self, employee_id: i32) -> BoxFuture<'_, StoreResult<Vec<Leave>>>;

    /// Takes the next number from the config and inserts the draft built for
    /// it, as one unit. A failing draft leaves the counter untouched.
    fn issue_nfe(&self, config_id: i32, draft: NfeDraft) -> BoxFuture<'_, StoreResult<Nfe>>;

    /// Newest first, optionally restricted to one status.
    fn nfe_page(
        &self,
        status: Option<String>,
        page: Page,
    ) -> BoxFuture<'_, StoreResult<(Vec<Nfe>, i64)>>;

    fn nfe_items(&self, nfe_id: i32) -> BoxFuture<'_, StoreResult<Vec<NfeItem>>>;
    fn nfe_events(&self, nfe_id: i32) -> BoxFuture<'_, StoreResult<Vec<NfeEvento>>>;

    fn quotation_items(&self, quotation_id: i32) -> BoxFuture<'_, StoreResult<Vec<QuotationItem>>>;
    fn supplier_quotations(&self, item_id: i32) -> BoxFuture<'_, StoreResult<Vec<SupplierQuotation>>>;

    /// Marks one offer selected and clears every sibling on the same item.
    fn select_supplier_quotation(&self, id: i32) -> BoxFuture<'_, StoreResult<SupplierQuotation>>;

    fn product_formulas(&self, product_id: i32) -> BoxFuture<'_, StoreResult<Vec<ProductFormula>>>;

    /// Most recent pricing of a product.
    fn latest_pricing(&self, product_id: i32) -> BoxFuture<'_, StoreResult<Option<ProductPricing>>>;

    fn room_participants(&self, room_id: i32) -> BoxFuture<'_, StoreResult<Vec<ChatParticipant>>>;
    fn participant(
        &self,
        room_id: i32,
        user_id: i32,
    ) -> BoxFuture<'_, StoreResult<Option<ChatParticipant>>>;

    /// Rooms the user belongs to, most recent activity first.
    fn user_rooms(&self, user_id: i32) -> BoxFuture<'_, StoreResult<Vec<ChatRoom>>>;

    /// Newest first.
    fn room_messages(
        &self,
        room_id: i32,
        limit: i64,
        offset: i64,
    ) -> BoxFuture<'_, StoreResult<Vec<ChatMessage>>>;

    /// Replies to a message, oldest first.
    fn thread(&self, parent_id: i32) -> BoxFuture<'_, StoreResult<Vec<ChatMessage>>>;

    /// Marks other users' messages read and stamps `last_seen_at`. Returns
    /// how many messages changed.
    fn mark_room_read(
        &self,
        room_id: i32,
        user_id: i32,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<usize>>;

    fn room_uploads(&self, room_id: i32) -> BoxFuture<'_, StoreResult<Vec<ChatUpload>>>;
    fn chat_preferences(&self, user_id: i32) -> BoxFuture<'_, StoreResult<Option<ChatPreferences>>>;

    /// Deletes every message and every room except `keep_room`.
    fn purge_chat(&self, keep_room: Option<i32>) -> BoxFuture<'_, StoreResult<ChatPurge>>;

    /// Writes the ledger entry and moves the material's stock, as one unit.
    /// Refuses movements that would leave the stock negative.
    fn record_stock_movement(
        &self,
        data: InventoryTransactionData,
    ) -> BoxFuture<'_, StoreResult<(InventoryTransaction, RawMaterial)>>;

    /// Inserts the order and its items together; each item's `order_id` is
    /// filled in.
    fn create_order(
        &self,
        order: OrderData,
        items: Vec<OrderItemData>,
    ) -> BoxFuture<'_, StoreResult<(Order, Vec<OrderItem>)>>;

    fn order_items(&self, order_id: i32) -> BoxFuture<'_, StoreResult<Vec<OrderItem>>>;
    fn production_losses(&self, order_id: i32) -> BoxFuture<'_, StoreResult<Vec<ProductionLoss>>>;
    fn produto_fiscal(&self, produto_id: i32) -> BoxFuture<'_, StoreResult<Option<ProdutoFiscal>>>;
}

impl<'s> dyn Storage + 's {
    pub async fn all<R: Record>(&self) -> StoreResult<Vec<R>>
    where
        Self: Repo<R>,
    {
        Repo::<R>::list_rows(self).await
    }

    pub async fn find<R: Record>(&self, id: i32) -> StoreResult<Option<R>>
    where
        Self: Repo<R>,
    {
        Repo::<R>::find_row(self, id).await
    }

    pub async fn get<R: Record>(&self, id: i32) -> StoreResult<R>
    where
        Self: Repo<R>,
    {
        self.find::<R>(id).await?.ok_or(StoreError::NotFound(R::ENTITY))
    }

    pub async fn create<R: Record>(&self, data: R::Data) -> StoreResult<R>
    where
        Self: Repo<R>,
    {
        Repo::<R>::insert_row(self, data).await
    }

    pub async fn update<R: Record>(&self, id: i32, changes: R::Changes) -> StoreResult<R>
    where
        Self: Repo<R>,
    {
        Repo::<R>::update_row(self, id, changes).await
    }

    pub async fn delete<R: Record>(&self, id: i32) -> StoreResult<()>
    where
        Self: Repo<R>,
    {
        Repo::<R>::delete_row(self, id).await
    }
}
