use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::bb8::Pool;
use diesel_async::pooled_connection::PoolError;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use futures::future::BoxFuture;
use shared::status::TransactionType;
use shared::stock::apply_movement;

use super::*;
use crate::schema::*;

type DbPool = Pool<AsyncPgConnection>;

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(info.message().to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                StoreError::ForeignKey(info.message().to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
                StoreError::Invalid(info.message().to_string())
            }
            DieselError::NotFound => StoreError::NotFound("record"),
            other => StoreError::Database(other.to_string()),
        }
    }
}

impl From<bb8::RunError<PoolError>> for StoreError {
    fn from(err: bb8::RunError<PoolError>) -> Self {
        StoreError::Pool(err.to_string())
    }
}

/// PostgreSQL through a bb8 pool of async diesel connections.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

macro_rules! pg_repo {
    (@read $row:ident => $table:ident) => {
        fn list_rows(&self) -> BoxFuture<'_, StoreResult<Vec<$row>>> {
            Box::pin(async move {
                let mut conn = self.pool.get().await?;
                Ok($table::table
                    .order($table::id.asc())
                    .select($row::as_select())
                    .load(&mut conn)
                    .await?)
            })
        }

        fn find_row(&self, id: i32) -> BoxFuture<'_, StoreResult<Option<$row>>> {
            Box::pin(async move {
                let mut conn = self.pool.get().await?;
                Ok($table::table
                    .find(id)
                    .select($row::as_select())
                    .first(&mut conn)
                    .await
                    .optional()?)
            })
        }

        fn insert_row(&self, data: <$row as Record>::Data) -> BoxFuture<'_, StoreResult<$row>> {
            Box::pin(async move {
                let mut conn = self.pool.get().await?;
                Ok(diesel::insert_into($table::table)
                    .values(&data)
                    .returning($row::as_returning())
                    .get_result(&mut conn)
                    .await?)
            })
        }

        fn delete_row(&self, id: i32) -> BoxFuture<'_, StoreResult<()>> {
            Box::pin(async move {
                let mut conn = self.pool.get().await?;
                let deleted = diesel::delete($table::table.find(id)).execute(&mut conn).await?;
                if deleted == 0 {
                    return Err(StoreError::NotFound($row::ENTITY));
                }
                Ok(())
            })
        }
    };

    ($($row:ident => $table:ident),+ $(,)?) => {
        $(
            impl Repo<$row> for PgStore {
                pg_repo!(@read $row => $table);

                fn update_row(
                    &self,
                    id: i32,
                    changes: <$row as Record>::Changes,
                ) -> BoxFuture<'_, StoreResult<$row>> {
                    Box::pin(async move {
                        if !$row::has_changes(&changes) {
                            return Repo::<$row>::find_row(self, id)
                                .await?
                                .ok_or(StoreError::NotFound($row::ENTITY));
                        }
                        let mut conn = self.pool.get().await?;
                        diesel::update($table::table.find(id))
                            .set(&changes)
                            .returning($row::as_returning())
                            .get_result(&mut conn)
                            .await
                            .optional()?
                            .ok_or(StoreError::NotFound($row::ENTITY))
                    })
                }
            }
        )+
    };
}

/// Append-only tables: updates are no-ops that return the stored row.
macro_rules! pg_log_repo {
    ($($row:ident => $table:ident),+ $(,)?) => {
        $(
            impl Repo<$row> for PgStore {
                pg_repo!(@read $row => $table);

                fn update_row(&self, id: i32, _: NoChanges) -> BoxFuture<'_, StoreResult<$row>> {
                    Box::pin(async move {
                        Repo::<$row>::find_row(self, id)
                            .await?
                            .ok_or(StoreError::NotFound($row::ENTITY))
                    })
                }
            }
        )+
    };
}

pg_repo! {
    User => users,
    Company => companies,
    SystemAlert => system_alerts,
    Employee => employees,
    Department => departments,
    Position => positions,
    Leave => leaves,
    Payroll => payroll,
    FiscalCertificate => fiscal_certificates,
    FiscalNcm => fiscal_ncms,
    FiscalCfop => fiscal_cfops,
    FiscalCst => fiscal_csts,
    FiscalConfig => fiscal_configs,
    Customer => customers,
    Nfe => nfes,
    NfeItem => nfe_itens,
    Supplier => suppliers,
    RawMaterial => raw_materials,
    MeasurementUnit => measurement_units,
    Quotation => quotations,
    QuotationItem => quotation_items,
    SupplierQuotation => supplier_quotations,
    Product => products,
    ProductFormula => product_formulas,
    ProductPricing => product_pricing,
    QualityInspection => quality_inspections,
    NonConformity => non_conformities,
    ChatRoom => chat_rooms,
    ChatParticipant => chat_room_participants,
    ChatMessage => chat_messages,
    ChatUpload => chat_uploads,
    ChatPreferences => chat_user_preferences,
    SupportTicket => support_tickets,
    KnowledgeArticle => knowledge_articles,
    Expense => expenses,
    Account => accounts,
    ProductionOrder => production_orders,
    Equipment => equipment,
    MaintenanceOrder => maintenance_orders,
    Order => orders,
    ProdutoFiscal => produtos_fiscais,
}

pg_log_repo! {
    SystemAuditLog => system_audit_logs,
    NfeEvento => nfe_eventos,
    ChatAuditLog => chat_audit_logs,
    ProductionLoss => production_losses,
    InventoryTransaction => inventory_transactions,
    OrderItem => order_items,
}

macro_rules! audit_query {
    ($filter:expr) => {{
        let filter: &AuditFilter = $filter;
        let mut query = system_audit_logs::table.left_join(users::table).into_boxed();
        if let Some(module) = &filter.module {
            query = query.filter(system_audit_logs::module.eq(module.clone()));
        }
        if let Some(entity_type) = &filter.entity_type {
            query = query.filter(system_audit_logs::entity_type.eq(entity_type.clone()));
        }
        if let Some(action) = &filter.action {
            query = query.filter(system_audit_logs::action.eq(action.clone()));
        }
        if let Some(user_id) = filter.user_id {
            query = query.filter(system_audit_logs::user_id.eq(user_id));
        }
        if let Some(from) = filter.from {
            query = query.filter(system_audit_logs::created_at.ge(from));
        }
        if let Some(until) = filter.until {
            query = query.filter(system_audit_logs::created_at.le(until));
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{search}%");
            query = query.filter(
                users::username
                    .nullable()
                    .ilike(pattern.clone())
                    .or(system_audit_logs::entity_type.nullable().ilike(pattern.clone()))
                    .or(system_audit_logs::action.nullable().ilike(pattern.clone()))
                    .or(system_audit_logs::module.ilike(pattern)),
            );
        }
        query
    }};
}

macro_rules! chat_audit_query {
    ($filter:expr) => {{
        let filter: &ChatAuditFilter = $filter;
        let mut query = chat_audit_logs::table.left_join(users::table).into_boxed();
        if let Some(user_id) = filter.user_id {
            query = query.filter(chat_audit_logs::user_id.eq(user_id));
        }
        if let Some(room_id) = filter.room_id {
            query = query.filter(chat_audit_logs::room_id.eq(room_id));
        }
        if let Some(action) = &filter.action {
            query = query.filter(chat_audit_logs::action.eq(action.clone()));
        }
        if let Some(from) = filter.from {
            query = query.filter(chat_audit_logs::created_at.ge(from));
        }
        if let Some(until) = filter.until {
            query = query.filter(chat_audit_logs::created_at.le(until));
        }
        query
    }};
}

impl Storage for PgStore {
    fn user_by_username(&self, username: String) -> BoxFuture<'_, StoreResult<Option<User>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(users::table
                .filter(users::username.eq(username))
                .select(User::as_select())
                .first(&mut conn)
                .await
                .optional()?)
        })
    }

    fn search_audit_logs(
        &self,
        filter: AuditFilter,
    ) -> BoxFuture<'_, StoreResult<(Vec<AuditEntry>, i64)>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            let total: i64 = audit_query!(&filter).count().get_result(&mut conn).await?;
            let mut query = audit_query!(&filter);
            query = if filter.ascending {
                query.order((system_audit_logs::created_at.asc(), system_audit_logs::id.asc()))
            } else {
                query.order((system_audit_logs::created_at.desc(), system_audit_logs::id.desc()))
            };
            let rows: Vec<(SystemAuditLog, Option<String>)> = query
                .select((SystemAuditLog::as_select(), users::username.nullable()))
                .limit(filter.page.size)
                .offset(filter.page.offset())
                .load(&mut conn)
                .await?;
            let entries = rows
                .into_iter()
                .map(|(log, username)| AuditEntry { log, username })
                .collect();
            Ok((entries, total))
        })
    }

    fn search_chat_audit_logs(
        &self,
        filter: ChatAuditFilter,
    ) -> BoxFuture<'_, StoreResult<(Vec<ChatAuditEntry>, i64)>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            let total: i64 = chat_audit_query!(&filter).count().get_result(&mut conn).await?;
            let mut query = chat_audit_query!(&filter);
            query = if filter.ascending {
                query.order((chat_audit_logs::created_at.asc(), chat_audit_logs::id.asc()))
            } else {
                query.order((chat_audit_logs::created_at.desc(), chat_audit_logs::id.desc()))
            };
            let rows: Vec<(ChatAuditLog, Option<String>)> = query
                .select((ChatAuditLog::as_select(), users::username.nullable()))
                .limit(filter.page.size)
                .offset(filter.page.offset())
                .load(&mut conn)
                .await?;
            let entries = rows
                .into_iter()
                .map(|(log, username)| ChatAuditEntry { log, username })
                .collect();
            Ok((entries, total))
        })
    }

    fn employee_leaves(&self, employee_id: i32) -> BoxFuture<'_, StoreResult<Vec<Leave>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(leaves::table
                .filter(leaves::employee_id.eq(employee_id))
                .order(leaves::id.asc())
                .select(Leave::as_select())
                .load(&mut conn)
                .await?)
        })
    }

    fn issue_nfe(&self, config_id: i32, draft: NfeDraft) -> BoxFuture<'_, StoreResult<Nfe>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            conn.transaction::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    let (next, serie): (i32, i32) = diesel::update(fiscal_configs::table.find(config_id))
                        .set(fiscal_configs::proximo_numero_nfe.eq(fiscal_configs::proximo_numero_nfe + 1))
                        .returning((fiscal_configs::proximo_numero_nfe, fiscal_configs::serie_nfe))
                        .get_result(conn)
                        .await
                        .optional()?
                        .ok_or(StoreError::NotFound(FiscalConfig::ENTITY))?;
                    let data = draft(next - 1, serie)?;
                    Ok(diesel::insert_into(nfes::table)
                        .values(&data)
                        .returning(Nfe::as_returning())
                        .get_result(conn)
                        .await?)
                })
            })
            .await
        })
    }

    fn nfe_page(
        &self,
        status: Option<String>,
        page: Page,
    ) -> BoxFuture<'_, StoreResult<(Vec<Nfe>, i64)>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            let mut count = nfes::table.into_boxed();
            let mut query = nfes::table.into_boxed();
            if let Some(status) = status {
                count = count.filter(nfes::status.eq(status.clone()));
                query = query.filter(nfes::status.eq(status));
            }
            let total: i64 = count.count().get_result(&mut conn).await?;
            let rows = query
                .order(nfes::id.desc())
                .select(Nfe::as_select())
                .limit(page.size)
                .offset(page.offset())
                .load(&mut conn)
                .await?;
            Ok((rows, total))
        })
    }

    fn nfe_items(&self, nfe_id: i32) -> BoxFuture<'_, StoreResult<Vec<NfeItem>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(nfe_itens::table
                .filter(nfe_itens::nfe_id.eq(nfe_id))
                .order(nfe_itens::id.asc())
                .select(NfeItem::as_select())
                .load(&mut conn)
                .await?)
        })
    }

    fn nfe_events(&self, nfe_id: i32) -> BoxFuture<'_, StoreResult<Vec<NfeEvento>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(nfe_eventos::table
                .filter(nfe_eventos::nfe_id.eq(nfe_id))
                .order(nfe_eventos::id.asc())
                .select(NfeEvento::as_select())
                .load(&mut conn)
                .await?)
        })
    }

    fn quotation_items(&self, quotation_id: i32) -> BoxFuture<'_, StoreResult<Vec<QuotationItem>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(quotation_items::table
                .filter(quotation_items::quotation_id.eq(quotation_id))
                .order(quotation_items::id.asc())
                .select(QuotationItem::as_select())
                .load(&mut conn)
                .await?)
        })
    }

    fn supplier_quotations(&self, item_id: i32) -> BoxFuture<'_, StoreResult<Vec<SupplierQuotation>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(supplier_quotations::table
                .filter(supplier_quotations::quotation_item_id.eq(item_id))
                .order(supplier_quotations::id.asc())
                .select(SupplierQuotation::as_select())
                .load(&mut conn)
                .await?)
        })
    }

    fn select_supplier_quotation(&self, id: i32) -> BoxFuture<'_, StoreResult<SupplierQuotation>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            conn.transaction::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    let item_id: i32 = supplier_quotations::table
                        .find(id)
                        .select(supplier_quotations::quotation_item_id)
                        .first(conn)
                        .await
                        .optional()?
                        .ok_or(StoreError::NotFound(SupplierQuotation::ENTITY))?;
                    diesel::update(
                        supplier_quotations::table
                            .filter(supplier_quotations::quotation_item_id.eq(item_id))
                            .filter(supplier_quotations::id.ne(id)),
                    )
                    .set(supplier_quotations::is_selected.eq(false))
                    .execute(conn)
                    .await?;
                    Ok(diesel::update(supplier_quotations::table.find(id))
                        .set(supplier_quotations::is_selected.eq(true))
                        .returning(SupplierQuotation::as_returning())
                        .get_result(conn)
                        .await?)
                })
            })
            .await
        })
    }

    fn product_formulas(&self, product_id: i32) -> BoxFuture<'_, StoreResult<Vec<ProductFormula>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(product_formulas::table
                .filter(product_formulas::product_id.eq(product_id))
                .order(product_formulas::id.asc())
                .select(ProductFormula::as_select())
                .load(&mut conn)
                .await?)
        })
    }

    fn latest_pricing(&self, product_id: i32) -> BoxFuture<'_, StoreResult<Option<ProductPricing>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(product_pricing::table
                .filter(product_pricing::product_id.eq(product_id))
                .order((product_pricing::calculation_date.desc(), product_pricing::id.desc()))
                .select(ProductPricing::as_select())
                .first(&mut conn)
                .await
                .optional()?)
        })
    }

    fn room_participants(&self, room_id: i32) -> BoxFuture<'_, StoreResult<Vec<ChatParticipant>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(chat_room_participants::table
                .filter(chat_room_participants::room_id.eq(room_id))
                .order(chat_room_participants::id.asc())
                .select(ChatParticipant::as_select())
                .load(&mut conn)
                .await?)
        })
    }

    fn participant(
        &self,
        room_id: i32,
        user_id: i32,
    ) -> BoxFuture<'_, StoreResult<Option<ChatParticipant>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(chat_room_participants::table
                .filter(chat_room_participants::room_id.eq(room_id))
                .filter(chat_room_participants::user_id.eq(user_id))
                .select(ChatParticipant::as_select())
                .first(&mut conn)
                .await
                .optional()?)
        })
    }

    fn user_rooms(&self, user_id: i32) -> BoxFuture<'_, StoreResult<Vec<ChatRoom>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(chat_rooms::table
                .inner_join(chat_room_participants::table)
                .filter(chat_room_participants::user_id.eq(user_id))
                .order((
                    diesel::dsl::sql::<diesel::sql_types::Timestamptz>(
                        "COALESCE(chat_rooms.last_message_at, chat_rooms.created_at)",
                    )
                    .desc(),
                    chat_rooms::id.desc(),
                ))
                .select(ChatRoom::as_select())
                .load(&mut conn)
                .await?)
        })
    }

    fn room_messages(
        &self,
        room_id: i32,
        limit: i64,
        offset: i64,
    ) -> BoxFuture<'_, StoreResult<Vec<ChatMessage>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(chat_messages::table
                .filter(chat_messages::room_id.eq(room_id))
                .order(chat_messages::id.desc())
                .limit(limit)
                .offset(offset)
                .select(ChatMessage::as_select())
                .load(&mut conn)
                .await?)
        })
    }

    fn thread(&self, parent_id: i32) -> BoxFuture<'_, StoreResult<Vec<ChatMessage>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(chat_messages::table
                .filter(chat_messages::parent_id.eq(parent_id))
                .order(chat_messages::id.asc())
                .select(ChatMessage::as_select())
                .load(&mut conn)
                .await?)
        })
    }

    fn mark_room_read(
        &self,
        room_id: i32,
        user_id: i32,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<usize>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            conn.transaction::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    let marked = diesel::update(
                        chat_messages::table
                            .filter(chat_messages::room_id.eq(room_id))
                            .filter(chat_messages::user_id.ne(user_id))
                            .filter(chat_messages::is_read.eq(false)),
                    )
                    .set(chat_messages::is_read.eq(true))
                    .execute(conn)
                    .await?;
                    diesel::update(
                        chat_room_participants::table
                            .filter(chat_room_participants::room_id.eq(room_id))
                            .filter(chat_room_participants::user_id.eq(user_id)),
                    )
                    .set(chat_room_participants::last_seen_at.eq(Some(at)))
                    .execute(conn)
                    .await?;
                    Ok(marked)
                })
            })
            .await
        })
    }

    fn room_uploads(&self, room_id: i32) -> BoxFuture<'_, StoreResult<Vec<ChatUpload>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(chat_uploads::table
                .filter(chat_uploads::room_id.eq(room_id))
                .order(chat_uploads::id.asc())
                .select(ChatUpload::as_select())
                .load(&mut conn)
                .await?)
        })
    }

    fn chat_preferences(&self, user_id: i32) -> BoxFuture<'_, StoreResult<Option<ChatPreferences>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(chat_user_preferences::table
                .filter(chat_user_preferences::user_id.eq(user_id))
                .select(ChatPreferences::as_select())
                .first(&mut conn)
                .await
                .optional()?)
        })
    }

    fn purge_chat(&self, keep_room: Option<i32>) -> BoxFuture<'_, StoreResult<ChatPurge>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            conn.transaction::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    diesel::delete(chat_uploads::table).execute(conn).await?;
                    let messages = diesel::delete(chat_messages::table).execute(conn).await?;
                    let rooms = match keep_room {
                        Some(keep) => {
                            diesel::delete(chat_rooms::table.filter(chat_rooms::id.ne(keep)))
                                .execute(conn)
                                .await?
                        }
                        None => diesel::delete(chat_rooms::table).execute(conn).await?,
                    };
                    Ok(ChatPurge { messages, rooms })
                })
            })
            .await
        })
    }

    fn record_stock_movement(
        &self,
        data: InventoryTransactionData,
    ) -> BoxFuture<'_, StoreResult<(InventoryTransaction, RawMaterial)>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            conn.transaction::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    let current: f64 = raw_materials::table
                        .find(data.material_id)
                        .select(raw_materials::current_stock)
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?
                        .ok_or(StoreError::NotFound(RawMaterial::ENTITY))?;
                    let kind: TransactionType = data.transaction_type.parse()?;
                    let stock = apply_movement(current, kind, data.quantity)?;
                    let material = diesel::update(raw_materials::table.find(data.material_id))
                        .set(raw_materials::current_stock.eq(stock))
                        .returning(RawMaterial::as_returning())
                        .get_result(conn)
                        .await?;
                    let entry = diesel::insert_into(inventory_transactions::table)
                        .values(&data)
                        .returning(InventoryTransaction::as_returning())
                        .get_result(conn)
                        .await?;
                    Ok((entry, material))
                })
            })
            .await
        })
    }

    fn create_order(
        &self,
        order: OrderData,
        items: Vec<OrderItemData>,
    ) -> BoxFuture<'_, StoreResult<(Order, Vec<OrderItem>)>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            conn.transaction::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    let order: Order = diesel::insert_into(orders::table)
                        .values(&order)
                        .returning(Order::as_returning())
                        .get_result(conn)
                        .await?;
                    if items.is_empty() {
                        return Ok((order, Vec::new()));
                    }
                    let items: Vec<OrderItemData> = items
                        .into_iter()
                        .map(|item| OrderItemData { order_id: order.id, ..item })
                        .collect();
                    let items = diesel::insert_into(order_items::table)
                        .values(&items)
                        .returning(OrderItem::as_returning())
                        .get_results(conn)
                        .await?;
                    Ok((order, items))
                })
            })
            .await
        })
    }

    fn order_items(&self, order_id: i32) -> BoxFuture<'_, StoreResult<Vec<OrderItem>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(order_items::table
                .filter(order_items::order_id.eq(order_id))
                .order(order_items::id.asc())
                .select(OrderItem::as_select())
                .load(&mut conn)
                .await?)
        })
    }

    fn production_losses(&self, order_id: i32) -> BoxFuture<'_, StoreResult<Vec<ProductionLoss>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(production_losses::table
                .filter(production_losses::production_order_id.eq(order_id))
                .order(production_losses::id.asc())
                .select(ProductionLoss::as_select())
                .load(&mut conn)
                .await?)
        })
    }

    fn produto_fiscal(&self, produto_id: i32) -> BoxFuture<'_, StoreResult<Option<ProdutoFiscal>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            Ok(produtos_fiscais::table
                .filter(produtos_fiscais::produto_id.eq(produto_id))
                .select(ProdutoFiscal::as_select())
                .first(&mut conn)
                .await
                .optional()?)
        })
    }
}
