use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use shared::status::TransactionType;
use shared::stock::apply_movement;
use tokio::sync::RwLock;

use super::*;

/// One in-memory table. Ids start at 1 and are never reused.
pub struct Table<R> {
    rows: BTreeMap<i32, R>,
    last_id: i32,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Table { rows: BTreeMap::new(), last_id: 0 }
    }
}

impl<R: Record> Table<R> {
    fn push(&mut self, data: R::Data) -> R {
        self.last_id += 1;
        let row = R::assemble(self.last_id, data, Utc::now());
        self.rows.insert(row.id(), row.clone());
        row
    }

    fn filter(&self, keep: impl Fn(&R) -> bool) -> Vec<R> {
        self.rows.values().filter(|r| keep(r)).cloned().collect()
    }

    fn any(&self, hit: impl Fn(&R) -> bool) -> bool {
        self.rows.values().any(hit)
    }

    fn remove_where(&mut self, doomed: impl Fn(&R) -> bool) -> Vec<i32> {
        let ids: Vec<i32> = self.rows.values().filter(|r| doomed(r)).map(Record::id).collect();
        for id in &ids {
            self.rows.remove(id);
        }
        ids
    }
}

/// Maps a row type to its table.
pub trait Stored: Record {
    fn table(tables: &Tables) -> &Table<Self>;
    fn table_mut(tables: &mut Tables) -> &mut Table<Self>;
}

/// What the SQL schema enforces with UNIQUE and REFERENCES.
pub trait Constraints: Stored {
    fn unique_keys(_data: &Self::Data) -> Vec<String> {
        Vec::new()
    }

    /// Runs before the row goes away: cascades, nulls references or refuses.
    fn on_delete(_id: i32, _tables: &mut Tables) -> StoreResult<()> {
        Ok(())
    }
}

macro_rules! tables {
    ($($field:ident: $row:ty),+ $(,)?) => {
        #[derive(Default)]
        pub struct Tables {
            $($field: Table<$row>,)+
        }

        $(
            impl Stored for $row {
                fn table(tables: &Tables) -> &Table<Self> {
                    &tables.$field
                }

                fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
                    &mut tables.$field
                }
            }
        )+
    };
}

tables! {
    users: User,
    companies: Company,
    audit_logs: SystemAuditLog,
    alerts: SystemAlert,
    employees: Employee,
    departments: Department,
    positions: Position,
    leaves: Leave,
    payroll: Payroll,
    certificates: FiscalCertificate,
    ncms: FiscalNcm,
    cfops: FiscalCfop,
    csts: FiscalCst,
    fiscal_configs: FiscalConfig,
    customers: Customer,
    nfes: Nfe,
    nfe_items: NfeItem,
    nfe_events: NfeEvento,
    suppliers: Supplier,
    raw_materials: RawMaterial,
    units: MeasurementUnit,
    quotations: Quotation,
    quotation_items: QuotationItem,
    supplier_quotations: SupplierQuotation,
    products: Product,
    formulas: ProductFormula,
    pricings: ProductPricing,
    inspections: QualityInspection,
    non_conformities: NonConformity,
    rooms: ChatRoom,
    participants: ChatParticipant,
    messages: ChatMessage,
    uploads: ChatUpload,
    chat_preferences: ChatPreferences,
    chat_audit_logs: ChatAuditLog,
    tickets: SupportTicket,
    articles: KnowledgeArticle,
    expenses: Expense,
    accounts: Account,
    production_orders: ProductionOrder,
    production_losses: ProductionLoss,
    equipment: Equipment,
    maintenance_orders: MaintenanceOrder,
    stock_movements: InventoryTransaction,
    orders: Order,
    order_items: OrderItem,
    produtos_fiscais: ProdutoFiscal,
}

macro_rules! unconstrained {
    ($($row:ty),+ $(,)?) => {
        $(impl Constraints for $row {})+
    };
}

unconstrained!(
    Company,
    SystemAuditLog,
    SystemAlert,
    Position,
    Leave,
    FiscalConfig,
    NfeItem,
    NfeEvento,
    SupplierQuotation,
    ProductFormula,
    ProductPricing,
    QualityInspection,
    ChatUpload,
    ChatAuditLog,
    SupportTicket,
    KnowledgeArticle,
    Expense,
    Account,
    ProductionLoss,
    InventoryTransaction,
    OrderItem,
);

/// `created_by` columns are `ON DELETE SET NULL`.
macro_rules! forget_creator {
    ($tables:expr, $id:expr; $($field:ident),+ $(,)?) => {
        $(
            for row in $tables.$field.rows.values_mut() {
                if row.data.created_by == Some($id) {
                    row.data.created_by = None;
                }
            }
        )+
    };
}

fn still_referenced(entity: &str, by: &str) -> StoreError {
    StoreError::ForeignKey(format!("{entity} is still referenced by {by}"))
}

impl Constraints for User {
    fn unique_keys(data: &UserData) -> Vec<String> {
        vec![format!("username '{}'", data.username)]
    }

    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        if tables.nfes.any(|n| n.data.created_by == id) {
            return Err(still_referenced("user", "an NF-e"));
        }
        tables.participants.remove_where(|p| p.data.user_id == id);
        tables.messages.remove_where(|m| m.data.user_id == id);
        tables.uploads.remove_where(|u| u.data.user_id == id);
        tables.chat_preferences.remove_where(|p| p.data.user_id == id);
        tables.tickets.remove_where(|t| t.data.user_id == id);
        forget_creator!(tables, id;
            alerts, rooms, certificates, customers, employees, departments, positions, leaves,
            payroll, suppliers, raw_materials, units, quotations, products, formulas, pricings,
            inspections, non_conformities, articles, expenses, accounts, production_orders,
            production_losses, equipment, maintenance_orders, stock_movements, orders,
        );
        Ok(())
    }
}

impl Constraints for Employee {
    fn unique_keys(data: &EmployeeData) -> Vec<String> {
        data.cpf.iter().map(|cpf| format!("CPF {cpf}")).collect()
    }

    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        tables.leaves.remove_where(|l| l.data.employee_id == id);
        tables.payroll.remove_where(|p| p.data.employee_id == id);
        for department in tables.departments.rows.values_mut() {
            if department.data.manager_id == Some(id) {
                department.data.manager_id = None;
            }
        }
        Ok(())
    }
}

impl Constraints for Department {
    fn unique_keys(data: &DepartmentData) -> Vec<String> {
        vec![format!("name '{}'", data.name)]
    }

    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        for department in tables.departments.rows.values_mut() {
            if department.data.parent_department_id == Some(id) {
                department.data.parent_department_id = None;
            }
        }
        for position in tables.positions.rows.values_mut() {
            if position.data.department_id == Some(id) {
                position.data.department_id = None;
            }
        }
        Ok(())
    }
}

impl Constraints for Payroll {
    fn unique_keys(data: &PayrollData) -> Vec<String> {
        vec![format!(
            "employee {} period {}/{}",
            data.employee_id, data.month, data.year
        )]
    }
}

impl Constraints for FiscalCertificate {
    fn unique_keys(data: &FiscalCertificateData) -> Vec<String> {
        vec![format!("serial number '{}'", data.serial_number)]
    }

    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        for config in tables.fiscal_configs.rows.values_mut() {
            if config.data.certificado_id == Some(id) {
                config.data.certificado_id = None;
            }
        }
        Ok(())
    }
}

impl Constraints for FiscalNcm {
    fn unique_keys(data: &FiscalNcmData) -> Vec<String> {
        vec![format!("code '{}'", data.code)]
    }
}

impl Constraints for FiscalCfop {
    fn unique_keys(data: &FiscalCfopData) -> Vec<String> {
        vec![format!("code '{}'", data.code)]
    }
}

impl Constraints for FiscalCst {
    fn unique_keys(data: &FiscalCstData) -> Vec<String> {
        vec![format!("code '{}' for {}", data.code, data.tipo)]
    }
}

impl Constraints for Customer {
    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        if tables.nfes.any(|n| n.data.destinatario_id == id) {
            return Err(still_referenced("customer", "an NF-e"));
        }
        if tables.orders.any(|o| o.data.customer_id == id) {
            return Err(still_referenced("customer", "a sales order"));
        }
        Ok(())
    }
}

impl Constraints for Nfe {
    fn unique_keys(data: &NfeData) -> Vec<String> {
        vec![format!("access key {}", data.chave)]
    }

    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        tables.nfe_items.remove_where(|i| i.data.nfe_id == id);
        tables.nfe_events.remove_where(|e| e.data.nfe_id == id);
        Ok(())
    }
}

impl Constraints for Supplier {
    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        if tables.supplier_quotations.any(|q| q.data.supplier_id == id) {
            return Err(still_referenced("supplier", "a supplier quotation"));
        }
        Ok(())
    }
}

impl Constraints for RawMaterial {
    fn unique_keys(data: &RawMaterialData) -> Vec<String> {
        vec![format!("code '{}'", data.code)]
    }

    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        if tables.formulas.any(|f| f.data.material_id == id) {
            return Err(still_referenced("raw material", "a product formula"));
        }
        if tables.quotation_items.any(|i| i.data.material_id == id) {
            return Err(still_referenced("raw material", "a quotation item"));
        }
        if tables.stock_movements.any(|t| t.data.material_id == id) {
            return Err(still_referenced("raw material", "an inventory transaction"));
        }
        for nc in tables.non_conformities.rows.values_mut() {
            if nc.data.raw_material_id == Some(id) {
                nc.data.raw_material_id = None;
            }
        }
        Ok(())
    }
}

impl Constraints for MeasurementUnit {
    fn unique_keys(data: &MeasurementUnitData) -> Vec<String> {
        vec![format!("symbol '{}'", data.symbol)]
    }

    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        for item in tables.quotation_items.rows.values_mut() {
            if item.data.unit_id == Some(id) {
                item.data.unit_id = None;
            }
        }
        Ok(())
    }
}

impl Constraints for Quotation {
    fn unique_keys(data: &QuotationData) -> Vec<String> {
        vec![format!("number '{}'", data.quotation_number)]
    }

    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        let items = tables.quotation_items.remove_where(|i| i.data.quotation_id == id);
        tables
            .supplier_quotations
            .remove_where(|q| items.contains(&q.data.quotation_item_id));
        Ok(())
    }
}

impl Constraints for QuotationItem {
    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        tables.supplier_quotations.remove_where(|q| q.data.quotation_item_id == id);
        Ok(())
    }
}

impl Constraints for Product {
    fn unique_keys(data: &ProductData) -> Vec<String> {
        vec![format!("code '{}'", data.code)]
    }

    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        if tables.nfe_items.any(|i| i.data.produto_id == id) {
            return Err(still_referenced("product", "an NF-e item"));
        }
        if tables.production_orders.any(|o| o.data.product_id == id) {
            return Err(still_referenced("product", "a production order"));
        }
        if tables.order_items.any(|i| i.data.product_id == id) {
            return Err(still_referenced("product", "a sales order item"));
        }
        tables.produtos_fiscais.remove_where(|p| p.data.produto_id == id);
        tables.formulas.remove_where(|f| f.data.product_id == id);
        tables.pricings.remove_where(|p| p.data.product_id == id);
        for nc in tables.non_conformities.rows.values_mut() {
            if nc.data.product_id == Some(id) {
                nc.data.product_id = None;
            }
        }
        Ok(())
    }
}

impl Constraints for NonConformity {
    fn unique_keys(data: &NonConformityData) -> Vec<String> {
        vec![format!("code '{}'", data.code)]
    }
}

impl Constraints for ProductionOrder {
    fn unique_keys(data: &ProductionOrderData) -> Vec<String> {
        vec![format!("number '{}'", data.order_number)]
    }

    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        tables.production_losses.remove_where(|l| l.data.production_order_id == id);
        Ok(())
    }
}

impl Constraints for Equipment {
    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        if tables.maintenance_orders.any(|o| o.data.equipment_id == id) {
            return Err(still_referenced("equipment", "a maintenance order"));
        }
        Ok(())
    }
}

impl Constraints for MaintenanceOrder {
    fn unique_keys(data: &MaintenanceOrderData) -> Vec<String> {
        vec![format!("number '{}'", data.order_number)]
    }
}

impl Constraints for Order {
    fn unique_keys(data: &OrderData) -> Vec<String> {
        vec![format!("number '{}'", data.order_number)]
    }

    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        tables.order_items.remove_where(|i| i.data.order_id == id);
        Ok(())
    }
}

impl Constraints for ProdutoFiscal {
    fn unique_keys(data: &ProdutoFiscalData) -> Vec<String> {
        vec![format!("fiscal data of product {}", data.produto_id)]
    }
}

impl Constraints for ChatRoom {
    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        tables.participants.remove_where(|p| p.data.room_id == id);
        tables.messages.remove_where(|m| m.data.room_id == id);
        tables.uploads.remove_where(|u| u.data.room_id == id);
        for log in tables.chat_audit_logs.rows.values_mut() {
            if log.data.room_id == Some(id) {
                log.data.room_id = None;
            }
        }
        Ok(())
    }
}

impl Constraints for ChatParticipant {
    fn unique_keys(data: &ChatParticipantData) -> Vec<String> {
        vec![format!("user {} in room {}", data.user_id, data.room_id)]
    }
}

impl Constraints for ChatMessage {
    fn on_delete(id: i32, tables: &mut Tables) -> StoreResult<()> {
        for reply in tables.messages.rows.values_mut() {
            if reply.data.parent_id == Some(id) {
                reply.data.parent_id = None;
            }
        }
        for upload in tables.uploads.rows.values_mut() {
            if upload.data.message_id == Some(id) {
                upload.data.message_id = None;
            }
        }
        Ok(())
    }
}

impl Constraints for ChatPreferences {
    fn unique_keys(data: &ChatPreferencesData) -> Vec<String> {
        vec![format!("preferences of user {}", data.user_id)]
    }
}

fn check_unique<R: Constraints>(
    tables: &Tables,
    skip: Option<i32>,
    data: &R::Data,
) -> StoreResult<()> {
    let keys = R::unique_keys(data);
    if keys.is_empty() {
        return Ok(());
    }
    for row in R::table(tables).rows.values() {
        if Some(row.id()) == skip {
            continue;
        }
        let taken = R::unique_keys(row.data());
        if let Some(key) = keys.iter().find(|k| taken.contains(k)) {
            return Err(StoreError::Conflict(format!("{} with {key} already exists", R::ENTITY)));
        }
    }
    Ok(())
}

/// Process-local storage. Every operation holds the table lock for its whole
/// duration, so multi-row updates are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: Constraints> Repo<R> for MemoryStore {
    fn list_rows(&self) -> BoxFuture<'_, StoreResult<Vec<R>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(R::table(&tables).rows.values().cloned().collect())
        })
    }

    fn find_row(&self, id: i32) -> BoxFuture<'_, StoreResult<Option<R>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(R::table(&tables).rows.get(&id).cloned())
        })
    }

    fn insert_row(&self, data: R::Data) -> BoxFuture<'_, StoreResult<R>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            check_unique::<R>(&tables, None, &data)?;
            Ok(R::table_mut(&mut tables).push(data))
        })
    }

    fn update_row(&self, id: i32, changes: R::Changes) -> BoxFuture<'_, StoreResult<R>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let mut row = R::table(&tables)
                .rows
                .get(&id)
                .cloned()
                .ok_or(StoreError::NotFound(R::ENTITY))?;
            row.apply(changes);
            check_unique::<R>(&tables, Some(id), row.data())?;
            R::table_mut(&mut tables).rows.insert(id, row.clone());
            Ok(row)
        })
    }

    fn delete_row(&self, id: i32) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            if !R::table(&tables).rows.contains_key(&id) {
                return Err(StoreError::NotFound(R::ENTITY));
            }
            R::on_delete(id, &mut tables)?;
            R::table_mut(&mut tables).rows.remove(&id);
            Ok(())
        })
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn in_window(at: DateTime<Utc>, from: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> bool {
    from.map_or(true, |f| at >= f) && until.map_or(true, |u| at <= u)
}

fn page_of<T>(mut rows: Vec<T>, ascending: bool, page: Page) -> (Vec<T>, i64) {
    if !ascending {
        rows.reverse();
    }
    let total = rows.len() as i64;
    (page.slice(rows), total)
}

impl Storage for MemoryStore {
    fn user_by_username(&self, username: String) -> BoxFuture<'_, StoreResult<Option<User>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.users.rows.values().find(|u| u.data.username == username).cloned())
        })
    }

    fn search_audit_logs(
        &self,
        filter: AuditFilter,
    ) -> BoxFuture<'_, StoreResult<(Vec<AuditEntry>, i64)>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let search = filter.search.as_deref().map(str::to_lowercase);
            let rows: Vec<AuditEntry> = tables
                .audit_logs
                .rows
                .values()
                .map(|log| AuditEntry {
                    username: log
                        .data
                        .user_id
                        .and_then(|id| tables.users.rows.get(&id))
                        .map(|u| u.data.username.clone()),
                    log: log.clone(),
                })
                .filter(|e| {
                    let d = &e.log.data;
                    filter.module.as_ref().map_or(true, |m| d.module.as_ref() == Some(m))
                        && filter.entity_type.as_ref().map_or(true, |t| &d.entity_type == t)
                        && filter.action.as_ref().map_or(true, |a| &d.action == a)
                        && filter.user_id.map_or(true, |u| d.user_id == Some(u))
                        && in_window(e.log.created_at, filter.from, filter.until)
                        && search.as_deref().map_or(true, |s| {
                            e.username.as_deref().map_or(false, |u| contains_ci(u, s))
                                || contains_ci(&d.entity_type, s)
                                || contains_ci(&d.action, s)
                                || d.module.as_deref().map_or(false, |m| contains_ci(m, s))
                        })
                })
                .collect();
            Ok(page_of(rows, filter.ascending, filter.page))
        })
    }

    fn search_chat_audit_logs(
        &self,
        filter: ChatAuditFilter,
    ) -> BoxFuture<'_, StoreResult<(Vec<ChatAuditEntry>, i64)>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let rows: Vec<ChatAuditEntry> = tables
                .chat_audit_logs
                .rows
                .values()
                .filter(|log| {
                    let d = &log.data;
                    filter.user_id.map_or(true, |u| d.user_id == Some(u))
                        && filter.room_id.map_or(true, |r| d.room_id == Some(r))
                        && filter.action.as_ref().map_or(true, |a| &d.action == a)
                        && in_window(log.created_at, filter.from, filter.until)
                })
                .map(|log| ChatAuditEntry {
                    username: log
                        .data
                        .user_id
                        .and_then(|id| tables.users.rows.get(&id))
                        .map(|u| u.data.username.clone()),
                    log: log.clone(),
                })
                .collect();
            Ok(page_of(rows, filter.ascending, filter.page))
        })
    }

    fn employee_leaves(&self, employee_id: i32) -> BoxFuture<'_, StoreResult<Vec<Leave>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.leaves.filter(|l| l.data.employee_id == employee_id))
        })
    }

    fn issue_nfe(&self, config_id: i32, draft: NfeDraft) -> BoxFuture<'_, StoreResult<Nfe>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let config = tables
                .fiscal_configs
                .rows
                .get(&config_id)
                .ok_or(StoreError::NotFound(FiscalConfig::ENTITY))?;
            let (numero, serie) = (config.data.proximo_numero_nfe, config.data.serie_nfe);
            let data = draft(numero, serie)?;
            check_unique::<Nfe>(&tables, None, &data)?;
            let nfe = tables.nfes.push(data);
            if let Some(config) = tables.fiscal_configs.rows.get_mut(&config_id) {
                config.data.proximo_numero_nfe = numero + 1;
            }
            Ok(nfe)
        })
    }

    fn nfe_page(
        &self,
        status: Option<String>,
        page: Page,
    ) -> BoxFuture<'_, StoreResult<(Vec<Nfe>, i64)>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let rows = tables
                .nfes
                .filter(|n| status.as_ref().map_or(true, |s| &n.data.status == s));
            Ok(page_of(rows, false, page))
        })
    }

    fn nfe_items(&self, nfe_id: i32) -> BoxFuture<'_, StoreResult<Vec<NfeItem>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.nfe_items.filter(|i| i.data.nfe_id == nfe_id))
        })
    }

    fn nfe_events(&self, nfe_id: i32) -> BoxFuture<'_, StoreResult<Vec<NfeEvento>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.nfe_events.filter(|e| e.data.nfe_id == nfe_id))
        })
    }

    fn quotation_items(&self, quotation_id: i32) -> BoxFuture<'_, StoreResult<Vec<QuotationItem>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.quotation_items.filter(|i| i.data.quotation_id == quotation_id))
        })
    }

    fn supplier_quotations(&self, item_id: i32) -> BoxFuture<'_, StoreResult<Vec<SupplierQuotation>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.supplier_quotations.filter(|q| q.data.quotation_item_id == item_id))
        })
    }

    fn select_supplier_quotation(&self, id: i32) -> BoxFuture<'_, StoreResult<SupplierQuotation>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let item_id = tables
                .supplier_quotations
                .rows
                .get(&id)
                .map(|q| q.data.quotation_item_id)
                .ok_or(StoreError::NotFound(SupplierQuotation::ENTITY))?;
            let mut selected = None;
            for offer in tables.supplier_quotations.rows.values_mut() {
                if offer.data.quotation_item_id == item_id {
                    offer.data.is_selected = offer.id == id;
                    if offer.id == id {
                        selected = Some(offer.clone());
                    }
                }
            }
            selected.ok_or(StoreError::NotFound(SupplierQuotation::ENTITY))
        })
    }

    fn product_formulas(&self, product_id: i32) -> BoxFuture<'_, StoreResult<Vec<ProductFormula>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.formulas.filter(|f| f.data.product_id == product_id))
        })
    }

    fn latest_pricing(&self, product_id: i32) -> BoxFuture<'_, StoreResult<Option<ProductPricing>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables
                .pricings
                .rows
                .values()
                .filter(|p| p.data.product_id == product_id)
                .max_by_key(|p| (p.data.calculation_date, p.id))
                .cloned())
        })
    }

    fn room_participants(&self, room_id: i32) -> BoxFuture<'_, StoreResult<Vec<ChatParticipant>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.participants.filter(|p| p.data.room_id == room_id))
        })
    }

    fn participant(
        &self,
        room_id: i32,
        user_id: i32,
    ) -> BoxFuture<'_, StoreResult<Option<ChatParticipant>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables
                .participants
                .rows
                .values()
                .find(|p| p.data.room_id == room_id && p.data.user_id == user_id)
                .cloned())
        })
    }

    fn user_rooms(&self, user_id: i32) -> BoxFuture<'_, StoreResult<Vec<ChatRoom>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let mut rooms: Vec<ChatRoom> = tables
                .participants
                .rows
                .values()
                .filter(|p| p.data.user_id == user_id)
                .filter_map(|p| tables.rooms.rows.get(&p.data.room_id).cloned())
                .collect();
            rooms.sort_by(|a, b| {
                let activity = |r: &ChatRoom| r.data.last_message_at.unwrap_or(r.created_at);
                activity(b).cmp(&activity(a)).then(b.id.cmp(&a.id))
            });
            Ok(rooms)
        })
    }

    fn room_messages(
        &self,
        room_id: i32,
        limit: i64,
        offset: i64,
    ) -> BoxFuture<'_, StoreResult<Vec<ChatMessage>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables
                .messages
                .rows
                .values()
                .rev()
                .filter(|m| m.data.room_id == room_id)
                .skip(usize::try_from(offset).unwrap_or(0))
                .take(usize::try_from(limit).unwrap_or(0))
                .cloned()
                .collect())
        })
    }

    fn thread(&self, parent_id: i32) -> BoxFuture<'_, StoreResult<Vec<ChatMessage>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.messages.filter(|m| m.data.parent_id == Some(parent_id)))
        })
    }

    fn mark_room_read(
        &self,
        room_id: i32,
        user_id: i32,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<usize>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let mut marked = 0;
            for message in tables.messages.rows.values_mut() {
                let d = &mut message.data;
                if d.room_id == room_id && d.user_id != user_id && !d.is_read {
                    d.is_read = true;
                    marked += 1;
                }
            }
            for participant in tables.participants.rows.values_mut() {
                if participant.data.room_id == room_id && participant.data.user_id == user_id {
                    participant.data.last_seen_at = Some(at);
                }
            }
            Ok(marked)
        })
    }

    fn room_uploads(&self, room_id: i32) -> BoxFuture<'_, StoreResult<Vec<ChatUpload>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.uploads.filter(|u| u.data.room_id == room_id))
        })
    }

    fn chat_preferences(&self, user_id: i32) -> BoxFuture<'_, StoreResult<Option<ChatPreferences>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables
                .chat_preferences
                .rows
                .values()
                .find(|p| p.data.user_id == user_id)
                .cloned())
        })
    }

    fn purge_chat(&self, keep_room: Option<i32>) -> BoxFuture<'_, StoreResult<ChatPurge>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let messages = tables.messages.remove_where(|_| true).len();
            tables.uploads.remove_where(|_| true);
            let rooms = tables.rooms.remove_where(|r| Some(r.id) != keep_room);
            tables.participants.remove_where(|p| rooms.contains(&p.data.room_id));
            for log in tables.chat_audit_logs.rows.values_mut() {
                if log.data.room_id.map_or(false, |r| rooms.contains(&r)) {
                    log.data.room_id = None;
                }
            }
            Ok(ChatPurge { messages, rooms: rooms.len() })
        })
    }

    fn record_stock_movement(
        &self,
        data: InventoryTransactionData,
    ) -> BoxFuture<'_, StoreResult<(InventoryTransaction, RawMaterial)>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let kind: TransactionType = data.transaction_type.parse()?;
            let material = tables
                .raw_materials
                .rows
                .get_mut(&data.material_id)
                .ok_or(StoreError::NotFound(RawMaterial::ENTITY))?;
            material.data.current_stock = apply_movement(material.data.current_stock, kind, data.quantity)?;
            let material = material.clone();
            Ok((tables.stock_movements.push(data), material))
        })
    }

    fn create_order(
        &self,
        order: OrderData,
        items: Vec<OrderItemData>,
    ) -> BoxFuture<'_, StoreResult<(Order, Vec<OrderItem>)>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            check_unique::<Order>(&tables, None, &order)?;
            let order = tables.orders.push(order);
            let items: Vec<OrderItem> = items
                .into_iter()
                .map(|item| tables.order_items.push(OrderItemData { order_id: order.id, ..item }))
                .collect();
            Ok((order, items))
        })
    }

    fn order_items(&self, order_id: i32) -> BoxFuture<'_, StoreResult<Vec<OrderItem>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.order_items.filter(|i| i.data.order_id == order_id))
        })
    }

    fn production_losses(&self, order_id: i32) -> BoxFuture<'_, StoreResult<Vec<ProductionLoss>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables.production_losses.filter(|l| l.data.production_order_id == order_id))
        })
    }

    fn produto_fiscal(&self, produto_id: i32) -> BoxFuture<'_, StoreResult<Option<ProdutoFiscal>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            Ok(tables
                .produtos_fiscais
                .rows
                .values()
                .find(|p| p.data.produto_id == produto_id)
                .cloned())
        })
    }
}
