//! Status and category vocabularies stored as text columns, with the
//! lifecycle transitions each one allows.

use crate::text_enum::text_enum;
use crate::RuleError;

text_enum! {
    pub enum EmployeeStatus {
        Active => "active",
        Terminated => "terminated",
        OnLeave => "on_leave",
    }
}

text_enum! {
    pub enum LeaveType {
        Vacation => "vacation",
        Sick => "sick",
        Personal => "personal",
        Maternity => "maternity",
        Paternity => "paternity",
    }
}

text_enum! {
    pub enum LeaveStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Completed => "completed",
    }
}

impl LeaveStatus {
    /// Approve or reject a request. Only pending requests can be decided.
    pub fn decide(self, approve: bool) -> Result<LeaveStatus, RuleError> {
        let to = if approve { LeaveStatus::Approved } else { LeaveStatus::Rejected };
        match self {
            LeaveStatus::Pending => Ok(to),
            from => Err(RuleError::Transition { from: from.as_str(), to: to.as_str() }),
        }
    }

    /// Whether a leave in this state reserves its date range.
    pub fn holds_dates(self) -> bool {
        matches!(self, LeaveStatus::Pending | LeaveStatus::Approved)
    }
}

text_enum! {
    pub enum PayrollStatus {
        Pending => "pending",
        Processed => "processed",
        Paid => "paid",
    }
}

impl PayrollStatus {
    pub fn advance_to(self, to: PayrollStatus) -> Result<PayrollStatus, RuleError> {
        match (self, to) {
            (PayrollStatus::Pending, PayrollStatus::Processed)
            | (PayrollStatus::Processed, PayrollStatus::Paid) => Ok(to),
            (from, to) if from == to => Ok(to),
            (from, to) => Err(RuleError::Transition { from: from.as_str(), to: to.as_str() }),
        }
    }
}

text_enum! {
    pub enum AlertPriority {
        High => "high",
        Medium => "medium",
        Low => "low",
    }
}

impl AlertPriority {
    /// Sort rank, most urgent first.
    pub fn rank(self) -> u8 {
        match self {
            AlertPriority::High => 0,
            AlertPriority::Medium => 1,
            AlertPriority::Low => 2,
        }
    }
}

text_enum! {
    pub enum AlertStatus {
        Active => "active",
        Acknowledged => "acknowledged",
        Resolved => "resolved",
    }
}

impl AlertStatus {
    pub fn acknowledge(self) -> Result<AlertStatus, RuleError> {
        match self {
            AlertStatus::Active => Ok(AlertStatus::Acknowledged),
            from => Err(RuleError::Transition { from: from.as_str(), to: "acknowledged" }),
        }
    }

    pub fn resolve(self) -> Result<AlertStatus, RuleError> {
        match self {
            AlertStatus::Active | AlertStatus::Acknowledged => Ok(AlertStatus::Resolved),
            from => Err(RuleError::Transition { from: from.as_str(), to: "resolved" }),
        }
    }
}

text_enum! {
    /// Lifecycle of an issued NF-e.
    pub enum NfeStatus {
        Draft => "em_digitacao",
        Sent => "enviada",
        Authorized => "autorizada",
        Rejected => "rejeitada",
        Cancelled => "cancelada",
    }
}

impl NfeStatus {
    pub fn is_editable(self) -> bool {
        self == NfeStatus::Draft
    }

    pub fn can_send(self) -> bool {
        matches!(self, NfeStatus::Draft | NfeStatus::Rejected)
    }

    pub fn can_cancel(self) -> bool {
        self == NfeStatus::Authorized
    }
}

text_enum! {
    pub enum Ambiente {
        Homologacao => "homologacao",
        Producao => "producao",
    }
}

impl Ambiente {
    /// `tpAmb` as written in the NF-e XML.
    pub fn code(self) -> u8 {
        match self {
            Ambiente::Producao => 1,
            Ambiente::Homologacao => 2,
        }
    }
}

text_enum! {
    pub enum TaxRegime {
        Simples => "simples",
        Presumido => "presumido",
        Real => "real",
    }
}

text_enum! {
    pub enum CfopDirection {
        Inbound => "entrada",
        Outbound => "saida",
    }
}

text_enum! {
    pub enum CstKind {
        Icms => "ICMS",
        Pis => "PIS",
        Cofins => "COFINS",
        Ipi => "IPI",
    }
}

text_enum! {
    pub enum NfeEventKind {
        Submission => "envio",
        Query => "consulta",
        Cancellation => "cancelamento",
    }
}

text_enum! {
    pub enum QuotationStatus {
        Open => "open",
        Closed => "closed",
        Cancelled => "cancelled",
    }
}

text_enum! {
    pub enum InspectionType {
        Incoming => "incoming",
        Outgoing => "outgoing",
        InProcess => "in-process",
    }
}

text_enum! {
    pub enum InspectionReference {
        RawMaterial => "raw-material",
        Product => "product",
        Production => "production",
    }
}

text_enum! {
    pub enum InspectionResult {
        Approved => "approved",
        Rejected => "rejected",
        Pending => "pending",
    }
}

text_enum! {
    pub enum Severity {
        Critical => "critical",
        Major => "major",
        Minor => "minor",
    }
}

text_enum! {
    pub enum NonConformityStatus {
        Open => "open",
        Investigating => "investigating",
        Resolved => "resolved",
    }
}

impl NonConformityStatus {
    /// An issue is investigated before it can be resolved; resolved issues
    /// may be reopened.
    pub fn move_to(self, to: NonConformityStatus) -> Result<NonConformityStatus, RuleError> {
        use NonConformityStatus::*;
        match (self, to) {
            (Open, Investigating)
            | (Investigating, Open)
            | (Investigating, Resolved)
            | (Resolved, Open)
            | (Resolved, Investigating) => Ok(to),
            (from, to) if from == to => Ok(to),
            (from, to) => Err(RuleError::Transition { from: from.as_str(), to: to.as_str() }),
        }
    }
}

text_enum! {
    pub enum AccountType {
        Payable => "payable",
        Receivable => "receivable",
    }
}

text_enum! {
    pub enum AccountStatus {
        Pending => "pending",
        Paid => "paid",
        Overdue => "overdue",
    }
}

impl AccountStatus {
    pub fn pay(self) -> Result<AccountStatus, RuleError> {
        match self {
            AccountStatus::Pending | AccountStatus::Overdue => Ok(AccountStatus::Paid),
            from => Err(RuleError::Transition { from: from.as_str(), to: AccountStatus::Paid.as_str() }),
        }
    }
}

text_enum! {
    pub enum ProductionStatus {
        Planned => "planned",
        InProgress => "in-progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl ProductionStatus {
    pub fn move_to(self, to: ProductionStatus) -> Result<ProductionStatus, RuleError> {
        use ProductionStatus::*;
        match (self, to) {
            (Planned, InProgress)
            | (Planned, Cancelled)
            | (InProgress, Completed)
            | (InProgress, Cancelled) => Ok(to),
            (from, to) if from == to => Ok(to),
            (from, to) => Err(RuleError::Transition { from: from.as_str(), to: to.as_str() }),
        }
    }

    pub fn is_closed(self) -> bool {
        matches!(self, ProductionStatus::Completed | ProductionStatus::Cancelled)
    }
}

text_enum! {
    /// Equipment criticality and maintenance urgency.
    pub enum Level {
        High => "high",
        Medium => "medium",
        Low => "low",
    }
}

text_enum! {
    pub enum EquipmentStatus {
        Operational => "operational",
        Maintenance => "maintenance",
        Broken => "broken",
    }
}

text_enum! {
    pub enum MaintenanceType {
        Preventive => "preventive",
        Corrective => "corrective",
    }
}

text_enum! {
    pub enum MaintenanceStatus {
        Open => "open",
        InProgress => "in-progress",
        Completed => "completed",
    }
}

impl MaintenanceStatus {
    /// Completed orders stay completed.
    pub fn move_to(self, to: MaintenanceStatus) -> Result<MaintenanceStatus, RuleError> {
        match (self, to) {
            (from, to) if from == to => Ok(to),
            (MaintenanceStatus::Completed, to) => Err(RuleError::Transition {
                from: MaintenanceStatus::Completed.as_str(),
                to: to.as_str(),
            }),
            (_, to) => Ok(to),
        }
    }
}

text_enum! {
    pub enum TransactionType {
        In => "in",
        Out => "out",
    }
}

text_enum! {
    pub enum OrderStatus {
        New => "new",
        InProgress => "in-progress",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
}

impl OrderStatus {
    pub fn move_to(self, to: OrderStatus) -> Result<OrderStatus, RuleError> {
        use OrderStatus::*;
        match (self, to) {
            (New, InProgress) | (New, Cancelled) | (InProgress, Delivered) | (InProgress, Cancelled) => {
                Ok(to)
            }
            (from, to) if from == to => Ok(to),
            (from, to) => Err(RuleError::Transition { from: from.as_str(), to: to.as_str() }),
        }
    }

    /// Items can change only before work starts.
    pub fn is_editable(self) -> bool {
        self == OrderStatus::New
    }
}

text_enum! {
    pub enum RoomType {
        Channel => "channel",
        Direct => "direct",
        Team => "team",
    }
}

text_enum! {
    pub enum Visibility {
        Public => "public",
        Private => "private",
    }
}

text_enum! {
    pub enum TicketStatus {
        Open => "aberto",
        InProgress => "em_andamento",
        Resolved => "resolvido",
        Closed => "fechado",
    }
}

impl TicketStatus {
    pub fn is_closed(self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }
}

text_enum! {
    pub enum TicketPriority {
        Low => "baixa",
        Normal => "normal",
        High => "alta",
        Urgent => "urgente",
    }
}

text_enum! {
    pub enum AuditAction {
        Create => "create",
        Update => "update",
        Delete => "delete",
    }
}

text_enum! {
    pub enum ChatAction {
        Send => "send",
        Edit => "edit",
        Delete => "delete",
    }
}
