use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{Days, NaiveDate, Utc};
use shared::status::{AccountStatus, AlertPriority, AlertStatus, LeaveStatus};
use shared::Module;
use tokio::time;
use tracing::{error, info, warn};

use crate::models::*;
use crate::store::Storage;

pub const CERTIFICATE_ALERT: &str = "fiscal_certificate";

/// Periodic upkeep that no request triggers on its own.
pub struct Sweeper {
    store: Arc<dyn Storage>,
    every: Duration,
    warning_days: u64,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub leaves_completed: usize,
    pub alerts_raised: usize,
    pub accounts_overdue: usize,
}

impl Sweeper {
    pub fn new(store: Arc<dyn Storage>, every: Duration, warning_days: u64) -> Self {
        Self { store, every, warning_days }
    }

    pub async fn run(&self) {
        let mut interval = time::interval(self.every);

        loop {
            interval.tick().await;

            let report = self.sweep(Utc::now().date_naive()).await;
            if report != SweepReport::default() {
                info!(
                    "Sweep finished: {} leaves completed, {} alerts raised, {} accounts overdue",
                    report.leaves_completed, report.alerts_raised, report.accounts_overdue
                );
            }
        }
    }

    /// Each pass runs even when another fails.
    pub async fn sweep(&self, today: NaiveDate) -> SweepReport {
        let leaves_completed = self.complete_leaves(today).await.unwrap_or_else(|e| {
            error!("Error completing leaves: {}", e);
            0
        });
        let alerts_raised = self.certificate_alerts(today).await.unwrap_or_else(|e| {
            error!("Error raising certificate alerts: {}", e);
            0
        });
        let accounts_overdue = self.overdue_accounts(today).await.unwrap_or_else(|e| {
            error!("Error marking overdue accounts: {}", e);
            0
        });
        SweepReport { leaves_completed, alerts_raised, accounts_overdue }
    }

    /// Approved leaves whose last day is behind us become completed.
    async fn complete_leaves(&self, today: NaiveDate) -> Result<usize> {
        let approved = LeaveStatus::Approved.as_str();
        let finished: Vec<Leave> = self
            .store
            .all::<Leave>()
            .await?
            .into_iter()
            .filter(|l| l.data.status == approved && l.data.end_date < today)
            .collect();
        Ok(self.finish_leaves(&finished).await)
    }

    async fn finish_leaves(&self, leaves: &[Leave]) -> usize {
        let mut completed = 0;
        for leave in leaves {
            let changes = LeaveChanges {
                status: Some(LeaveStatus::Completed.to_string()),
                ..Default::default()
            };
            match self.store.update::<Leave>(leave.id, changes).await {
                Ok(_) => completed += 1,
                Err(e) => warn!("Could not complete leave {}: {}", leave.id, e),
            }
        }
        completed
    }

    /// Pending accounts past their due date become overdue.
    async fn overdue_accounts(&self, today: NaiveDate) -> Result<usize> {
        let pending = AccountStatus::Pending.as_str();
        let mut marked = 0;
        for account in self.store.all::<Account>().await? {
            if account.data.status != pending || account.data.due_date >= today {
                continue;
            }
            let changes = AccountChanges {
                status: Some(AccountStatus::Overdue.to_string()),
                ..Default::default()
            };
            match self.store.update::<Account>(account.id, changes).await {
                Ok(_) => marked += 1,
                Err(e) => warn!("Could not mark account {} overdue: {}", account.id, e),
            }
        }
        Ok(marked)
    }

    /// One open alert per active certificate that expires within the warning
    /// window or has already expired.
    async fn certificate_alerts(&self, today: NaiveDate) -> Result<usize> {
        let horizon = today
            .checked_add_days(Days::new(self.warning_days))
            .unwrap_or(NaiveDate::MAX);
        let alerts = self.store.all::<SystemAlert>().await?;
        let resolved = AlertStatus::Resolved.as_str();
        let already_raised = |certificate: i32| {
            alerts.iter().any(|a| {
                a.data.reference_type.as_deref() == Some(CERTIFICATE_ALERT)
                    && a.data.reference_id == Some(certificate)
                    && a.data.status != resolved
            })
        };

        let mut raised = 0;
        for cert in self.store.all::<FiscalCertificate>().await? {
            let data = &cert.data;
            if !data.is_active || data.valid_to > horizon || already_raised(cert.id) {
                continue;
            }
            let (message, priority) = if data.valid_to < today {
                (
                    format!("Certificado digital '{}' expirou em {}", data.name, data.valid_to),
                    AlertPriority::High,
                )
            } else {
                (
                    format!("Certificado digital '{}' expira em {}", data.name, data.valid_to),
                    AlertPriority::Medium,
                )
            };
            self.store
                .create::<SystemAlert>(SystemAlertData {
                    message,
                    priority: priority.to_string(),
                    status: AlertStatus::Active.to_string(),
                    module: Module::Fiscal.to_string(),
                    reference_type: Some(CERTIFICATE_ALERT.to_string()),
                    reference_id: Some(cert.id),
                    created_by: None,
                    acknowledged_at: None,
                    acknowledged_by: None,
                    resolved_at: None,
                    resolved_by: None,
                })
                .await?;
            raised += 1;
        }
        Ok(raised)
    }
}
