//! Cash reports — morning/evening register reports and submitted register
//! reports.
//!
//! DESIGN
//! ======
//! An `operations` report is keyed by shop, calendar day and period; a second
//! report for the same key is rejected rather than overwritten. The check is
//! a read followed by a write, so two concurrent submissions can still both
//! land; the profit series tolerates that by keeping the last one read.
//!
//! `rapports_caisse` documents are listed newest first. A background poller
//! keeps a snapshot of the most recent ones in `AppState` so the recent
//! reports endpoint never touches the store. The snapshot is bucketed per
//! shop, so a quiet shop still sees its own latest reports when busier shops
//! fill the overall list.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::period::{DateWindow, date_key, format_date, today};
use super::poller::{PollConfig, PollHandle, spawn_poll};
use crate::model::{CashRegisterReport, CashReport, ReportPeriod, ShopScope, User, de_amount_opt};
use crate::state::AppState;
use crate::store::{DocumentStore, Query, StoreError, collections, encode, query_as};

#[derive(Debug, thiserror::Error)]
pub enum CashReportError {
    #[error("a {periode} report already exists for shop {shop_id} on {date}")]
    Duplicate { shop_id: String, date: String, periode: &'static str },
    #[error("a target shop is required")]
    MissingShop,
    #[error("shop not visible to caller: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCashReport {
    #[serde(default)]
    pub shop_id: Option<String>,
    /// Defaults to today.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(rename = "periode_rapport")]
    pub periode: ReportPeriod,
    #[serde(rename = "total_general", default, deserialize_with = "de_amount_opt")]
    pub total_general: Option<f64>,
    #[serde(rename = "espece_en_caisse", default, deserialize_with = "de_amount_opt")]
    pub espece_en_caisse: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Criteria for `rapports_caisse` listings. Text criteria match
/// case-insensitively on substrings; `date` is a prefix (`2024`, `2024-01`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CashReportFilter {
    pub shop: Option<String>,
    pub user: Option<String>,
    pub date: Option<String>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl CashReportFilter {
    #[must_use]
    pub fn matches(&self, report: &CashRegisterReport) -> bool {
        self.shop.as_deref().is_none_or(|s| contains_ci(&report.shop_name, s))
            && self.user.as_deref().is_none_or(|u| contains_ci(&report.user_nom, u))
            && self.date.as_deref().is_none_or(|d| report.date.starts_with(d))
    }
}

// =============================================================================
// OPERATIONS REPORTS
// =============================================================================

fn report_shop(user: &User, requested: Option<&str>) -> Result<String, CashReportError> {
    match (user.scope(), requested.filter(|s| !s.is_empty())) {
        (ShopScope::All, Some(shop)) => Ok(shop.to_owned()),
        (ShopScope::All, None) => Err(CashReportError::MissingShop),
        (ShopScope::Shop(own), Some(shop)) if shop != own => Err(CashReportError::Forbidden(shop.to_owned())),
        (ShopScope::Shop(own), _) => Ok(own),
    }
}

/// Submit a morning or evening report.
///
/// # Errors
///
/// `Duplicate` when the shop already reported that period on that day;
/// `MissingShop`/`Forbidden` for an unusable target shop; store failures.
pub async fn create_operation(
    store: &dyn DocumentStore,
    user: &User,
    input: NewCashReport,
) -> Result<CashReport, CashReportError> {
    let shop_id = report_shop(user, input.shop_id.as_deref())?;
    let date = input.date.filter(|d| !d.is_empty()).unwrap_or_else(|| format_date(today()));

    let same_period = Query::new()
        .equals("shopId", shop_id.as_str())
        .equals("periode_rapport", input.periode.as_str());
    let existing: Vec<CashReport> = query_as(store, collections::OPERATIONS, &same_period).await?;
    if existing.iter().any(|r| date_key(&r.date) == date_key(&date)) {
        return Err(CashReportError::Duplicate {
            shop_id,
            date: date_key(&date).to_owned(),
            periode: input.periode.as_str(),
        });
    }

    let mut extra = input.extra;
    extra.remove("id");
    let mut report = CashReport {
        id: String::new(),
        shop_name: Some(if user.is_global_admin() { shop_id.clone() } else { user.shop_name.clone() }),
        shop_id,
        user_id: Some(user.id.clone()),
        date,
        periode_rapport: input.periode,
        total_general: input.total_general,
        espece_en_caisse: input.espece_en_caisse,
        extra,
    };
    report.id = store.create(collections::OPERATIONS, encode(&report)?).await?;
    info!(
        report_id = %report.id,
        shop_id = %report.shop_id,
        date = %report.date,
        periode = report.periode_rapport.as_str(),
        "cash report submitted"
    );
    Ok(report)
}

/// Operations reports visible to `user`, newest first.
///
/// # Errors
///
/// `Forbidden` when asking for another shop; store failures.
pub async fn list_operations(
    store: &dyn DocumentStore,
    user: &User,
    shop_id: Option<&str>,
    window: Option<&DateWindow>,
) -> Result<Vec<CashReport>, CashReportError> {
    let mut query = match (user.scope(), shop_id) {
        (ShopScope::All, None) => Query::new(),
        (ShopScope::All, Some(shop)) => Query::new().equals("shopId", shop),
        (ShopScope::Shop(own), Some(shop)) if shop != own => return Err(CashReportError::Forbidden(shop.to_owned())),
        (ShopScope::Shop(own), _) => Query::new().equals("shopId", own),
    };
    if let Some(window) = window {
        query = query.at_least("date", window.start_key());
    }
    let reports: Vec<CashReport> = query_as(store, collections::OPERATIONS, &query.order_desc("date")).await?;
    Ok(reports
        .into_iter()
        .filter(|r| window.is_none_or(|w| w.contains(&r.date)))
        .collect())
}

// =============================================================================
// REGISTER REPORTS
// =============================================================================

fn register_report_visible(report: &CashRegisterReport, user: &User) -> bool {
    match user.scope() {
        ShopScope::All => true,
        ShopScope::Shop(own) => match &report.shop_id {
            Some(shop_id) => *shop_id == own,
            None => report.shop_name == user.shop_name,
        },
    }
}

/// `rapports_caisse` documents visible to `user` matching `filter`, newest
/// first.
///
/// # Errors
///
/// Propagates store failures.
pub async fn list_cash_reports(
    store: &dyn DocumentStore,
    user: &User,
    filter: &CashReportFilter,
) -> Result<Vec<CashRegisterReport>, CashReportError> {
    let query = Query::new().order_desc("date");
    let reports: Vec<CashRegisterReport> = query_as(store, collections::RAPPORTS_CAISSE, &query).await?;
    Ok(reports
        .into_iter()
        .filter(|r| register_report_visible(r, user) && filter.matches(r))
        .collect())
}

/// Newest register reports, overall and per shop.
///
/// Each bucket holds at most `limit` reports, newest first. Reports without a
/// `shopId` are bucketed by shop name.
#[derive(Debug, Clone, Default)]
pub struct RecentReports {
    limit: usize,
    overall: Vec<CashRegisterReport>,
    by_shop: HashMap<String, Vec<CashRegisterReport>>,
    by_shop_name: HashMap<String, Vec<CashRegisterReport>>,
}

impl RecentReports {
    /// Bucket `reports`, which must already be ordered newest first.
    #[must_use]
    pub fn from_newest(reports: Vec<CashRegisterReport>, limit: usize) -> Self {
        let mut recent = Self { limit, ..Self::default() };
        for report in reports {
            let bucket = match &report.shop_id {
                Some(shop_id) => recent.by_shop.entry(shop_id.clone()).or_default(),
                None => recent.by_shop_name.entry(report.shop_name.clone()).or_default(),
            };
            if bucket.len() < limit {
                bucket.push(report.clone());
            }
            if recent.overall.len() < limit {
                recent.overall.push(report);
            }
        }
        recent
    }

    /// Reports `user` may see: the overall list for a global administrator,
    /// otherwise the newest of the caller's shop.
    #[must_use]
    pub fn for_user(&self, user: &User) -> Vec<CashRegisterReport> {
        let ShopScope::Shop(own) = user.scope() else {
            return self.overall.clone();
        };
        let by_id = self.by_shop.get(&own).into_iter().flatten();
        let by_name = self.by_shop_name.get(&user.shop_name).into_iter().flatten();
        let mut reports: Vec<CashRegisterReport> = by_id.chain(by_name).cloned().collect();
        reports.sort_by(|a, b| date_key(&b.date).cmp(date_key(&a.date)));
        reports.truncate(self.limit);
        reports
    }

    /// Number of reports in the overall list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.overall.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overall.is_empty()
    }
}

/// Every register report, newest first.
///
/// # Errors
///
/// Propagates store failures.
pub async fn fetch_newest(store: &dyn DocumentStore) -> Result<Vec<CashRegisterReport>, StoreError> {
    let query = Query::new().order_desc("date");
    query_as(store, collections::RAPPORTS_CAISSE, &query).await
}

/// Replace the shared snapshot with the latest register reports, keeping
/// `limit` overall and `limit` per shop.
///
/// # Errors
///
/// Propagates store failures; the snapshot is left untouched.
pub async fn refresh_recent(
    store: &dyn DocumentStore,
    snapshot: &RwLock<RecentReports>,
    limit: usize,
) -> Result<(), StoreError> {
    let recent = RecentReports::from_newest(fetch_newest(store).await?, limit);
    debug!(count = recent.len(), shops = recent.by_shop.len(), "recent reports refreshed");
    *snapshot.write().await = recent;
    Ok(())
}

/// Recent reports from the snapshot that `user` may see.
pub async fn recent_for(snapshot: &RwLock<RecentReports>, user: &User) -> Vec<CashRegisterReport> {
    snapshot.read().await.for_user(user)
}

/// Start the background refresh of `state.recent_reports`.
#[must_use]
pub fn spawn_recent_reports_poller(state: &AppState) -> PollHandle {
    let config = PollConfig::new(state.config.reports_poll, state.config.poll_max_backoff);
    let limit = state.config.recent_reports_limit;
    let store = Arc::clone(&state.store);
    let snapshot = Arc::clone(&state.recent_reports);
    info!(interval_secs = config.interval.as_secs(), limit, "recent reports poller configured");
    spawn_poll("recent_reports", config, move || {
        let store = Arc::clone(&store);
        let snapshot = Arc::clone(&snapshot);
        async move { refresh_recent(store.as_ref(), &snapshot, limit).await }
    })
}

#[cfg(test)]
#[path = "reports_test.rs"]
mod tests;
