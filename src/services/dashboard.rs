//! Admin dashboard — period aggregation over the revenue collections.
//!
//! DESIGN
//! ======
//! One pass per request: fetch every record of the four revenue collections
//! (scoped to the caller's shop unless they are a global admin), keep the ones
//! whose date falls in the trailing window, then sum per collection, per shop
//! and overall. Client and user counts are joined onto the per-shop rows.
//!
//! Loading and aggregation are split so the arithmetic is a pure function of
//! the fetched data. Per-shop rows are ordered by shop name, then id.
//!
//! ERROR HANDLING
//! ==============
//! Any failed read aborts the whole computation; there is no partial result.
//! A permission failure surfaces as `ReportError::DemoModeRequested`.

use std::collections::HashMap;

use serde::Serialize;
use time::Date;
use tracing::info;

use super::ReportError;
use super::period::{DateWindow, TrailingPeriod};
use crate::model::{ALL_SHOPS, Client, LedgerRecord, RecordKind, Role, ShopScope, User};
use crate::store::{DocumentStore, Query, collections, query_as};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_revenue: f64,
    pub total_transactions: usize,
    pub total_clients: usize,
    pub total_users: usize,
    pub average_per_shop: f64,
    pub active_shops: usize,
    pub total_depots: f64,
}

/// Summed `montant` per revenue collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueTotals {
    pub exchanges: f64,
    pub credit_sales: f64,
    pub deposits: f64,
    pub transactions: f64,
}

impl RevenueTotals {
    fn add(&mut self, kind: RecordKind, amount: f64) {
        match kind {
            RecordKind::Exchange => self.exchanges += amount,
            RecordKind::CreditSale => self.credit_sales += amount,
            RecordKind::Deposit => self.deposits += amount,
            RecordKind::Transaction => self.transactions += amount,
        }
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.exchanges + self.credit_sales + self.deposits + self.transactions
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopPerformance {
    pub shop_id: String,
    pub shop_name: String,
    pub revenue: f64,
    pub transactions: usize,
    pub clients: usize,
    pub users: usize,
    /// Period-over-period growth in percent. Not derived from live data.
    pub growth: f64,
    pub depots: f64,
}

impl ShopPerformance {
    fn empty(shop_id: &str, shop_name: &str) -> Self {
        Self { shop_id: shop_id.to_owned(), shop_name: shop_name.to_owned(), ..Self::default() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total: usize,
    pub admins: usize,
    pub vendeurs: usize,
    pub active: usize,
    pub inactive: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub period: TrailingPeriod,
    pub window: DateWindow,
    pub stats: AdminStats,
    pub totals: RevenueTotals,
    pub shops: Vec<ShopPerformance>,
    pub user_stats: UserStats,
}

/// Everything the aggregation reads, already scoped to the caller.
#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub records: Vec<(RecordKind, Vec<LedgerRecord>)>,
    pub clients: Vec<Client>,
    pub users: Vec<User>,
}

// =============================================================================
// LOADING
// =============================================================================

fn scoped_query(scope: &ShopScope) -> Query {
    match scope {
        ShopScope::All => Query::new(),
        ShopScope::Shop(shop_id) => Query::new().equals("shopId", shop_id.as_str()),
    }
}

async fn load_records(
    store: &dyn DocumentStore,
    kind: RecordKind,
    scope: &ShopScope,
) -> Result<(RecordKind, Vec<LedgerRecord>), ReportError> {
    let query = scoped_query(scope).order_desc("date");
    let records = query_as(store, kind.collection(), &query).await?;
    Ok((kind, records))
}

/// Fetch the revenue collections, clients and users visible to `user`.
///
/// Reads fan out concurrently; the first failure aborts the rest.
///
/// # Errors
///
/// Returns `DemoModeRequested` on a permission failure, otherwise the store
/// error.
pub async fn load_dashboard_data(store: &dyn DocumentStore, user: &User) -> Result<DashboardData, ReportError> {
    let scope = user.scope();
    let plain = scoped_query(&scope);

    let (exchanges, credit_sales, deposits, transactions, clients, users) = tokio::try_join!(
        load_records(store, RecordKind::Exchange, &scope),
        load_records(store, RecordKind::CreditSale, &scope),
        load_records(store, RecordKind::Deposit, &scope),
        load_records(store, RecordKind::Transaction, &scope),
        async { Ok::<_, ReportError>(query_as::<Client>(store, collections::CLIENTS, &plain).await?) },
        async { Ok::<_, ReportError>(query_as::<User>(store, collections::USERS, &plain).await?) },
    )?;

    Ok(DashboardData { records: vec![exchanges, credit_sales, deposits, transactions], clients, users })
}

// =============================================================================
// AGGREGATION
// =============================================================================

#[must_use]
pub fn user_stats(users: &[User]) -> UserStats {
    let admins = users.iter().filter(|u| u.role == Role::Admin).count();
    UserStats {
        total: users.len(),
        admins,
        vendeurs: users.len() - admins,
        active: users.len(),
        inactive: 0,
    }
}

/// Compute the dashboard for `user` over `window` from already-loaded data.
#[must_use]
pub fn aggregate_dashboard(user: &User, period: TrailingPeriod, window: DateWindow, data: &DashboardData) -> Dashboard {
    let global = user.is_global_admin();
    let mut totals = RevenueTotals::default();
    let mut total_transactions = 0_usize;
    let mut by_shop: HashMap<&str, ShopPerformance> = HashMap::new();

    for (kind, records) in &data.records {
        for record in records.iter().filter(|r| window.contains(&r.date)) {
            let amount = record.amount();
            totals.add(*kind, amount);
            total_transactions += 1;

            if global {
                let shop = by_shop.entry(record.shop_id.as_str()).or_insert_with(|| {
                    let name = record.shop_name.as_deref().unwrap_or(&record.shop_id);
                    ShopPerformance::empty(&record.shop_id, name)
                });
                shop.revenue += amount;
                shop.transactions += 1;
                if *kind == RecordKind::Deposit {
                    shop.depots += amount;
                }
            }
        }
    }

    let total_revenue = totals.total();
    let shops = if global {
        for client in &data.clients {
            if let Some(shop) = by_shop.get_mut(client.shop_id.as_str()) {
                shop.clients += 1;
            }
        }
        for member in data.users.iter().filter(|u| u.shop_id != ALL_SHOPS) {
            if let Some(shop) = by_shop.get_mut(member.shop_id.as_str()) {
                shop.users += 1;
            }
        }
        let mut shops: Vec<ShopPerformance> = by_shop.into_values().collect();
        shops.sort_by(|a, b| a.shop_name.cmp(&b.shop_name).then_with(|| a.shop_id.cmp(&b.shop_id)));
        shops
    } else {
        vec![ShopPerformance {
            shop_id: user.shop_id.clone(),
            shop_name: user.shop_name.clone(),
            revenue: total_revenue,
            transactions: total_transactions,
            clients: data.clients.len(),
            users: data.users.len(),
            growth: 0.0,
            depots: totals.deposits,
        }]
    };

    #[allow(clippy::cast_precision_loss)]
    let average_per_shop = if global { total_revenue / shops.len().max(1) as f64 } else { total_revenue };

    let stats = AdminStats {
        total_revenue,
        total_transactions,
        total_clients: data.clients.len(),
        total_users: data.users.len(),
        average_per_shop,
        active_shops: if global { shops.len() } else { 1 },
        total_depots: totals.deposits,
    };

    Dashboard { period, window, stats, totals, shops, user_stats: user_stats(&data.users) }
}

/// Load and aggregate the dashboard for `user`.
///
/// # Errors
///
/// See [`load_dashboard_data`].
pub async fn build_dashboard(
    store: &dyn DocumentStore,
    user: &User,
    period: TrailingPeriod,
    today: Date,
) -> Result<Dashboard, ReportError> {
    let window = period.window(today);
    let data = load_dashboard_data(store, user).await?;
    let dashboard = aggregate_dashboard(user, period, window, &data);
    info!(
        user_id = %user.id,
        start = dashboard.window.start_key(),
        end = dashboard.window.end_key(),
        revenue = dashboard.stats.total_revenue,
        transactions = dashboard.stats.total_transactions,
        shops = dashboard.shops.len(),
        "dashboard computed"
    );
    Ok(dashboard)
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
