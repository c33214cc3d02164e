//! Synthesis — day-over-day profit, shop balance sheets and data reports.
//!
//! DESIGN
//! ======
//! Profit is derived from evening (`soir`) cash reports: for each shop the
//! evening `total_general` values are keyed by calendar day, walked in date
//! order, and each day's profit is the difference from the previous reported
//! day (the first reported day yields 0). The series is computed over the
//! shop's whole history and only then restricted to the window, so the first
//! day of a window is measured against the last evening before it.
//!
//! Per-shop series merge into one chronological table. Best and worst shops
//! are the strict arg-max / arg-min of summed window profit over shops that
//! reported at least one evening in the window; shops are visited in name
//! order, so ties go to the alphabetically first shop.
//!
//! Window reads use a `date >= start` store filter as a lower bound and apply
//! the inclusive day comparison in memory, which keeps timestamped dates on
//! their calendar day.

use std::collections::BTreeMap;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info};

use super::ReportError;
use super::period::{CalendarPeriod, DateWindow, date_key};
use crate::model::{
    CardMovement, CardMovementKind, CashReport, LedgerRecord, Movement, MovementDirection, ReportPeriod, Shop, ShopScope,
    User,
};
use crate::store::{DocumentStore, Query, collections, get_as, query_as};

/// Margin applied to sales for the estimated profit of a data report.
pub const ESTIMATED_MARGIN: f64 = 0.15;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitPoint {
    pub date: String,
    pub total_general: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopSynthesis {
    pub shop_id: String,
    pub shop_name: String,
    pub points: Vec<ProfitPoint>,
    pub total_profit: f64,
}

/// One row of the merged multi-shop table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesRow {
    pub date: String,
    /// Profit per shop id, for shops that reported that day.
    pub profits: BTreeMap<String, f64>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopRanking {
    pub shop_id: String,
    pub shop_name: String,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Synthesis {
    pub window: DateWindow,
    pub shops: Vec<ShopSynthesis>,
    pub series: Vec<SeriesRow>,
    pub total_profit: f64,
    pub best: Option<ShopRanking>,
    pub worst: Option<ShopRanking>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub shop_id: String,
    pub window: DateWindow,
    pub expenses: f64,
    pub card_deposits: f64,
    pub card_withdrawals: f64,
    pub movements: f64,
    pub movements_in: f64,
    pub movements_out: f64,
    pub capital_initial: f64,
    pub has_capital_initial: bool,
    pub closing_total: f64,
    pub has_closing_total: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheet {
    pub shop_id: String,
    pub period: CalendarPeriod,
    pub window: DateWindow,
    pub total_general: f64,
    pub previous_total: f64,
    pub variation: f64,
    pub adjusted_previous_total: f64,
    pub net_profit: f64,
    pub movements: Vec<Movement>,
    pub daily_profits: Vec<ProfitPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataReport {
    pub shop_id: String,
    pub window: DateWindow,
    pub total_sales: f64,
    pub total_deposits: f64,
    pub total_in: f64,
    pub total_out: f64,
    pub estimated_profit: f64,
    pub operation_count: usize,
    pub deposit_count: usize,
    pub movement_count: usize,
}

// =============================================================================
// PURE COMPUTATION
// =============================================================================

/// Day-over-day profit from evening reports. Morning reports are ignored; a
/// day reported twice keeps the last report read.
#[must_use]
pub fn profit_series(reports: &[CashReport]) -> Vec<ProfitPoint> {
    let by_day: BTreeMap<&str, f64> = reports
        .iter()
        .filter(|r| r.periode_rapport == ReportPeriod::Soir)
        .map(|r| (date_key(&r.date), r.total()))
        .collect();

    let mut previous: Option<f64> = None;
    by_day
        .into_iter()
        .map(|(date, total)| {
            let profit = previous.map_or(0.0, |prev| total - prev);
            previous = Some(total);
            ProfitPoint { date: date.to_owned(), total_general: total, profit }
        })
        .collect()
}

/// Keep only the points whose date lies in `window`.
#[must_use]
pub fn restrict(points: Vec<ProfitPoint>, window: &DateWindow) -> Vec<ProfitPoint> {
    points.into_iter().filter(|p| window.contains(&p.date)).collect()
}

/// Merge per-shop series into one chronological table.
#[must_use]
pub fn merge_series(shops: &[ShopSynthesis]) -> Vec<SeriesRow> {
    let mut rows: BTreeMap<&str, SeriesRow> = BTreeMap::new();
    for shop in shops {
        for point in &shop.points {
            let row = rows.entry(point.date.as_str()).or_insert_with(|| SeriesRow {
                date: point.date.clone(),
                profits: BTreeMap::new(),
                total: 0.0,
            });
            row.profits.insert(shop.shop_id.clone(), point.profit);
            row.total += point.profit;
        }
    }
    rows.into_values().collect()
}

/// Best and worst shop by summed profit. `shops` must already be in
/// tie-break order; the first shop wins a tie.
#[must_use]
pub fn rank_shops(shops: &[ShopSynthesis]) -> (Option<ShopRanking>, Option<ShopRanking>) {
    let mut best: Option<&ShopSynthesis> = None;
    let mut worst: Option<&ShopSynthesis> = None;
    for shop in shops.iter().filter(|s| !s.points.is_empty()) {
        if best.is_none_or(|b| shop.total_profit > b.total_profit) {
            best = Some(shop);
        }
        if worst.is_none_or(|w| shop.total_profit < w.total_profit) {
            worst = Some(shop);
        }
    }
    let ranking = |s: &ShopSynthesis| ShopRanking {
        shop_id: s.shop_id.clone(),
        shop_name: s.shop_name.clone(),
        profit: s.total_profit,
    };
    (best.map(ranking), worst.map(ranking))
}

fn sum_amounts(records: &[LedgerRecord]) -> f64 {
    records.iter().map(LedgerRecord::amount).sum()
}

/// Card deposits and card withdrawals, summed separately.
fn card_totals(movements: &[CardMovement]) -> (f64, f64) {
    movements
        .iter()
        .fold((0.0, 0.0), |(deposits, withdrawals), m| match m.kind {
            CardMovementKind::Depot => (deposits + m.montant, withdrawals),
            CardMovementKind::Retrait => (deposits, withdrawals + m.montant),
        })
}

fn movement_totals(movements: &[Movement]) -> (f64, f64) {
    movements
        .iter()
        .fold((0.0, 0.0), |(inflow, outflow), m| match m.operation {
            Some(MovementDirection::In) => (inflow + m.montant, outflow),
            Some(MovementDirection::Out) => (inflow, outflow + m.montant),
            None => (inflow, outflow),
        })
}

/// The report standing for a set of same-day reports: evening, else morning.
fn closing_of<'a>(reports: impl IntoIterator<Item = &'a CashReport>) -> Option<&'a CashReport> {
    let mut morning = None;
    let mut evening = None;
    for report in reports {
        match report.periode_rapport {
            ReportPeriod::Soir => evening = Some(report),
            ReportPeriod::Matin => morning = Some(report),
        }
    }
    evening.or(morning)
}

/// Closing report of the latest reported day in `reports`.
fn latest_closing(reports: &[CashReport]) -> Option<&CashReport> {
    let last_day = reports.iter().map(|r| date_key(&r.date)).max()?;
    closing_of(reports.iter().filter(|r| date_key(&r.date) == last_day))
}

// =============================================================================
// STORE ACCESS
// =============================================================================

fn ensure_visible(user: &User, shop_id: &str) -> Result<(), ReportError> {
    if user.scope().allows(shop_id) {
        Ok(())
    } else {
        Err(ReportError::Forbidden(shop_id.to_owned()))
    }
}

fn window_query(shop_id: &str, window: &DateWindow) -> Query {
    Query::new()
        .equals("shopId", shop_id)
        .at_least("date", window.start_key())
}

async fn window_read<T>(
    store: &dyn DocumentStore,
    collection: &str,
    shop_id: &str,
    window: &DateWindow,
    date_of: impl Fn(&T) -> &str,
) -> Result<Vec<T>, ReportError>
where
    T: serde::de::DeserializeOwned,
{
    let rows: Vec<T> = query_as(store, collection, &window_query(shop_id, window)).await?;
    Ok(rows.into_iter().filter(|row| window.contains(date_of(row))).collect())
}

async fn evening_history(store: &dyn DocumentStore, shop_id: &str) -> Result<Vec<CashReport>, ReportError> {
    let query = Query::new()
        .equals("shopId", shop_id)
        .equals("periode_rapport", ReportPeriod::Soir.as_str())
        .order_asc("date");
    Ok(query_as(store, collections::OPERATIONS, &query).await?)
}

/// Shops visible to `user`, in tie-break order (name, then id).
///
/// # Errors
///
/// Propagates store failures as `ReportError`.
pub async fn visible_shops(store: &dyn DocumentStore, user: &User) -> Result<Vec<Shop>, ReportError> {
    let mut shops = match user.scope() {
        ShopScope::All => query_as::<Shop>(store, collections::SHOPS, &Query::new()).await?,
        ShopScope::Shop(shop_id) => {
            let shop = get_as::<Shop>(store, collections::SHOPS, &shop_id).await?;
            vec![shop.unwrap_or_else(|| Shop { id: shop_id, name: user.shop_name.clone(), ..Shop::default() })]
        }
    };
    shops.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    Ok(shops)
}

async fn shop_synthesis(store: &dyn DocumentStore, shop: &Shop, window: &DateWindow) -> Result<ShopSynthesis, ReportError> {
    let history = evening_history(store, &shop.id).await?;
    let points = restrict(profit_series(&history), window);
    let total_profit = points.iter().map(|p| p.profit).sum();
    debug!(shop_id = %shop.id, days = points.len(), total_profit, "shop profit series computed");
    Ok(ShopSynthesis { shop_id: shop.id.clone(), shop_name: shop.name.clone(), points, total_profit })
}

/// Multi-shop profit synthesis over `window`.
///
/// # Errors
///
/// Returns `DemoModeRequested` on a permission failure, otherwise the store
/// error.
pub async fn build_synthesis(store: &dyn DocumentStore, user: &User, window: DateWindow) -> Result<Synthesis, ReportError> {
    let shops = visible_shops(store, user).await?;
    let per_shop = try_join_all(shops.iter().map(|shop| shop_synthesis(store, shop, &window))).await?;

    let series = merge_series(&per_shop);
    let (best, worst) = rank_shops(&per_shop);
    let total_profit = per_shop.iter().map(|s| s.total_profit).sum();
    info!(
        user_id = %user.id,
        shops = per_shop.len(),
        days = series.len(),
        total_profit,
        "synthesis computed"
    );
    Ok(Synthesis { window, shops: per_shop, series, total_profit, best, worst })
}

/// Expenses, card deposits and withdrawals, movements and opening/closing
/// totals for one shop over `window`. Movements without an `Entrée`/`Sortie`
/// direction are not counted.
///
/// # Errors
///
/// `Forbidden` if the shop is outside the caller's scope; store failures
/// otherwise.
pub async fn daily_summary(
    store: &dyn DocumentStore,
    user: &User,
    shop_id: &str,
    window: DateWindow,
) -> Result<DailySummary, ReportError> {
    ensure_visible(user, shop_id)?;

    let (expenses, card_movements, movements, reports) = tokio::try_join!(
        window_read::<LedgerRecord>(store, collections::DEPENSES, shop_id, &window, |r| &r.date),
        window_read::<CardMovement>(store, collections::DEPOT_CARTE, shop_id, &window, |m| &m.date),
        window_read::<Movement>(store, collections::MOUVEMENTS, shop_id, &window, |m| &m.date),
        window_read::<CashReport>(store, collections::OPERATIONS, shop_id, &window, |r| &r.date),
    )?;

    let (card_deposits, card_withdrawals) = card_totals(&card_movements);
    let (movements_in, movements_out) = movement_totals(&movements);
    let morning = reports
        .iter()
        .filter(|r| r.periode_rapport == ReportPeriod::Matin)
        .min_by(|a, b| date_key(&a.date).cmp(date_key(&b.date)));
    let evening = reports
        .iter()
        .filter(|r| r.periode_rapport == ReportPeriod::Soir)
        .max_by(|a, b| date_key(&a.date).cmp(date_key(&b.date)));

    Ok(DailySummary {
        shop_id: shop_id.to_owned(),
        expenses: sum_amounts(&expenses),
        card_deposits,
        card_withdrawals,
        movements: movements_in + movements_out,
        movements_in,
        movements_out,
        capital_initial: morning.map_or(0.0, CashReport::total),
        has_capital_initial: morning.is_some(),
        closing_total: evening.map_or(0.0, CashReport::total),
        has_closing_total: evening.is_some(),
        window,
    })
}

/// Balance sheet of one shop for a calendar period.
///
/// # Errors
///
/// `Forbidden` if the shop is outside the caller's scope; store failures
/// otherwise.
pub async fn shop_balance(
    store: &dyn DocumentStore,
    user: &User,
    shop_id: &str,
    period: CalendarPeriod,
    anchor: time::Date,
) -> Result<BalanceSheet, ReportError> {
    ensure_visible(user, shop_id)?;
    let window = period.window(anchor);

    let before_query = Query::new()
        .equals("shopId", shop_id)
        .before("date", window.start_key())
        .order_desc("date")
        .limit(2);

    let (reports, before, movements, history) = tokio::try_join!(
        window_read::<CashReport>(store, collections::OPERATIONS, shop_id, &window, |r| &r.date),
        async { Ok::<_, ReportError>(query_as::<CashReport>(store, collections::OPERATIONS, &before_query).await?) },
        window_read::<Movement>(store, collections::MOUVEMENTS, shop_id, &window, |m| &m.date),
        evening_history(store, shop_id),
    )?;

    let total_general = latest_closing(&reports).map_or(0.0, CashReport::total);
    let previous_total = latest_closing(&before).map_or(0.0, CashReport::total);
    let (inflow, outflow) = movement_totals(&movements);
    let variation = inflow - outflow;
    let adjusted_previous_total = previous_total + variation;

    Ok(BalanceSheet {
        shop_id: shop_id.to_owned(),
        period,
        total_general,
        previous_total,
        variation,
        adjusted_previous_total,
        net_profit: total_general - adjusted_previous_total,
        movements,
        daily_profits: restrict(profit_series(&history), &window),
        window,
    })
}

/// Sales, deposits and movement totals of one shop for a calendar period.
///
/// # Errors
///
/// `Forbidden` if the shop is outside the caller's scope; store failures
/// otherwise.
pub async fn data_report(
    store: &dyn DocumentStore,
    user: &User,
    shop_id: &str,
    period: CalendarPeriod,
    anchor: time::Date,
) -> Result<DataReport, ReportError> {
    ensure_visible(user, shop_id)?;
    let window = period.window(anchor);

    let (operations, deposits, movements) = tokio::try_join!(
        window_read::<CashReport>(store, collections::OPERATIONS, shop_id, &window, |r| &r.date),
        window_read::<LedgerRecord>(store, collections::DEPOTS, shop_id, &window, |r| &r.date),
        window_read::<Movement>(store, collections::MOUVEMENTS, shop_id, &window, |m| &m.date),
    )?;

    let total_sales: f64 = operations.iter().map(CashReport::total).sum();
    let (total_in, total_out) = movement_totals(&movements);

    Ok(DataReport {
        shop_id: shop_id.to_owned(),
        total_sales,
        total_deposits: sum_amounts(&deposits),
        total_in,
        total_out,
        estimated_profit: total_sales * ESTIMATED_MARGIN,
        operation_count: operations.len(),
        deposit_count: deposits.len(),
        movement_count: movements.len(),
        window,
    })
}

#[cfg(test)]
#[path = "synthesis_test.rs"]
mod tests;
