//! Demonstration data served when the store refuses a reporting read.
//!
//! The dashboard gets a fixed sample; the synthesis reports degrade to
//! zero-valued results over the requested window. Every payload built here is
//! shown together with `DEMO_BANNER`.

use super::dashboard::{AdminStats, Dashboard, RevenueTotals, ShopPerformance, UserStats};
use super::period::{CalendarPeriod, DateWindow, TrailingPeriod};
use super::synthesis::{BalanceSheet, DailySummary, DataReport, Synthesis};
use crate::model::User;

pub const DEMO_BANNER: &str = "Accès limité aux données : affichage de données de démonstration. \
                               Vérifiez les règles d'accès de la base de données.";

const DEMO_REVENUE: f64 = 45_000.0;
const DEMO_TRANSACTIONS: usize = 156;
const DEMO_CLIENTS: usize = 89;
const DEMO_USERS: usize = 12;
const DEMO_DEPOTS: f64 = 12_000.0;

#[allow(clippy::too_many_arguments)]
fn demo_shop(
    shop_id: &str,
    shop_name: &str,
    revenue: f64,
    transactions: usize,
    clients: usize,
    users: usize,
    growth: f64,
    depots: f64,
) -> ShopPerformance {
    ShopPerformance {
        shop_id: shop_id.to_owned(),
        shop_name: shop_name.to_owned(),
        revenue,
        transactions,
        clients,
        users,
        growth,
        depots,
    }
}

/// Sample dashboard: three shops for a global admin, the caller's own shop
/// otherwise.
#[must_use]
pub fn demo_dashboard(user: &User, period: TrailingPeriod, window: DateWindow) -> Dashboard {
    let global = user.is_global_admin();
    let shops = if global {
        vec![
            demo_shop("shop1", "Banunu", 18_000.0, 67, 34, 4, 12.0, 6_000.0),
            demo_shop("shop2", "Kinshasa Centre", 15_000.0, 45, 28, 3, 8.0, 4_000.0),
            demo_shop("shop3", "Gombe", 12_000.0, 44, 27, 5, 18.0, 2_000.0),
        ]
    } else {
        vec![demo_shop(
            &user.shop_id,
            &user.shop_name,
            DEMO_REVENUE,
            DEMO_TRANSACTIONS,
            DEMO_CLIENTS,
            DEMO_USERS,
            15.0,
            DEMO_DEPOTS,
        )]
    };

    let stats = AdminStats {
        total_revenue: DEMO_REVENUE,
        total_transactions: DEMO_TRANSACTIONS,
        total_clients: DEMO_CLIENTS,
        total_users: DEMO_USERS,
        average_per_shop: if global { 15_000.0 } else { DEMO_REVENUE },
        active_shops: if global { 3 } else { 1 },
        total_depots: DEMO_DEPOTS,
    };

    Dashboard {
        period,
        window,
        stats,
        totals: RevenueTotals { deposits: DEMO_DEPOTS, ..RevenueTotals::default() },
        shops,
        user_stats: UserStats { total: 12, admins: 3, vendeurs: 9, active: 10, inactive: 2 },
    }
}

#[must_use]
pub fn empty_synthesis(window: DateWindow) -> Synthesis {
    Synthesis { window, shops: Vec::new(), series: Vec::new(), total_profit: 0.0, best: None, worst: None }
}

#[must_use]
pub fn empty_daily_summary(shop_id: &str, window: DateWindow) -> DailySummary {
    DailySummary {
        shop_id: shop_id.to_owned(),
        window,
        expenses: 0.0,
        card_deposits: 0.0,
        card_withdrawals: 0.0,
        movements: 0.0,
        movements_in: 0.0,
        movements_out: 0.0,
        capital_initial: 0.0,
        has_capital_initial: false,
        closing_total: 0.0,
        has_closing_total: false,
    }
}

#[must_use]
pub fn empty_balance(shop_id: &str, period: CalendarPeriod, window: DateWindow) -> BalanceSheet {
    BalanceSheet {
        shop_id: shop_id.to_owned(),
        period,
        window,
        total_general: 0.0,
        previous_total: 0.0,
        variation: 0.0,
        adjusted_previous_total: 0.0,
        net_profit: 0.0,
        movements: Vec::new(),
        daily_profits: Vec::new(),
    }
}

#[must_use]
pub fn empty_data_report(shop_id: &str, window: DateWindow) -> DataReport {
    DataReport {
        shop_id: shop_id.to_owned(),
        window,
        total_sales: 0.0,
        total_deposits: 0.0,
        total_in: 0.0,
        total_out: 0.0,
        estimated_profit: 0.0,
        operation_count: 0,
        deposit_count: 0,
        movement_count: 0,
    }
}

#[cfg(test)]
#[path = "demo_test.rs"]
mod tests;
