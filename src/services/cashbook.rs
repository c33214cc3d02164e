//! Cash book — expenses, cash movements and salary payments.
//!
//! DESIGN
//! ======
//! These are the entries the synthesis reports read back: `depenses` feed the
//! daily expense total, `mouvements` the in/out variation of the balance
//! sheet. Writes are shop-stamped with the same rules as revenue records and
//! dated `YYYY-MM-DD` (today unless given). New movements always carry an
//! `Entrée`/`Sortie` direction.
//!
//! Salaries (`salaires`) are administrator business: a shop administrator pays
//! staff of their own shop, a global administrator names the shop.

use serde::Deserialize;
use tracing::info;

use super::ledger::{LedgerError, positive_amount, scoped_read, target_shop};
use super::period::{DateWindow, format_date, now_timestamp, parse_date, today};
use crate::model::{Currency, Expense, Movement, MovementDirection, Salary, User};
use crate::store::{DocumentStore, collections, encode, query_as};

/// Expense category used when none is given.
pub const DEFAULT_EXPENSE_CATEGORY: &str = "autre";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    #[serde(default)]
    pub shop_id: Option<String>,
    pub montant: f64,
    #[serde(default)]
    pub devise: Option<String>,
    #[serde(default)]
    pub categorie: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMovement {
    #[serde(default)]
    pub shop_id: Option<String>,
    pub operation: MovementDirection,
    pub montant: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub devise: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSalary {
    pub user_id: String,
    #[serde(default)]
    pub shop_id: Option<String>,
    pub montant: f64,
    pub devise: Currency,
    /// `YYYY-MM`; defaults to the current month.
    #[serde(default)]
    pub mois: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SalaryFilter {
    pub shop: Option<String>,
    pub mois: Option<String>,
}

fn entry_date(requested: Option<String>) -> String {
    requested.filter(|d| !d.trim().is_empty()).unwrap_or_else(|| format_date(today()))
}

fn in_window<T>(rows: Vec<T>, window: Option<&DateWindow>, date_of: impl Fn(&T) -> &str) -> Vec<T> {
    match window {
        Some(window) => rows.into_iter().filter(|row| window.contains(date_of(row))).collect(),
        None => rows,
    }
}

// =============================================================================
// EXPENSES
// =============================================================================

/// # Errors
///
/// `InvalidAmount` for a non-positive amount; `Forbidden`/`MissingShop` for an
/// unusable target shop; store failures.
pub async fn create_expense(store: &dyn DocumentStore, user: &User, input: NewExpense) -> Result<Expense, LedgerError> {
    let montant = positive_amount(input.montant)?;
    let (shop_id, _) = target_shop(user, input.shop_id.as_deref(), None)?;
    let mut expense = Expense {
        id: String::new(),
        shop_id,
        created_by: Some(user.id.clone()),
        montant,
        devise: input.devise,
        categorie: input
            .categorie
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EXPENSE_CATEGORY.to_owned()),
        description: input.description,
        date: entry_date(input.date),
        created_at: Some(now_timestamp()),
    };
    expense.id = store.create(collections::DEPENSES, encode(&expense)?).await?;
    info!(expense_id = %expense.id, shop_id = %expense.shop_id, montant, categorie = %expense.categorie, "expense recorded");
    Ok(expense)
}

/// Expenses visible to `user`, newest first.
///
/// # Errors
///
/// `Forbidden` when asking for another shop; store failures.
pub async fn list_expenses(
    store: &dyn DocumentStore,
    user: &User,
    shop_id: Option<&str>,
    window: Option<&DateWindow>,
) -> Result<Vec<Expense>, LedgerError> {
    let mut query = scoped_read(user, shop_id)?.order_desc("date");
    if let Some(window) = window {
        query = query.at_least("date", window.start_key());
    }
    let rows: Vec<Expense> = query_as(store, collections::DEPENSES, &query).await?;
    Ok(in_window(rows, window, |e| &e.date))
}

// =============================================================================
// MOVEMENTS
// =============================================================================

/// # Errors
///
/// `InvalidAmount` for a non-positive amount; `Forbidden`/`MissingShop` for an
/// unusable target shop; store failures.
pub async fn create_movement(
    store: &dyn DocumentStore,
    user: &User,
    input: NewMovement,
) -> Result<Movement, LedgerError> {
    let montant = positive_amount(input.montant)?;
    let (shop_id, _) = target_shop(user, input.shop_id.as_deref(), None)?;
    let mut movement = Movement {
        id: String::new(),
        shop_id,
        user_id: Some(user.id.clone()),
        operation: Some(input.operation),
        kind: None,
        montant,
        description: input.description,
        date: entry_date(input.date),
        devise: input.devise,
        created_at: Some(now_timestamp()),
    };
    movement.id = store.create(collections::MOUVEMENTS, encode(&movement)?).await?;
    info!(movement_id = %movement.id, shop_id = %movement.shop_id, operation = ?input.operation, montant, "movement recorded");
    Ok(movement)
}

/// Movements visible to `user`, newest first, including untyped legacy
/// entries.
///
/// # Errors
///
/// `Forbidden` when asking for another shop; store failures.
pub async fn list_movements(
    store: &dyn DocumentStore,
    user: &User,
    shop_id: Option<&str>,
    window: Option<&DateWindow>,
) -> Result<Vec<Movement>, LedgerError> {
    let mut query = scoped_read(user, shop_id)?.order_desc("date");
    if let Some(window) = window {
        query = query.at_least("date", window.start_key());
    }
    let rows: Vec<Movement> = query_as(store, collections::MOUVEMENTS, &query).await?;
    Ok(in_window(rows, window, |m| &m.date))
}

// =============================================================================
// SALARIES
// =============================================================================

fn check_month(mois: &str) -> Result<(), LedgerError> {
    if mois.len() == 7 && parse_date(&format!("{mois}-01")).is_some() {
        Ok(())
    } else {
        Err(LedgerError::InvalidMonth(mois.to_owned()))
    }
}

/// Record a salary payment.
///
/// # Errors
///
/// `AdminOnly` for non-administrators; `InvalidAmount`; `InvalidMonth` for a
/// month not shaped `YYYY-MM`; `Forbidden`/`MissingShop`; store failures.
pub async fn record_salary(store: &dyn DocumentStore, user: &User, input: NewSalary) -> Result<Salary, LedgerError> {
    if !user.is_admin() {
        return Err(LedgerError::AdminOnly);
    }
    let montant = positive_amount(input.montant)?;
    let (shop_id, _) = target_shop(user, input.shop_id.as_deref(), None)?;
    let mois = input.mois.unwrap_or_else(|| format_date(today())[..7].to_owned());
    check_month(&mois)?;

    let mut salary = Salary {
        id: String::new(),
        user_id: input.user_id,
        shop_id,
        montant,
        devise: input.devise,
        mois,
        description: input.description,
        date_paiement: now_timestamp(),
        paid_by: Some(user.id.clone()),
    };
    salary.id = store.create(collections::SALAIRES, encode(&salary)?).await?;
    info!(salary_id = %salary.id, shop_id = %salary.shop_id, user_id = %salary.user_id, mois = %salary.mois, "salary recorded");
    Ok(salary)
}

/// Salary payments, most recently paid first.
///
/// # Errors
///
/// `AdminOnly` for non-administrators; `InvalidMonth`; `Forbidden` when a
/// shop administrator asks for another shop; store failures.
pub async fn list_salaries(
    store: &dyn DocumentStore,
    user: &User,
    filter: &SalaryFilter,
) -> Result<Vec<Salary>, LedgerError> {
    if !user.is_admin() {
        return Err(LedgerError::AdminOnly);
    }
    let mut query = scoped_read(user, filter.shop.as_deref().filter(|s| !s.is_empty()))?.order_desc("datePaiement");
    if let Some(mois) = filter.mois.as_deref().filter(|m| !m.is_empty()) {
        check_month(mois)?;
        query = query.equals("mois", mois);
    }
    Ok(query_as(store, collections::SALAIRES, &query).await?)
}

#[cfg(test)]
#[path = "cashbook_test.rs"]
mod tests;
