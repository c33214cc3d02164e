//! Inter-shop loans (`emprunts_societe`).
//!
//! A loan operation is either a borrowing (`emprunt`) or a repayment
//! (`remboursement`) in one currency. The outstanding balance of a shop in a
//! currency is borrowings minus repayments; currencies are never converted.
//!
//! Filtering happens in memory over the caller's scoped list, so any
//! combination of filters works without store-side composite indexes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::Date;
use tracing::info;

use super::period::{now_timestamp, parse_date};
use crate::model::{ALL_SHOPS, Currency, Loan, LoanKind, ShopScope, User};
use crate::store::{DocumentStore, Query, StoreError, collections, encode, get_as, query_as};

pub const DEFAULT_SOURCE: &str = "interne";

#[derive(Debug, thiserror::Error)]
pub enum LoanError {
    #[error("amount must be greater than zero")]
    InvalidAmount,
    #[error("loan operation not found: {0}")]
    NotFound(String),
    #[error("shop not visible to caller: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLoan {
    pub montant: f64,
    pub devise: Currency,
    #[serde(rename = "type")]
    pub kind: LoanKind,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub motif: Option<String>,
    /// Only honoured for global administrators.
    #[serde(default)]
    pub shop_id: Option<String>,
    #[serde(default)]
    pub shop_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoanPatch {
    pub montant: Option<f64>,
    pub devise: Option<Currency>,
    #[serde(rename = "type")]
    pub kind: Option<LoanKind>,
    pub motif: Option<String>,
    pub source: Option<String>,
}

/// Conjunction of optional criteria; `from`/`to` are inclusive days.
#[derive(Debug, Clone, Default)]
pub struct LoanFilter {
    pub devise: Option<Currency>,
    pub kind: Option<LoanKind>,
    pub shop: Option<String>,
    pub source: Option<String>,
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl LoanFilter {
    #[must_use]
    pub fn matches(&self, loan: &Loan) -> bool {
        if self.devise.is_some_and(|d| d != loan.devise) || self.kind.is_some_and(|k| k != loan.kind) {
            return false;
        }
        if self.shop.as_deref().is_some_and(|s| s != loan.shop_id) {
            return false;
        }
        if self.source.as_deref().is_some_and(|s| Some(s) != loan.source.as_deref()) {
            return false;
        }
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        let Some(day) = parse_date(&loan.date) else {
            return false;
        };
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanBalance {
    pub shop_id: String,
    pub shop_name: String,
    pub devise: Currency,
    pub borrowed: f64,
    pub repaid: f64,
    pub outstanding: f64,
}

/// Outstanding balance per shop and currency, ordered by shop id then
/// currency.
#[must_use]
pub fn balances(loans: &[Loan]) -> Vec<LoanBalance> {
    let mut by_key: BTreeMap<(&str, Currency), LoanBalance> = BTreeMap::new();
    for loan in loans {
        let entry = by_key.entry((loan.shop_id.as_str(), loan.devise)).or_insert_with(|| LoanBalance {
            shop_id: loan.shop_id.clone(),
            shop_name: loan.shop_name.clone().unwrap_or_else(|| loan.shop_id.clone()),
            devise: loan.devise,
            borrowed: 0.0,
            repaid: 0.0,
            outstanding: 0.0,
        });
        match loan.kind {
            LoanKind::Emprunt => entry.borrowed += loan.montant,
            LoanKind::Remboursement => entry.repaid += loan.montant,
        }
        entry.outstanding = entry.borrowed - entry.repaid;
    }
    by_key.into_values().collect()
}

fn check_amount(montant: f64) -> Result<(), LoanError> {
    if montant.is_finite() && montant > 0.0 { Ok(()) } else { Err(LoanError::InvalidAmount) }
}

fn scoped_query(user: &User) -> Query {
    match user.scope() {
        ShopScope::All => Query::new(),
        ShopScope::Shop(own) => Query::new().equals("shopId", own),
    }
}

/// # Errors
///
/// `InvalidAmount` for a non-positive amount; store failures.
pub async fn create_loan(store: &dyn DocumentStore, user: &User, input: NewLoan) -> Result<Loan, LoanError> {
    check_amount(input.montant)?;
    let (shop_id, shop_name) = match input.shop_id.filter(|s| !s.is_empty() && user.is_global_admin()) {
        Some(shop_id) => {
            let name = input.shop_name.unwrap_or_else(|| shop_id.clone());
            (shop_id, name)
        }
        None if user.is_global_admin() => (ALL_SHOPS.to_owned(), user.shop_name.clone()),
        None => (user.shop_id.clone(), user.shop_name.clone()),
    };

    let now = now_timestamp();
    let mut loan = Loan {
        id: String::new(),
        shop_id,
        shop_name: Some(shop_name),
        user_id: Some(user.id.clone()),
        montant: input.montant,
        devise: input.devise,
        kind: input.kind,
        source: Some(input.source.unwrap_or_else(|| DEFAULT_SOURCE.to_owned())),
        motif: input.motif,
        date: now.clone(),
        created_at: Some(now),
    };
    loan.id = store.create(collections::EMPRUNTS_SOCIETE, encode(&loan)?).await?;
    info!(loan_id = %loan.id, shop_id = %loan.shop_id, kind = ?loan.kind, montant = loan.montant, "loan operation recorded");
    Ok(loan)
}

/// Loan operations visible to `user` matching `filter`, newest first.
///
/// # Errors
///
/// Propagates store failures.
pub async fn list_loans(store: &dyn DocumentStore, user: &User, filter: &LoanFilter) -> Result<Vec<Loan>, LoanError> {
    let query = scoped_query(user).order_desc("date");
    let loans: Vec<Loan> = query_as(store, collections::EMPRUNTS_SOCIETE, &query).await?;
    Ok(loans.into_iter().filter(|loan| filter.matches(loan)).collect())
}

async fn visible_loan(store: &dyn DocumentStore, user: &User, id: &str) -> Result<Loan, LoanError> {
    let loan = get_as::<Loan>(store, collections::EMPRUNTS_SOCIETE, id)
        .await?
        .ok_or_else(|| LoanError::NotFound(id.to_owned()))?;
    if user.scope().allows(&loan.shop_id) { Ok(loan) } else { Err(LoanError::Forbidden(loan.shop_id)) }
}

/// # Errors
///
/// `InvalidAmount`, `NotFound`, `Forbidden`; store failures.
pub async fn update_loan(store: &dyn DocumentStore, user: &User, id: &str, patch: LoanPatch) -> Result<Loan, LoanError> {
    let mut loan = visible_loan(store, user, id).await?;
    let mut body = Map::new();
    if let Some(montant) = patch.montant {
        check_amount(montant)?;
        loan.montant = montant;
        body.insert("montant".into(), Value::from(montant));
    }
    if let Some(devise) = patch.devise {
        loan.devise = devise;
        body.insert("devise".into(), serde_json::to_value(devise).map_err(StoreError::from)?);
    }
    if let Some(kind) = patch.kind {
        loan.kind = kind;
        body.insert("type".into(), serde_json::to_value(kind).map_err(StoreError::from)?);
    }
    if let Some(motif) = patch.motif {
        body.insert("motif".into(), Value::String(motif.clone()));
        loan.motif = Some(motif);
    }
    if let Some(source) = patch.source {
        body.insert("source".into(), Value::String(source.clone()));
        loan.source = Some(source);
    }
    if !body.is_empty() {
        store.update(collections::EMPRUNTS_SOCIETE, id, body).await?;
    }
    Ok(loan)
}

/// # Errors
///
/// `NotFound`, `Forbidden`; store failures.
pub async fn delete_loan(store: &dyn DocumentStore, user: &User, id: &str) -> Result<(), LoanError> {
    visible_loan(store, user, id).await?;
    store.delete(collections::EMPRUNTS_SOCIETE, id).await?;
    info!(loan_id = %id, by = %user.id, "loan operation deleted");
    Ok(())
}

/// Outstanding balances over the loans visible to `user`.
///
/// # Errors
///
/// Propagates store failures.
pub async fn loan_balances(store: &dyn DocumentStore, user: &User) -> Result<Vec<LoanBalance>, LoanError> {
    let loans = list_loans(store, user, &LoanFilter::default()).await?;
    Ok(balances(&loans))
}

#[cfg(test)]
#[path = "loans_test.rs"]
mod tests;
