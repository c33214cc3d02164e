//! Domain records stored in the document collections.
//!
//! DESIGN
//! ======
//! Field names follow the stored documents (`shopId`, `montant`,
//! `periode_rapport`, ...) so existing data decodes without migration.
//! Records carry an `extra` map where the stored shape is open-ended; fields
//! this service does not interpret round-trip untouched.
//!
//! Monetary amounts are decoded leniently: numbers, numeric strings and
//! `null` are all accepted, and anything unreadable counts as absent. Text
//! fields such as dates and shop ids read `null` as empty, and a movement
//! whose `operation` is neither `Entrée` nor `Sortie` has no direction.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Shop scope sentinel carried by global administrators.
pub const ALL_SHOPS: &str = "ALL_SHOPS";

const LEGACY_ALL_USERS: &str = "ALL_USERS";
const LEGACY_ADMIN: &str = "ADMIN";
const LEGACY_SHOP_PREFIX: &str = "SHOP_USERS_";

// =============================================================================
// AMOUNTS
// =============================================================================

fn amount_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Deserialize an optional monetary amount, tolerating strings and nulls.
pub(crate) fn de_amount_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(amount_from_value))
}

/// Deserialize a text field where `null` means empty. Numbers are kept as
/// their decimal text.
pub(crate) fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Deserialize a monetary amount where absence means zero.
pub(crate) fn de_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(de_amount_opt(deserializer)?.unwrap_or(0.0))
}

// =============================================================================
// USERS & SHOPS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[serde(alias = "vendeur")]
    User,
    #[serde(alias = "globalAdmin")]
    Admin,
}

/// Which shops a user may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShopScope {
    All,
    Shop(String),
}

impl ShopScope {
    #[must_use]
    pub fn allows(&self, shop_id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Shop(own) => own == shop_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub nom: String,
    #[serde(default)]
    pub prenom: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sexe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poste: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telephone: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default, deserialize_with = "de_text")]
    pub shop_id: String,
    #[serde(default)]
    pub shop_name: String,
}

impl User {
    /// An administrator whose shop scope is the `ALL_SHOPS` sentinel.
    #[must_use]
    pub fn is_global_admin(&self) -> bool {
        self.role == Role::Admin && self.shop_id == ALL_SHOPS
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    #[must_use]
    pub fn scope(&self) -> ShopScope {
        if self.is_global_admin() {
            ShopScope::All
        } else {
            ShopScope::Shop(self.shop_id.clone())
        }
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.prenom, self.nom).trim().to_owned()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

// =============================================================================
// FINANCIAL RECORDS
// =============================================================================

/// The four financial-event collections that make up shop revenue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    #[serde(rename = "echanges")]
    Exchange,
    #[serde(rename = "ventes_credit")]
    CreditSale,
    #[serde(rename = "depots")]
    Deposit,
    #[serde(rename = "transactions")]
    Transaction,
}

impl RecordKind {
    pub const ALL: [Self; 4] = [Self::Exchange, Self::CreditSale, Self::Deposit, Self::Transaction];

    #[must_use]
    pub fn collection(self) -> &'static str {
        use crate::store::collections;
        match self {
            Self::Exchange => collections::ECHANGES,
            Self::CreditSale => collections::VENTES_CREDIT,
            Self::Deposit => collections::DEPOTS,
            Self::Transaction => collections::TRANSACTIONS,
        }
    }

    #[must_use]
    pub fn from_collection(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.collection() == name)
    }
}

/// A per-shop dated amount: exchanges, credit sales, deposits, electronic
/// transactions, expenses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub shop_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub date: String,
    #[serde(default, deserialize_with = "de_amount_opt")]
    pub montant: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LedgerRecord {
    /// The amount, with a missing or unreadable `montant` counting as zero.
    #[must_use]
    pub fn amount(&self) -> f64 {
        self.montant.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub nom: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prenom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telephone: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub shop_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(default, deserialize_with = "de_amount")]
    pub solde: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardMovementKind {
    Depot,
    Retrait,
}

/// A card deposit or withdrawal against a client balance (`depot_carte`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMovement {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub client_id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub shop_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: CardMovementKind,
    #[serde(default, deserialize_with = "de_amount")]
    pub montant: f64,
    #[serde(default, deserialize_with = "de_text")]
    pub date: String,
}

// =============================================================================
// CASH REPORTS & MOVEMENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Matin,
    Soir,
}

impl ReportPeriod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Matin => "matin",
            Self::Soir => "soir",
        }
    }
}

/// A morning or evening cash-register report (`operations`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashReport {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "shopId", default, deserialize_with = "de_text")]
    pub shop_id: String,
    #[serde(rename = "shopName", default, skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub date: String,
    pub periode_rapport: ReportPeriod,
    #[serde(default, deserialize_with = "de_amount_opt")]
    pub total_general: Option<f64>,
    #[serde(default, deserialize_with = "de_amount_opt")]
    pub espece_en_caisse: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CashReport {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.total_general.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementDirection {
    #[serde(rename = "Entrée")]
    In,
    #[serde(rename = "Sortie")]
    Out,
}

impl MovementDirection {
    /// Parse a stored label, accepting lowercase and unaccented spellings.
    #[must_use]
    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "entrée" | "entree" => Some(Self::In),
            "sortie" => Some(Self::Out),
            _ => None,
        }
    }
}

fn de_direction_opt<'de, D>(deserializer: D) -> Result<Option<MovementDirection>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_str).and_then(MovementDirection::from_label))
}

/// A cash movement in or out of a shop (`mouvements`).
///
/// Older documents carry only a `type` tag (`init`, `retrait_admin`, `pret`,
/// ...) and no direction; they are listed but take no part in in/out totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub shop_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "de_direction_opt", skip_serializing_if = "Option::is_none")]
    pub operation: Option<MovementDirection>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "de_amount")]
    pub montant: f64,
    #[serde(default, alias = "justification", alias = "libelle", deserialize_with = "de_text")]
    pub description: String,
    #[serde(default, deserialize_with = "de_text")]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devise: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A shop expense (`depenses`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub shop_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, deserialize_with = "de_amount")]
    pub montant: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devise: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub categorie: String,
    #[serde(default, deserialize_with = "de_text")]
    pub description: String,
    #[serde(default, deserialize_with = "de_text")]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A salary payment to a staff member (`salaires`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Salary {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub user_id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub shop_id: String,
    #[serde(default, deserialize_with = "de_amount")]
    pub montant: f64,
    pub devise: Currency,
    /// Month paid for, `YYYY-MM`.
    #[serde(default, deserialize_with = "de_text")]
    pub mois: String,
    #[serde(default, deserialize_with = "de_text")]
    pub description: String,
    #[serde(default, deserialize_with = "de_text")]
    pub date_paiement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_by: Option<String>,
}

/// A submitted register report (`rapports_caisse`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashRegisterReport {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<String>,
    #[serde(default)]
    pub shop_name: String,
    #[serde(default)]
    pub user_nom: String,
    #[serde(default, deserialize_with = "de_text")]
    pub date: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// LOANS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "CDF")]
    Cdf,
    #[serde(rename = "USD")]
    Usd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanKind {
    Emprunt,
    Remboursement,
}

/// An inter-shop borrowing or repayment (`emprunts_societe`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub shop_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "de_amount")]
    pub montant: f64,
    pub devise: Currency,
    #[serde(rename = "type")]
    pub kind: LoanKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motif: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Who a message is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipient {
    User { id: String },
    Shop { id: String },
    Broadcast,
    Admins,
}

impl Recipient {
    /// Parse the string addressing used by older message documents.
    #[must_use]
    pub fn from_legacy(raw: &str) -> Self {
        match raw {
            LEGACY_ALL_USERS => Self::Broadcast,
            LEGACY_ADMIN => Self::Admins,
            other => match other.strip_prefix(LEGACY_SHOP_PREFIX) {
                Some(shop_id) => Self::Shop { id: shop_id.to_owned() },
                None => Self::User { id: other.to_owned() },
            },
        }
    }

    /// The legacy string form, written alongside the tagged form.
    #[must_use]
    pub fn legacy_id(&self) -> String {
        match self {
            Self::User { id } => id.clone(),
            Self::Shop { id } => format!("{LEGACY_SHOP_PREFIX}{id}"),
            Self::Broadcast => LEGACY_ALL_USERS.to_owned(),
            Self::Admins => LEGACY_ADMIN.to_owned(),
        }
    }

    #[must_use]
    pub fn reaches(&self, user: &User) -> bool {
        match self {
            Self::User { id } => *id == user.id,
            Self::Shop { id } => *id == user.shop_id,
            Self::Broadcast => true,
            Self::Admins => user.is_admin(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MessageStatus {
    #[serde(rename = "lu")]
    Read,
    #[default]
    #[serde(rename = "non-lu")]
    Unread,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Recipient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: MessageStatus,
    #[serde(default, deserialize_with = "de_text")]
    pub date: String,
    #[serde(default, deserialize_with = "de_text")]
    pub shop_id: String,
    #[serde(default)]
    pub shop_name: String,
}

impl Message {
    /// Resolved addressee: the tagged form when present, else the legacy id.
    #[must_use]
    pub fn addressee(&self) -> Option<Recipient> {
        self.to
            .clone()
            .or_else(|| self.recipient_id.as_deref().map(Recipient::from_legacy))
    }

    #[must_use]
    pub fn is_unread(&self) -> bool {
        self.status == MessageStatus::Unread
    }
}

// =============================================================================
// SESSIONS
// =============================================================================

/// Stored session, keyed by its token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    /// Unix seconds.
    pub expires_at: i64,
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
