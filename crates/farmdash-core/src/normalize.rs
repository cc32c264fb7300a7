//! # Record Normalizer
//!
//! Converts raw store documents into canonical typed records.
//!
//! ## Leniency Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Raw value → Canonical value                          │
//! │                                                                         │
//! │  Numbers                                                                │
//! │  ───────                                                                │
//! │  12.5 / "12,50" / "1.234,56" / "R$ 3,00"   → parsed exactly            │
//! │  "abc" / true / {} / negative / absent     → 0  (logged, never raised) │
//! │                                                                         │
//! │  Timestamps                                                             │
//! │  ──────────                                                             │
//! │  {"seconds": s, "nanoseconds": n}          → backend timestamp          │
//! │  "2026-10-19T10:00:00Z" / "2026-10-19"     → ISO-8601                   │
//! │  1760868000000                             → epoch milliseconds         │
//! │  anything else / absent                    → TimestampFallback policy   │
//! │                                                                         │
//! │  Field names                                                            │
//! │  ───────────                                                            │
//! │  canonical camelCase first, then legacy names (precoTotal, dataVenda…) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dirty data is absorbed here so the dashboards keep rendering. That is a
//! deliberate trade of strict correctness for availability. Under the
//! default [`TimestampFallback::Now`] policy no function in this module ever
//! returns an error; [`TimestampFallback::Reject`] turns unreadable required
//! timestamps into [`CoreError::MalformedRecord`].

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::TimestampFallback;
use crate::error::{CoreError, CoreResult};
use crate::money::{parse_decimal_lenient, Money};
use crate::types::{
    CatalogItem, Goal, GoalKind, GoalStatus, Notification, NotificationKind, Priority,
    TransactionRecord,
};

// =============================================================================
// Raw Record
// =============================================================================

/// A document exactly as the store delivered it.
///
/// The id lives outside the document body, like in the backing store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RawRecord {
    /// Wraps a document body. Non-object bodies produce an empty record.
    pub fn new(id: impl Into<String>, body: Value) -> Self {
        let fields = match body {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        RawRecord {
            id: id.into(),
            fields,
        }
    }

    /// First non-null value among `names`.
    pub fn field(&self, names: &[&str]) -> Option<&Value> {
        names
            .iter()
            .filter_map(|name| self.fields.get(*name))
            .find(|v| !v.is_null())
    }
}

// =============================================================================
// Field Aliases
// =============================================================================

mod fields {
    pub const PRODUCT_ID: &[&str] = &["productId", "produtoId"];
    pub const PRODUCT_NAME: &[&str] = &["productName", "produtoNome"];
    pub const QUANTITY: &[&str] = &["quantity", "quantidade"];
    pub const UNIT_PRICE: &[&str] = &["unitPrice", "precoUnitario"];
    pub const TOTAL_PRICE: &[&str] = &["totalPrice", "precoTotal"];
    pub const OCCURRED_AT: &[&str] = &["occurredAt", "dataVenda"];

    pub const NAME: &[&str] = &["name", "nome"];
    pub const CATEGORY: &[&str] = &["category", "categoria"];
    pub const COST_PRICE: &[&str] = &["costPrice", "precoCusto"];
    pub const SALE_PRICE: &[&str] = &["salePrice", "precoVenda"];
    pub const STOCK: &[&str] = &["stockQuantity", "quantity", "quantidade"];
    pub const UNIT: &[&str] = &["unit", "unidade"];

    pub const TITLE: &[&str] = &["title", "titulo"];
    pub const DESCRIPTION: &[&str] = &["description", "descricao"];
    pub const KIND: &[&str] = &["kind", "type", "tipo"];
    pub const TARGET_VALUE: &[&str] = &["targetValue", "valorMeta"];
    pub const CURRENT_VALUE: &[&str] = &["currentValue", "valorAtual"];
    pub const START_DATE: &[&str] = &["startDate", "dataInicio"];
    pub const END_DATE: &[&str] = &["endDate", "dataFim"];
    pub const STATUS: &[&str] = &["status"];
    pub const PRIORITY: &[&str] = &["priority", "prioridade"];
    pub const CREATED_AT: &[&str] = &["createdAt", "dataCriacao"];

    pub const MESSAGE: &[&str] = &["message", "mensagem"];
    pub const READ: &[&str] = &["read", "lida"];
    pub const READ_AT: &[&str] = &["readAt", "dataLeitura"];
}

// =============================================================================
// Normalizer
// =============================================================================

/// Converts raw records of every collection into canonical types.
///
/// Carries the normalization instant instead of reading the clock, so the
/// "now" fallback is reproducible in tests.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    now: DateTime<Utc>,
    fallback: TimestampFallback,
    /// Offset for ISO strings without a zone.
    local_offset: FixedOffset,
}

impl Normalizer {
    pub fn new(now: DateTime<Utc>, fallback: TimestampFallback) -> Self {
        Normalizer {
            now,
            fallback,
            local_offset: Utc.fix(),
        }
    }

    /// Reads zone-less date-times as local time in `offset`.
    pub fn with_local_offset(self, offset: FixedOffset) -> Self {
        Normalizer {
            local_offset: offset,
            ..self
        }
    }

    pub fn fallback(&self) -> TimestampFallback {
        self.fallback
    }

    /// Normalizes a sale.
    ///
    /// `total_price` falls back to `unit_price × quantity` when absent, zero
    /// or unparsable.
    pub fn transaction(&self, raw: &RawRecord) -> CoreResult<TransactionRecord> {
        const COLLECTION: &str = "sales";

        let quantity = self.quantity(raw, fields::QUANTITY, COLLECTION);
        let unit_price = self.money(raw, fields::UNIT_PRICE, COLLECTION);

        let total_price = match self.money_opt(raw, fields::TOTAL_PRICE, COLLECTION) {
            Some(total) if !total.is_zero() => total,
            _ => unit_price.multiply_quantity(quantity),
        };

        Ok(TransactionRecord {
            id: raw.id.clone(),
            product_id: text(raw, fields::PRODUCT_ID),
            product_name: text(raw, fields::PRODUCT_NAME),
            quantity,
            unit_price,
            total_price,
            occurred_at: self.instant(raw, fields::OCCURRED_AT, COLLECTION)?,
        })
    }

    /// Normalizes a catalog item.
    pub fn catalog_item(&self, raw: &RawRecord) -> CoreResult<CatalogItem> {
        const COLLECTION: &str = "products";

        Ok(CatalogItem {
            id: raw.id.clone(),
            name: text(raw, fields::NAME),
            category: text(raw, fields::CATEGORY),
            cost_price: self.money(raw, fields::COST_PRICE, COLLECTION),
            sale_price: self.money(raw, fields::SALE_PRICE, COLLECTION),
            stock_quantity: self.quantity(raw, fields::STOCK, COLLECTION),
            unit: text(raw, fields::UNIT),
        })
    }

    /// Normalizes a goal. Unknown kind/status/priority labels take defaults.
    pub fn goal(&self, raw: &RawRecord) -> CoreResult<Goal> {
        const COLLECTION: &str = "goals";

        Ok(Goal {
            id: raw.id.clone(),
            title: text(raw, fields::TITLE),
            description: text(raw, fields::DESCRIPTION),
            kind: label(raw, fields::KIND, GoalKind::from_label),
            target_value: self.value(raw, fields::TARGET_VALUE, COLLECTION),
            current_value: self.value(raw, fields::CURRENT_VALUE, COLLECTION),
            start_date: self.instant(raw, fields::START_DATE, COLLECTION)?,
            end_date: self.instant(raw, fields::END_DATE, COLLECTION)?,
            status: label(raw, fields::STATUS, GoalStatus::from_label),
            priority: label(raw, fields::PRIORITY, Priority::from_label),
            created_at: self.instant(raw, fields::CREATED_AT, COLLECTION)?,
        })
    }

    /// Normalizes a notification.
    pub fn notification(&self, raw: &RawRecord) -> CoreResult<Notification> {
        const COLLECTION: &str = "notifications";

        let read = match raw.field(fields::READ) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "1"),
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            _ => false,
        };

        Ok(Notification {
            id: raw.id.clone(),
            title: text(raw, fields::TITLE),
            message: text(raw, fields::MESSAGE),
            kind: label(raw, fields::KIND, NotificationKind::from_label),
            priority: label(raw, fields::PRIORITY, Priority::from_label),
            read,
            created_at: self.instant(raw, fields::CREATED_AT, COLLECTION)?,
            read_at: raw.field(fields::READ_AT).and_then(|v| self.parse_instant(v)),
        })
    }

    // =========================================================================
    // Coercion Helpers
    // =========================================================================

    fn money_opt(&self, raw: &RawRecord, names: &[&str], collection: &str) -> Option<Money> {
        let value = raw.field(names)?;
        let parsed = match value {
            Value::Number(n) => n
                .as_i64()
                .and_then(|i| i.checked_mul(100))
                .map(Money::from_cents)
                .or_else(|| n.as_f64().and_then(Money::from_f64)),
            Value::String(s) => Money::parse_lenient(s),
            _ => None,
        };

        match parsed {
            Some(m) if !m.is_negative() => Some(m),
            _ => {
                warn!(collection, id = %raw.id, field = names[0], raw = %value, "Unreadable amount, using 0");
                None
            }
        }
    }

    fn money(&self, raw: &RawRecord, names: &[&str], collection: &str) -> Money {
        self.money_opt(raw, names, collection).unwrap_or_default()
    }

    fn quantity(&self, raw: &RawRecord, names: &[&str], collection: &str) -> i64 {
        let Some(value) = raw.field(names) else {
            return 0;
        };
        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => parse_decimal_lenient(s).and_then(|d| d.trunc().to_i64()),
            _ => None,
        };

        match parsed {
            Some(q) if q >= 0 => q,
            _ => {
                warn!(collection, id = %raw.id, field = names[0], raw = %value, "Unreadable quantity, using 0");
                0
            }
        }
    }

    fn value(&self, raw: &RawRecord, names: &[&str], collection: &str) -> f64 {
        let Some(value) = raw.field(names) else {
            return 0.0;
        };
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_decimal_lenient(s).and_then(|d| d.to_f64()),
            _ => None,
        };

        match parsed {
            Some(v) if v.is_finite() && v >= 0.0 => v,
            _ => {
                warn!(collection, id = %raw.id, field = names[0], raw = %value, "Unreadable value, using 0");
                0.0
            }
        }
    }

    /// A required timestamp, subject to the fallback policy.
    fn instant(&self, raw: &RawRecord, names: &[&str], collection: &str) -> CoreResult<DateTime<Utc>> {
        if let Some(instant) = raw.field(names).and_then(|v| self.parse_instant(v)) {
            return Ok(instant);
        }

        match self.fallback {
            TimestampFallback::Now => {
                debug!(collection, id = %raw.id, field = names[0], "Missing timestamp, using now");
                Ok(self.now)
            }
            TimestampFallback::Reject => Err(CoreError::malformed(
                collection,
                raw.id.clone(),
                format!("missing or unreadable {}", names[0]),
            )),
        }
    }

    /// Reads any of the accepted timestamp shapes.
    pub fn parse_instant(&self, value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::Object(map) => {
                let seconds = map
                    .get("seconds")
                    .or_else(|| map.get("_seconds"))
                    .and_then(Value::as_i64)?;
                let nanos = map
                    .get("nanoseconds")
                    .or_else(|| map.get("_nanoseconds"))
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
            }
            Value::String(s) => self.parse_iso(s.trim()),
            Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
            _ => None,
        }
    }

    fn parse_iso(&self, s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }

        // A bare date is midnight UTC, as browsers read it
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(date.and_time(NaiveTime::MIN).and_utc());
        }

        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .and_then(|naive| self.local_offset.from_local_datetime(&naive).single())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

// =============================================================================
// Free Helpers
// =============================================================================

fn text(raw: &RawRecord, names: &[&str]) -> String {
    match raw.field(names) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn label<T: Default>(raw: &RawRecord, names: &[&str], parse: fn(&str) -> Option<T>) -> T {
    raw.field(names)
        .and_then(Value::as_str)
        .and_then(parse)
        .unwrap_or_default()
}

/// Normalizes a whole collection snapshot.
///
/// Stops at the first error, which only happens under
/// [`TimestampFallback::Reject`].
pub fn normalize_all<T>(
    raws: &[RawRecord],
    mut normalize: impl FnMut(&RawRecord) -> CoreResult<T>,
) -> CoreResult<Vec<T>> {
    raws.iter().map(|raw| normalize(raw)).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn lenient() -> Normalizer {
        Normalizer::new(now(), TimestampFallback::Now)
    }

    fn strict() -> Normalizer {
        Normalizer::new(now(), TimestampFallback::Reject)
    }

    #[test]
    fn test_total_derived_when_absent() {
        for (qty, unit) in [(0_i64, 0_i64), (1, 250), (3, 199), (12, 1)] {
            let raw = RawRecord::new(
                "s",
                json!({"quantity": qty, "unitPrice": unit as f64 / 100.0}),
            );
            let sale = lenient().transaction(&raw).unwrap();
            assert_eq!(sale.total_price.cents(), qty * unit);
        }
    }

    #[test]
    fn test_total_derived_when_zero_or_garbage() {
        let raw = RawRecord::new(
            "s",
            json!({"quantidade": "4", "precoUnitario": "2,50", "precoTotal": 0}),
        );
        assert_eq!(lenient().transaction(&raw).unwrap().total_price.cents(), 1000);

        let raw = RawRecord::new(
            "s",
            json!({"quantity": 2, "unitPrice": 3, "totalPrice": "n/a"}),
        );
        assert_eq!(lenient().transaction(&raw).unwrap().total_price.cents(), 600);
    }

    #[test]
    fn test_explicit_total_wins() {
        let raw = RawRecord::new(
            "s",
            json!({"quantity": 2, "unitPrice": 3, "totalPrice": "5,00"}),
        );
        assert_eq!(lenient().transaction(&raw).unwrap().total_price.cents(), 500);
    }

    #[test]
    fn test_unparsable_numbers_become_zero() {
        let raw = RawRecord::new(
            "p1",
            json!({"nome": "Ovos", "precoVenda": "caro", "precoCusto": -3, "quantidade": {}}),
        );
        let item = lenient().catalog_item(&raw).unwrap();
        assert_eq!(item.name, "Ovos");
        assert_eq!(item.sale_price, Money::zero());
        assert_eq!(item.cost_price, Money::zero());
        assert_eq!(item.stock_quantity, 0);
    }

    #[test]
    fn test_timestamp_shapes() {
        let n = lenient();
        let expected = Utc.with_ymd_and_hms(2026, 10, 1, 10, 0, 0).unwrap();

        let backend = json!({"seconds": expected.timestamp(), "nanoseconds": 0});
        assert_eq!(n.parse_instant(&backend), Some(expected));

        let admin = json!({"_seconds": expected.timestamp(), "_nanoseconds": 0});
        assert_eq!(n.parse_instant(&admin), Some(expected));

        assert_eq!(n.parse_instant(&json!("2026-10-01T10:00:00Z")), Some(expected));
        assert_eq!(n.parse_instant(&json!("2026-10-01T07:00:00-03:00")), Some(expected));
        assert_eq!(
            n.parse_instant(&json!(expected.timestamp_millis())),
            Some(expected)
        );
        assert_eq!(
            n.parse_instant(&json!("2026-10-01")),
            Some(Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(n.parse_instant(&json!(true)), None);
        assert_eq!(n.parse_instant(&json!("yesterday")), None);
    }

    #[test]
    fn test_naive_datetime_uses_local_offset() {
        let brt = FixedOffset::west_opt(3 * 3600).unwrap();
        let n = lenient().with_local_offset(brt);
        assert_eq!(
            n.parse_instant(&json!("2026-10-01T07:00:00")),
            Some(Utc.with_ymd_and_hms(2026, 10, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_missing_timestamp_defaults_to_now() {
        let raw = RawRecord::new("s", json!({"dataVenda": "not a date"}));
        assert_eq!(lenient().transaction(&raw).unwrap().occurred_at, now());
    }

    #[test]
    fn test_reject_policy_raises_malformed() {
        let raw = RawRecord::new("s-9", json!({"quantity": 1}));
        let err = strict().transaction(&raw).unwrap_err();
        assert_eq!(
            err,
            CoreError::malformed("sales", "s-9", "missing or unreadable occurredAt")
        );
    }

    #[test]
    fn test_goal_legacy_fields() {
        let raw = RawRecord::new(
            "g1",
            json!({
                "titulo": "Vender 100 dúzias",
                "tipo": "produtos",
                "valorMeta": "100",
                "valorAtual": 40,
                "dataInicio": "2026-10-01",
                "dataFim": "2026-10-31",
                "status": "atrasada",
                "prioridade": "alta",
                "dataCriacao": "2026-10-01"
            }),
        );
        let goal = strict().goal(&raw).unwrap();
        assert_eq!(goal.kind, GoalKind::Products);
        assert_eq!(goal.status, GoalStatus::Late);
        assert_eq!(goal.priority, Priority::High);
        assert_eq!(goal.target_value, 100.0);
        assert_eq!(goal.current_value, 40.0);
    }

    #[test]
    fn test_unknown_labels_take_defaults() {
        let raw = RawRecord::new("g2", json!({"tipo": "???", "status": 7}));
        let goal = lenient().goal(&raw).unwrap();
        assert_eq!(goal.kind, GoalKind::Sales);
        assert_eq!(goal.status, GoalStatus::Active);
        assert_eq!(goal.priority, Priority::Medium);
    }

    #[test]
    fn test_notification_read_at_is_optional() {
        let raw = RawRecord::new(
            "n1",
            json!({"titulo": "Estoque baixo", "tipo": "estoque", "lida": false}),
        );
        let notification = strict().notification(&raw);
        // createdAt is required under the strict policy
        assert!(notification.is_err());

        let notification = lenient().notification(&raw).unwrap();
        assert_eq!(notification.kind, NotificationKind::Stock);
        assert!(!notification.read);
        assert_eq!(notification.read_at, None);
    }

    #[test]
    fn test_normalize_all() {
        let raws = vec![
            RawRecord::new("a", json!({"occurredAt": "2026-10-01"})),
            RawRecord::new("b", json!({})),
        ];
        let n = lenient();
        assert_eq!(normalize_all(&raws, |r| n.transaction(r)).unwrap().len(), 2);

        let s = strict();
        assert!(normalize_all(&raws, |r| s.transaction(r)).is_err());
    }

    #[test]
    fn test_raw_record_deserializes_flat() {
        let raw: RawRecord =
            serde_json::from_value(json!({"id": "x", "nome": "Mel", "precoVenda": 30})).unwrap();
        assert_eq!(raw.id, "x");
        assert_eq!(raw.field(&["name", "nome"]), Some(&json!("Mel")));
        assert!(!raw.fields.contains_key("id"));
    }
}
