//! # Query Criteria and Client-Side Evaluation
//!
//! Filter criteria shared by every backend, and the in-memory evaluation used
//! by backends that cannot filter server-side.
//!
//! ## Clause semantics
//!
//! Every criterion is a conjunction of optional clauses. A clause whose input
//! is missing, blank or an empty set is dropped: absent filters match
//! everything. Time ranges are half-open `[start, end)`.
//!
//! ## Ordering
//!
//! Candidates are sorted on their creation timestamp in the requested
//! [`SortOrder`]; ties keep ascending write order (row key or identity
//! column).
//!
//! ## Related orders
//!
//! For order history, when [`OrderHistoryFilter::with_related`] is set or a
//! `parent_order_id` is requested, the pipeline is:
//!
//! ```text
//! matched    = rows matching every clause except parent_order_id
//! related    = rows whose parent_order_id is the id of a matched row
//! candidates = matched ++ related            (duplicates kept)
//! candidates = candidates where parent_order_id == requested parent
//! page       = sort(candidates)[skip .. skip + take]
//! ```
//!
//! The parent clause is applied after the union, so a page may contain the
//! same row twice when it both matched and is related.

use crate::domain::entities::{AggregatedDeal, Deal, OrderHistory, PositionHistory, Trade};
use crate::domain::value_objects::{
    OrderStatus, OrderType, OriginatorType, Page, PaginatedResult, SortOrder, TimeRange,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Returns the value if it is present and not blank.
#[must_use]
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn set_contains<T: PartialEq>(set: &[T], value: &T) -> bool {
    set.is_empty() || set.contains(value)
}

fn eq_clause(clause: Option<&str>, value: &str) -> bool {
    clause.is_none_or(|expected| expected == value)
}

/// Criteria for order history queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHistoryFilter {
    /// Account to match.
    pub account_id: Option<String>,
    /// Instrument to match.
    pub instrument: Option<String>,
    /// Statuses to match; empty matches all.
    pub statuses: Vec<OrderStatus>,
    /// Order types to match; empty matches all.
    pub order_types: Vec<OrderType>,
    /// Originators to match; empty matches all.
    pub originators: Vec<OriginatorType>,
    /// Parent order to match, applied after the related-row union.
    pub parent_order_id: Option<String>,
    /// Also return rows of orders attached to matched orders.
    pub with_related: bool,
    /// Creation time range.
    pub created: TimeRange,
    /// Modification time range.
    pub modified: TimeRange,
}

impl OrderHistoryFilter {
    /// Sets the account clause.
    #[must_use]
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Sets the instrument clause.
    #[must_use]
    pub fn with_instrument(mut self, instrument: impl Into<String>) -> Self {
        self.instrument = Some(instrument.into());
        self
    }

    /// Sets the status set.
    #[must_use]
    pub fn with_statuses(mut self, statuses: Vec<OrderStatus>) -> Self {
        self.statuses = statuses;
        self
    }

    /// Sets the order type set.
    #[must_use]
    pub fn with_order_types(mut self, order_types: Vec<OrderType>) -> Self {
        self.order_types = order_types;
        self
    }

    /// Sets the originator set.
    #[must_use]
    pub fn with_originators(mut self, originators: Vec<OriginatorType>) -> Self {
        self.originators = originators;
        self
    }

    /// Sets the parent order clause.
    #[must_use]
    pub fn with_parent_order_id(mut self, parent_order_id: impl Into<String>) -> Self {
        self.parent_order_id = Some(parent_order_id.into());
        self
    }

    /// Includes related rows.
    #[must_use]
    pub fn with_related(mut self, with_related: bool) -> Self {
        self.with_related = with_related;
        self
    }

    /// Sets the creation time range.
    #[must_use]
    pub fn with_created(mut self, created: TimeRange) -> Self {
        self.created = created;
        self
    }

    /// Sets the modification time range.
    #[must_use]
    pub fn with_modified(mut self, modified: TimeRange) -> Self {
        self.modified = modified;
        self
    }

    /// Account clause, if effective.
    #[must_use]
    pub fn account(&self) -> Option<&str> {
        non_blank(&self.account_id)
    }

    /// Instrument clause, if effective.
    #[must_use]
    pub fn instrument(&self) -> Option<&str> {
        non_blank(&self.instrument)
    }

    /// Parent order clause, if effective.
    #[must_use]
    pub fn parent_order(&self) -> Option<&str> {
        non_blank(&self.parent_order_id)
    }

    /// Returns true if related rows join the candidate set.
    #[must_use]
    pub fn includes_related(&self) -> bool {
        self.with_related || self.parent_order().is_some()
    }

    /// Evaluates every clause except the parent order clause.
    #[must_use]
    pub fn matches(&self, order: &OrderHistory) -> bool {
        eq_clause(self.account(), &order.account_id)
            && eq_clause(self.instrument(), &order.instrument)
            && set_contains(&self.statuses, &order.status)
            && set_contains(&self.order_types, &order.order_type)
            && set_contains(&self.originators, &order.originator)
            && self.created.contains(&order.created_timestamp)
            && self.modified.contains(&order.modified_timestamp)
    }
}

/// Criteria for position queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionFilter {
    /// Account to match.
    pub account_id: Option<String>,
    /// Instrument to match.
    pub instrument: Option<String>,
}

impl PositionFilter {
    /// Creates a filter from optional account and instrument.
    #[must_use]
    pub fn new(account_id: Option<String>, instrument: Option<String>) -> Self {
        Self {
            account_id,
            instrument,
        }
    }

    /// Account clause, if effective.
    #[must_use]
    pub fn account(&self) -> Option<&str> {
        non_blank(&self.account_id)
    }

    /// Instrument clause, if effective.
    #[must_use]
    pub fn instrument(&self) -> Option<&str> {
        non_blank(&self.instrument)
    }

    /// Evaluates the filter.
    #[must_use]
    pub fn matches(&self, position: &PositionHistory) -> bool {
        eq_clause(self.account(), &position.account_id)
            && eq_clause(self.instrument(), &position.instrument)
    }
}

/// Criteria for deal queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealFilter {
    /// Account to match.
    pub account_id: Option<String>,
    /// Instrument to match.
    pub instrument: Option<String>,
    /// Close time range.
    pub close_time: TimeRange,
}

impl DealFilter {
    /// Creates a filter.
    #[must_use]
    pub fn new(account_id: Option<String>, instrument: Option<String>, close_time: TimeRange) -> Self {
        Self {
            account_id,
            instrument,
            close_time,
        }
    }

    /// Sets the account clause.
    #[must_use]
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Sets the instrument clause.
    #[must_use]
    pub fn with_instrument(mut self, instrument: impl Into<String>) -> Self {
        self.instrument = Some(instrument.into());
        self
    }

    /// Account clause, if effective.
    #[must_use]
    pub fn account(&self) -> Option<&str> {
        non_blank(&self.account_id)
    }

    /// Instrument clause, if effective.
    #[must_use]
    pub fn instrument(&self) -> Option<&str> {
        non_blank(&self.instrument)
    }

    /// Evaluates the filter.
    #[must_use]
    pub fn matches(&self, deal: &Deal) -> bool {
        eq_clause(self.account(), &deal.account_id)
            && eq_clause(self.instrument(), &deal.instrument)
            && self.close_time.contains(&deal.created)
    }
}

/// Criteria for trade queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeFilter {
    /// Account to match.
    pub account_id: Option<String>,
    /// Instrument to match.
    pub instrument: Option<String>,
    /// Order to match.
    pub order_id: Option<String>,
    /// Position to match.
    pub position_id: Option<String>,
}

impl TradeFilter {
    /// Creates a filter on order and position.
    #[must_use]
    pub fn by_order_and_position(order_id: Option<String>, position_id: Option<String>) -> Self {
        Self {
            order_id,
            position_id,
            ..Self::default()
        }
    }

    /// Account clause, if effective.
    #[must_use]
    pub fn account(&self) -> Option<&str> {
        non_blank(&self.account_id)
    }

    /// Instrument clause, if effective.
    #[must_use]
    pub fn instrument(&self) -> Option<&str> {
        non_blank(&self.instrument)
    }

    /// Order clause, if effective.
    #[must_use]
    pub fn order(&self) -> Option<&str> {
        non_blank(&self.order_id)
    }

    /// Position clause, if effective.
    #[must_use]
    pub fn position(&self) -> Option<&str> {
        non_blank(&self.position_id)
    }

    /// Evaluates the filter.
    #[must_use]
    pub fn matches(&self, trade: &Trade) -> bool {
        eq_clause(self.account(), &trade.account_id)
            && eq_clause(self.instrument(), &trade.instrument)
            && eq_clause(self.order(), &trade.order_id)
            && eq_clause(self.position(), &trade.position_id)
    }
}

/// A record with its write-order key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyed<K, T> {
    /// Monotonic write-order key.
    pub key: K,
    /// The record.
    pub record: T,
}

impl<K, T> Keyed<K, T> {
    /// Pairs a record with its key.
    pub fn new(key: K, record: T) -> Self {
        Self { key, record }
    }
}

/// Sorts on the creation timestamp, ties by ascending write-order key.
pub fn sort_for_presentation<K: Ord, T>(
    rows: &mut [Keyed<K, T>],
    order: SortOrder,
    created: impl Fn(&T) -> DateTime<Utc>,
) {
    rows.sort_by(|a, b| {
        order
            .apply(created(&a.record).cmp(&created(&b.record)))
            .then_with(|| a.key.cmp(&b.key))
    });
}

/// Filters, sorts and paginates records in memory.
pub fn select_page<K: Ord + Clone, T: Clone>(
    rows: &[Keyed<K, T>],
    predicate: impl Fn(&T) -> bool,
    page: Option<Page>,
    order: SortOrder,
    created: impl Fn(&T) -> DateTime<Utc>,
) -> PaginatedResult<T> {
    let mut candidates: Vec<Keyed<K, T>> = rows
        .iter()
        .filter(|row| predicate(&row.record))
        .cloned()
        .collect();
    sort_for_presentation(&mut candidates, order, created);
    PaginatedResult::from_sorted(candidates.into_iter().map(|row| row.record).collect(), page)
}

/// Evaluates an order history query in memory, related-row union included.
pub fn select_order_history<K: Ord + Clone>(
    rows: &[Keyed<K, OrderHistory>],
    filter: &OrderHistoryFilter,
    page: Option<Page>,
    order: SortOrder,
) -> PaginatedResult<OrderHistory> {
    let mut candidates: Vec<Keyed<K, OrderHistory>> = rows
        .iter()
        .filter(|row| filter.matches(&row.record))
        .cloned()
        .collect();

    if filter.includes_related() {
        let matched_ids: HashSet<String> =
            candidates.iter().map(|row| row.record.id.clone()).collect();
        candidates.extend(
            rows.iter()
                .filter(|row| {
                    row.record
                        .parent_order_id
                        .as_deref()
                        .is_some_and(|parent| matched_ids.contains(parent))
                })
                .cloned(),
        );
    }

    if let Some(parent) = filter.parent_order() {
        candidates.retain(|row| row.record.is_child_of(parent));
    }

    sort_for_presentation(&mut candidates, order, |o| o.created_timestamp);
    PaginatedResult::from_sorted(candidates.into_iter().map(|row| row.record).collect(), page)
}

/// Returns the rows of one order, in write order.
pub fn select_order_by_id<K: Ord + Clone>(
    rows: &[Keyed<K, OrderHistory>],
    order_id: &str,
    status: Option<OrderStatus>,
    with_related: bool,
) -> Vec<OrderHistory> {
    let mut selected: Vec<&Keyed<K, OrderHistory>> = rows
        .iter()
        .filter(|row| row.record.id == order_id || (with_related && row.record.is_child_of(order_id)))
        .filter(|row| status.is_none_or(|s| row.record.status == s))
        .collect();
    selected.sort_by(|a, b| a.key.cmp(&b.key));
    selected.into_iter().map(|row| row.record.clone()).collect()
}

/// Groups the deals of an account per instrument and paginates the groups.
///
/// Groups are ordered on their latest close time, ties by instrument.
pub fn aggregate_deals<'a>(
    deals: impl IntoIterator<Item = &'a Deal>,
    account_id: &str,
    filter: &DealFilter,
    page: Option<Page>,
    order: SortOrder,
) -> PaginatedResult<AggregatedDeal> {
    let mut groups: HashMap<&str, AggregatedDeal> = HashMap::new();
    for deal in deals {
        if deal.account_id != account_id || !filter.matches(deal) {
            continue;
        }
        groups
            .entry(deal.instrument.as_str())
            .and_modify(|group| group.absorb(deal))
            .or_insert_with(|| AggregatedDeal::from_deal(deal));
    }

    let mut sorted: Vec<AggregatedDeal> = groups.into_values().collect();
    sorted.sort_by(|a, b| {
        order
            .apply(a.last_deal_created.cmp(&b.last_deal_created))
            .then_with(|| a.instrument.cmp(&b.instrument))
    });
    PaginatedResult::from_sorted(sorted, page)
}

/// Sums the realized PnL of the deals matching `filter`.
pub fn total_pnl<'a>(deals: impl IntoIterator<Item = &'a Deal>, filter: &DealFilter) -> Decimal {
    deals
        .into_iter()
        .filter(|deal| filter.matches(deal))
        .map(|deal| deal.fpl)
        .sum()
}

/// Sums the realized PnL of an account's deals closed on any of `days`.
pub fn total_profit<'a>(
    deals: impl IntoIterator<Item = &'a Deal>,
    account_id: &str,
    days: &[NaiveDate],
) -> Decimal {
    deals
        .into_iter()
        .filter(|deal| deal.account_id == account_id && days.contains(&deal.created.date_naive()))
        .map(|deal| deal.fpl)
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{OrderDirection, OrderUpdateType, PositionDirection};
    use chrono::{Duration, TimeZone};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn order(id: &str, parent: Option<&str>, minute: i64) -> OrderHistory {
        OrderHistory {
            id: id.to_string(),
            account_id: "A1".to_string(),
            instrument: "BTCUSD".to_string(),
            parent_order_id: parent.map(str::to_string),
            position_id: None,
            direction: OrderDirection::Buy,
            order_type: OrderType::Market,
            status: OrderStatus::Active,
            originator: OriginatorType::Investor,
            update_type: OrderUpdateType::Place,
            volume: Decimal::ONE,
            expected_open_price: None,
            execution_price: None,
            pnl: Decimal::ZERO,
            created_timestamp: base_time() + Duration::minutes(minute),
            modified_timestamp: base_time() + Duration::minutes(minute),
            comment: None,
        }
    }

    fn keyed(rows: Vec<OrderHistory>) -> Vec<Keyed<u64, OrderHistory>> {
        rows.into_iter()
            .enumerate()
            .map(|(i, r)| Keyed::new(i as u64, r))
            .collect()
    }

    fn ids(result: &PaginatedResult<OrderHistory>) -> Vec<&str> {
        result.contents.iter().map(|o| o.id.as_str()).collect()
    }

    mod clauses {
        use super::*;

        #[test]
        fn absent_filters_match_everything() {
            let filter = OrderHistoryFilter::default();
            assert!(filter.matches(&order("O1", None, 0)));
        }

        #[test]
        fn blank_strings_are_absent() {
            let filter = OrderHistoryFilter::default()
                .with_account("  ")
                .with_instrument("");
            assert!(filter.account().is_none());
            assert!(filter.instrument().is_none());
            assert!(filter.matches(&order("O1", None, 0)));
        }

        #[test]
        fn empty_sets_are_absent() {
            let filter = OrderHistoryFilter::default().with_statuses(Vec::new());
            assert!(filter.matches(&order("O1", None, 0)));
        }

        #[test]
        fn clauses_are_conjunctive() {
            let filter = OrderHistoryFilter::default()
                .with_account("A1")
                .with_statuses(vec![OrderStatus::Executed]);
            assert!(!filter.matches(&order("O1", None, 0)));

            let filter = OrderHistoryFilter::default()
                .with_account("A1")
                .with_statuses(vec![OrderStatus::Executed, OrderStatus::Active]);
            assert!(filter.matches(&order("O1", None, 0)));
        }

        #[test]
        fn created_range_is_half_open() {
            let filter = OrderHistoryFilter::default().with_created(TimeRange::new(
                Some(base_time()),
                Some(base_time() + Duration::minutes(1)),
            ));
            assert!(filter.matches(&order("O1", None, 0)));
            assert!(!filter.matches(&order("O2", None, 1)));
        }

        #[test]
        fn trade_filter_matches_order_and_position() {
            let trade = Trade {
                id: "T1".to_string(),
                account_id: "A1".to_string(),
                order_id: "O1".to_string(),
                position_id: "P1".to_string(),
                instrument: "BTCUSD".to_string(),
                trade_type: crate::domain::value_objects::TradeType::Buy,
                price: Decimal::ONE,
                volume: Decimal::ONE,
                timestamp: base_time(),
            };
            assert!(TradeFilter::by_order_and_position(Some("O1".into()), None).matches(&trade));
            assert!(TradeFilter::by_order_and_position(Some("O1".into()), Some("P1".into())).matches(&trade));
            assert!(!TradeFilter::by_order_and_position(Some("O1".into()), Some("P2".into())).matches(&trade));
        }
    }

    mod ordering {
        use super::*;

        #[test]
        fn ascending_and_descending_on_created() {
            let rows = keyed(vec![order("O2", None, 2), order("O1", None, 1), order("O3", None, 3)]);
            let filter = OrderHistoryFilter::default();

            let asc = select_order_history(&rows, &filter, None, SortOrder::Ascending);
            assert_eq!(ids(&asc), vec!["O1", "O2", "O3"]);

            let desc = select_order_history(&rows, &filter, None, SortOrder::Descending);
            assert_eq!(ids(&desc), vec!["O3", "O2", "O1"]);
        }

        #[test]
        fn ties_keep_write_order_in_both_directions() {
            let rows = keyed(vec![order("first", None, 0), order("second", None, 0)]);
            let filter = OrderHistoryFilter::default();

            let asc = select_order_history(&rows, &filter, None, SortOrder::Ascending);
            let desc = select_order_history(&rows, &filter, None, SortOrder::Descending);
            assert_eq!(ids(&asc), vec!["first", "second"]);
            assert_eq!(ids(&desc), vec!["first", "second"]);
        }
    }

    mod related_rows {
        use super::*;

        fn family() -> Vec<Keyed<u64, OrderHistory>> {
            let mut other = order("X1", None, 0);
            other.account_id = "A2".to_string();
            let mut other_child = order("X1-sl", Some("X1"), 1);
            other_child.account_id = "A2".to_string();
            keyed(vec![
                order("P1", None, 0),
                order("P1-sl", Some("P1"), 1),
                order("P1-tp", Some("P1"), 2),
                other,
                other_child,
            ])
        }

        #[test]
        fn related_rows_join_after_matching() {
            let filter = OrderHistoryFilter::default()
                .with_account("A2")
                .with_order_types(vec![OrderType::Market])
                .with_related(true);
            let rows = family();
            let result = select_order_history(&rows, &filter, None, SortOrder::Ascending);
            // X1-sl matches by itself and again as a child of X1.
            assert_eq!(ids(&result), vec!["X1", "X1-sl", "X1-sl"]);
            assert_eq!(result.total_size, 3);
        }

        #[test]
        fn parent_filter_applies_after_union() {
            let filter = OrderHistoryFilter::default()
                .with_account("A1")
                .with_parent_order_id("P1");
            let rows = family();
            let result = select_order_history(&rows, &filter, None, SortOrder::Ascending);
            // Children match on their own and once more through the union.
            assert_eq!(ids(&result), vec!["P1-sl", "P1-sl", "P1-tp", "P1-tp"]);
        }

        #[test]
        fn parent_filter_reaches_children_outside_the_base_predicate() {
            let mut rows = family();
            for row in rows.iter_mut().filter(|r| r.record.parent_order_id.is_some()) {
                row.record.order_type = OrderType::StopLoss;
            }
            let filter = OrderHistoryFilter::default()
                .with_order_types(vec![OrderType::Market])
                .with_parent_order_id("P1");
            let result = select_order_history(&rows, &filter, None, SortOrder::Ascending);
            assert_eq!(ids(&result), vec!["P1-sl", "P1-tp"]);
        }

        #[test]
        fn page_boundary_counts_duplicates() {
            let filter = OrderHistoryFilter::default()
                .with_account("A1")
                .with_parent_order_id("P1");
            let rows = family();
            let page = Page::new(1, 2).unwrap();
            let result = select_order_history(&rows, &filter, Some(page), SortOrder::Ascending);
            assert_eq!(ids(&result), vec!["P1-sl", "P1-tp"]);
            assert_eq!(result.total_size, 4);
        }

        #[test]
        fn order_by_id_with_related() {
            let rows = family();
            let own = select_order_by_id(&rows, "P1", None, false);
            assert_eq!(own.len(), 1);
            let all = select_order_by_id(&rows, "P1", None, true);
            assert_eq!(all.len(), 3);
            let executed = select_order_by_id(&rows, "P1", Some(OrderStatus::Executed), true);
            assert!(executed.is_empty());
        }
    }

    mod deals {
        use super::*;

        fn deal(id: &str, instrument: &str, fpl: i64, day: u32) -> Deal {
            Deal {
                deal_id: id.to_string(),
                created: Utc.with_ymd_and_hms(2024, 5, day, 10, 0, 0).unwrap(),
                account_id: "A1".to_string(),
                instrument: instrument.to_string(),
                open_trade_id: "T-open".to_string(),
                open_order_type: OrderType::Market,
                open_order_volume: Decimal::ONE,
                open_order_expected_price: None,
                close_trade_id: "T-close".to_string(),
                close_order_type: OrderType::Market,
                close_order_volume: Decimal::ONE,
                close_order_expected_price: None,
                direction: PositionDirection::Long,
                volume: Decimal::ONE,
                originator: OriginatorType::Investor,
                open_price: Decimal::ONE,
                open_fx_price: Decimal::ONE,
                close_price: Decimal::ONE,
                close_fx_price: Decimal::ONE,
                fpl: Decimal::new(fpl, 0),
                pnl_of_the_last_day: Decimal::ZERO,
                additional_info: None,
            }
        }

        #[test]
        fn aggregation_groups_per_instrument() {
            let deals = [
                deal("D1", "BTCUSD", 5, 1),
                deal("D2", "ETHUSD", 3, 3),
                deal("D3", "BTCUSD", 2, 2),
            ];
            let result = aggregate_deals(
                deals.iter(),
                "A1",
                &DealFilter::default(),
                None,
                SortOrder::Descending,
            );
            assert_eq!(result.total_size, 2);
            let first = result.contents.first().unwrap();
            assert_eq!(first.instrument, "ETHUSD");
            let second = result.contents.get(1).unwrap();
            assert_eq!(second.instrument, "BTCUSD");
            assert_eq!(second.deals_count, 2);
            assert_eq!(second.fpl, Decimal::new(7, 0));
        }

        #[test]
        fn aggregation_ignores_other_accounts() {
            let mut foreign = deal("D9", "BTCUSD", 100, 1);
            foreign.account_id = "A2".to_string();
            let deals = [deal("D1", "BTCUSD", 5, 1), foreign];
            let result = aggregate_deals(deals.iter(), "A1", &DealFilter::default(), None, SortOrder::Ascending);
            assert_eq!(result.contents.first().unwrap().fpl, Decimal::new(5, 0));
        }

        #[test]
        fn totals() {
            let deals = [
                deal("D1", "BTCUSD", 5, 1),
                deal("D2", "ETHUSD", 3, 3),
                deal("D3", "BTCUSD", -2, 2),
            ];
            let btc = DealFilter::default().with_instrument("BTCUSD");
            assert_eq!(total_pnl(deals.iter(), &btc), Decimal::new(3, 0));

            let days = [
                NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            ];
            assert_eq!(total_profit(deals.iter(), "A1", &days), Decimal::new(8, 0));
            assert_eq!(total_profit(deals.iter(), "A2", &days), Decimal::ZERO);
        }
    }
}
