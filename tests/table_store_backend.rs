//! End-to-end behaviour of the table-store backend over in-memory storage.

#![allow(clippy::unwrap_used)]

mod common;

use common::{at, closed_position, deal, order, position, trade};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use trading_history::domain::value_objects::{
    OrderStatus, OrderType, Page, PaginatedResult, SortOrder, TimeRange,
};
use trading_history::infrastructure::persistence::table_store::TableStoreBackend;
use trading_history::infrastructure::persistence::{
    DealFilter, DealsRepository, FilterLocation, HistoryBackend, OrderHistoryFilter,
    OrdersHistoryRepository, PositionFilter, PositionsHistoryRepository, TradeFilter,
    TradesRepository,
};

fn backend() -> HistoryBackend {
    HistoryBackend::TableStore(TableStoreBackend::in_memory(Duration::from_secs(5)))
}

fn ids<T>(page: &PaginatedResult<T>, id: impl Fn(&T) -> &str) -> Vec<String> {
    page.contents.iter().map(|r| id(r).to_string()).collect()
}

#[tokio::test]
async fn evaluates_filters_client_side() {
    assert_eq!(backend().filter_location(), FilterLocation::ClientScan);
}

#[tokio::test]
async fn position_with_deal_is_paged_back() {
    let backend = backend();
    let d1 = deal("D1", "A1", "BTCUSD", 5, 12);
    let p1 = closed_position("P1", &d1);
    assert_ok!(backend.positions().add(&p1, Some(&d1)).await);

    let filter = PositionFilter::new(Some("A1".into()), Some("BTCUSD".into()));
    let page = backend
        .positions()
        .get_by_pages(&filter, Some(Page::new(0, 10).unwrap()), SortOrder::Ascending)
        .await
        .unwrap();

    assert_eq!(page.contents, vec![p1]);
    assert_eq!(page.total_size, 1);
    assert_eq!(page.start, 0);
    assert_eq!(backend.deals().get("D1").await.unwrap(), Some(d1));
}

#[tokio::test]
async fn absent_filters_return_everything_oldest_first() {
    let backend = backend();
    for (id, minute) in [("P3", 30), ("P1", 10), ("P2", 20)] {
        backend
            .positions()
            .add(&position(id, "A1", "BTCUSD", minute), None)
            .await
            .unwrap();
    }

    let page = backend
        .positions()
        .get_by_pages(&PositionFilter::default(), None, SortOrder::Ascending)
        .await
        .unwrap();
    assert_eq!(ids(&page, |p| p.id.as_str()), vec!["P1", "P2", "P3"]);
    assert_eq!(page.total_size, 3);

    let newest_first = backend
        .positions()
        .get_by_pages(&PositionFilter::default(), None, SortOrder::Descending)
        .await
        .unwrap();
    assert_eq!(ids(&newest_first, |p| p.id.as_str()), vec!["P3", "P2", "P1"]);
}

#[tokio::test]
async fn equal_timestamps_keep_write_order() {
    let backend = backend();
    for id in ["O1", "O2", "O3"] {
        backend.orders().add(&order(id, "A1", None, 0)).await.unwrap();
    }
    for direction in [SortOrder::Ascending, SortOrder::Descending] {
        let page = backend
            .orders()
            .get_history_by_pages(&OrderHistoryFilter::default(), None, direction)
            .await
            .unwrap();
        assert_eq!(ids(&page, |o| o.id.as_str()), vec!["O1", "O2", "O3"]);
    }
}

mod related_orders {
    use super::*;

    async fn family(backend: &HistoryBackend) {
        let orders = backend.orders();
        orders.add(&order("P1", "A1", None, 0)).await.unwrap();
        orders.add(&order("C1", "A1", Some("P1"), 1)).await.unwrap();
        orders.add(&order("C2", "A1", Some("P1"), 2)).await.unwrap();
        orders.add(&order("X1", "A2", None, 3)).await.unwrap();
        orders.add(&order("X1-sl", "A2", Some("X1"), 4)).await.unwrap();
    }

    #[tokio::test]
    async fn with_related_keeps_duplicates() {
        let backend = backend();
        family(&backend).await;
        let filter = OrderHistoryFilter::default()
            .with_account("A1")
            .with_related(true);

        let page = backend
            .orders()
            .get_history_by_pages(&filter, None, SortOrder::Ascending)
            .await
            .unwrap();
        assert_eq!(ids(&page, |o| o.id.as_str()), vec!["P1", "C1", "C1", "C2", "C2"]);
        assert_eq!(page.total_size, 5);
    }

    #[tokio::test]
    async fn parent_filter_reaches_children_outside_base_predicate() {
        let backend = backend();
        family(&backend).await;
        let filter = OrderHistoryFilter::default()
            .with_order_types(vec![OrderType::Market])
            .with_parent_order_id("P1");

        let page = backend
            .orders()
            .get_history_by_pages(&filter, None, SortOrder::Ascending)
            .await
            .unwrap();
        assert_eq!(ids(&page, |o| o.id.as_str()), vec!["C1", "C2"]);
    }

    #[tokio::test]
    async fn lookup_by_id_follows_write_order() {
        let backend = backend();
        family(&backend).await;
        let mut executed = order("P1", "A1", None, 9);
        executed.status = OrderStatus::Executed;
        backend.orders().add(&executed).await.unwrap();

        let rows = backend
            .orders()
            .get_history_by_order_id("P1", None, true)
            .await
            .unwrap();
        let ids: Vec<_> = rows.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "C1", "C2", "P1"]);

        let executed_only = backend
            .orders()
            .get_history_by_order_id("P1", Some(OrderStatus::Executed), false)
            .await
            .unwrap();
        assert_eq!(executed_only, vec![executed]);
    }
}

mod deals {
    use super::*;

    async fn seeded() -> HistoryBackend {
        let backend = backend();
        let rows = [
            deal("D1", "A1", "BTCUSD", 0, 10),
            deal("D2", "A1", "ETHUSD", 5, -3),
            deal("D3", "A1", "BTCUSD", 10, 4),
            deal("D4", "A2", "BTCUSD", 15, 100),
        ];
        for (i, d) in rows.iter().enumerate() {
            let p = closed_position(&format!("P{i}"), d);
            backend.positions().add(&p, Some(d)).await.unwrap();
        }
        backend
    }

    #[tokio::test]
    async fn aggregates_per_instrument() {
        let backend = seeded().await;
        let filter = DealFilter::default().with_account("A1");
        let page = backend
            .deals()
            .get_aggregated("A1", &filter, None, SortOrder::Descending)
            .await
            .unwrap();

        let groups: Vec<_> = page
            .contents
            .iter()
            .map(|g| (g.instrument.as_str(), g.deals_count, g.fpl))
            .collect();
        assert_eq!(
            groups,
            vec![("BTCUSD", 2, Decimal::new(14, 0)), ("ETHUSD", 1, Decimal::new(-3, 0))]
        );
        assert_eq!(page.total_size, 2);
    }

    #[tokio::test]
    async fn close_time_range_is_half_open() {
        let backend = seeded().await;
        let filter = DealFilter::new(
            Some("A1".into()),
            None,
            TimeRange::new(Some(at(0)), Some(at(10))),
        );
        let deals = backend.deals().get_by_filter(&filter).await.unwrap();
        let ids: Vec<_> = deals.iter().map(|d| d.deal_id.as_str()).collect();
        assert_eq!(ids, vec!["D1", "D2"]);
        assert_eq!(
            backend.deals().get_total_pnl(&filter).await.unwrap(),
            Decimal::new(7, 0)
        );
    }

    #[tokio::test]
    async fn total_profit_counts_whole_days() {
        let backend = seeded().await;
        let day = at(0).date_naive();
        assert_eq!(
            backend.deals().get_total_profit("A1", &[day]).await.unwrap(),
            Decimal::new(11, 0)
        );
        let other_day = day.succ_opt().unwrap();
        assert_eq!(
            backend.deals().get_total_profit("A1", &[other_day]).await.unwrap(),
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn unknown_deal_is_none() {
        let backend = seeded().await;
        assert_eq!(backend.deals().get("D9").await.unwrap(), None);
    }
}

mod trades {
    use super::*;

    #[tokio::test]
    async fn filters_by_order_and_position() {
        let backend = backend();
        let trades = backend.trades();
        trades.add(&trade("T1", "O1", "P1", 0)).await.unwrap();
        trades.add(&trade("T2", "O2", "P1", 1)).await.unwrap();
        trades.add(&trade("T3", "O2", "P2", 2)).await.unwrap();

        let by_order = trades
            .get_by_filter(&TradeFilter::by_order_and_position(Some("O2".into()), None))
            .await
            .unwrap();
        assert_eq!(by_order.len(), 2);

        let by_both = trades
            .get_by_filter(&TradeFilter::by_order_and_position(
                Some("O2".into()),
                Some("P1".into()),
            ))
            .await
            .unwrap();
        assert_eq!(by_both.len(), 1);
        assert_eq!(by_both.first().unwrap().id, "T2");
        assert!(trades.get("T3").await.unwrap().is_some());
    }
}

#[test]
fn non_positive_take_never_reaches_storage() {
    assert_err!(Page::new(0, 0));
    assert_err!(Page::new(-1, 5));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn pages_are_contiguous_slices_of_the_filtered_set(
        rows in prop::collection::vec((0i64..6, 0usize..3), 0..24),
        skip in 0i64..30,
        take in 1i64..12,
        ascending in any::<bool>(),
    ) {
        let accounts = ["A1", "A2", "A3"];
        let order = SortOrder::from_ascending(ascending);
        let filter = PositionFilter::new(Some("A1".into()), None);

        let (full, paged, again) = tokio_test::block_on(async {
            let backend = backend();
            for (i, (minute, account)) in rows.iter().enumerate() {
                let account = accounts.get(*account).copied().unwrap_or("A1");
                backend
                    .positions()
                    .add(&position(&format!("P{i}"), account, "BTCUSD", *minute), None)
                    .await
                    .unwrap();
            }
            let positions = backend.positions();
            let page = Some(Page::new(skip, take).unwrap());
            (
                positions.get_by_pages(&filter, None, order).await.unwrap(),
                positions.get_by_pages(&filter, page, order).await.unwrap(),
                positions.get_by_pages(&filter, page, order).await.unwrap(),
            )
        });

        let total = full.contents.len() as i64;
        let expected_len = take.min((total - skip).max(0));
        prop_assert_eq!(paged.contents.len() as i64, expected_len);
        prop_assert_eq!(paged.total_size, full.total_size);
        prop_assert_eq!(paged.start, skip as u64);

        let expected: Vec<_> = full
            .contents
            .iter()
            .skip(skip as usize)
            .take(take as usize)
            .cloned()
            .collect();
        prop_assert_eq!(&paged.contents, &expected);
        prop_assert_eq!(&paged, &again);
        prop_assert!(full.contents.iter().all(|p| p.account_id == "A1"));
    }
}
