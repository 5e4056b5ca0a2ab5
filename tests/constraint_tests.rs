mod harness;

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use harness::temp_db::TempDb;
use tradedb::db::model::{
    Asset, NewAsset, NewOrder, NewPriceBar, NewSignal, NewStrategy, NewTargetLabel,
    NewTechnicalIndicator, Order, Strategy,
};
use tradedb::db::schema::{orders, signals, strategies, users};
use tradedb::db::{count_rows, Repository};
use tradedb::domain::{OrderSide, SignalType};
use tradedb::error::Error;

fn at(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap()
}

fn btcusd(repo: &Repository) -> Asset {
    repo.create_asset(&NewAsset {
        symbol: "BTCUSD",
        name: Some("Bitcoin"),
        asset_type: Some("crypto"),
    })
    .unwrap()
}

fn bar(asset_id: i32, timestamp: NaiveDateTime, source: &str) -> NewPriceBar<'_> {
    NewPriceBar {
        asset_id,
        timestamp,
        open: 100.0,
        high: 110.0,
        low: 95.0,
        close: 105.0,
        volume: 12.5,
        source,
    }
}

fn strategy(repo: &Repository, user_id: Option<i32>) -> Strategy {
    repo.create_strategy(&NewStrategy {
        name: "momentum".into(),
        description: None,
        model_version: Some("v1".into()),
        parameters: None,
        user_id,
    })
    .unwrap()
}

#[test]
fn duplicate_price_bar_is_a_unique_violation() {
    let db = TempDb::migrated();
    let repo = db.repository();
    let asset = btcusd(&repo);

    let first = repo.insert_price_bar(&bar(asset.id, at(9), "binance")).unwrap();
    let mut duplicate = bar(asset.id, at(9), "binance");
    duplicate.close = 999.0;
    duplicate.volume = 1.0;
    let err = repo.insert_price_bar(&duplicate).unwrap_err();

    assert!(matches!(err, Error::UniqueViolation(_)), "got {err:?}");
    assert_eq!(repo.count_price_bars(asset.id).unwrap(), 1);
    assert_eq!(repo.price_bars_for(asset.id, Some("binance")).unwrap(), [first]);
}

#[test]
fn same_bar_from_another_source_is_accepted() {
    let db = TempDb::migrated();
    let repo = db.repository();
    let asset = btcusd(&repo);

    repo.insert_price_bar(&bar(asset.id, at(9), "binance")).unwrap();
    repo.insert_price_bar(&bar(asset.id, at(9), "kraken")).unwrap();
    assert_eq!(repo.count_price_bars(asset.id).unwrap(), 2);
    assert_eq!(repo.price_bars_for(asset.id, Some("kraken")).unwrap().len(), 1);
}

#[test]
fn order_with_unknown_signal_is_a_foreign_key_violation() {
    let db = TempDb::migrated();
    let repo = db.repository();
    let asset = btcusd(&repo);

    let mut order = NewOrder::market(asset.id, OrderSide::Buy, 1.0);
    order.signal_id = Some(4242);
    let err = repo.create_order(&order).unwrap_err();

    assert!(matches!(err, Error::ForeignKeyViolation(_)), "got {err:?}");
    let mut conn = db.pool().get().unwrap();
    assert_eq!(count_rows(&mut conn, "orders").unwrap(), 0);
}

#[test]
fn duplicate_symbol_is_rejected() {
    let db = TempDb::migrated();
    let repo = db.repository();
    btcusd(&repo);
    let err = repo
        .create_asset(&NewAsset {
            symbol: "BTCUSD",
            name: None,
            asset_type: None,
        })
        .unwrap_err();
    assert!(matches!(err, Error::UniqueViolation(_)));
}

#[test]
fn strategy_names_are_unique_per_user() {
    let db = TempDb::migrated();
    let repo = db.repository();
    let alice = repo.create_user("alice", "alice@example.com", "x").unwrap();
    let bob = repo.create_user("bob", "bob@example.com", "x").unwrap();

    strategy(&repo, Some(alice.id));
    strategy(&repo, Some(bob.id));
    let err = repo
        .create_strategy(&NewStrategy {
            name: "momentum".into(),
            description: None,
            model_version: None,
            parameters: None,
            user_id: Some(alice.id),
        })
        .unwrap_err();
    assert!(matches!(err, Error::UniqueViolation(_)));
}

#[test]
fn deleting_an_asset_cascades_to_its_data() {
    let db = TempDb::migrated();
    let repo = db.repository();
    let asset = btcusd(&repo);
    let momentum = strategy(&repo, None);

    let price = repo.insert_price_bar(&bar(asset.id, at(9), "binance")).unwrap();
    repo.insert_indicator(&NewTechnicalIndicator {
        price_data_id: price.id,
        asset_id: asset.id,
        timestamp: at(9),
        indicator_name: "rsi_14",
        value: None,
        parameters: None,
    })
    .unwrap();
    repo.insert_target_label(&NewTargetLabel {
        asset_id: asset.id,
        timestamp: at(9),
        label: SignalType::Buy,
    })
    .unwrap();
    repo.create_signal(&NewSignal {
        asset_id: asset.id,
        strategy_id: momentum.id,
        timestamp: at(9),
        signal_type: SignalType::Buy,
        confidence_score: Some(0.8),
        risk_score: None,
        price_at_signal: Some(105.0),
    })
    .unwrap();
    repo.create_order(&NewOrder::market(asset.id, OrderSide::Buy, 0.5))
        .unwrap();

    assert!(repo.delete_asset(asset.id).unwrap());
    assert!(!repo.delete_asset(asset.id).unwrap());

    let mut conn = db.pool().get().unwrap();
    for table in [
        "price_data",
        "technical_indicators",
        "target_labels",
        "signals",
        "orders",
    ] {
        assert_eq!(count_rows(&mut conn, table).unwrap(), 0, "{table} not emptied");
    }
    assert_eq!(count_rows(&mut conn, "strategies").unwrap(), 1);
}

#[test]
fn deleting_order_provenance_sets_links_to_null() {
    let db = TempDb::migrated();
    let repo = db.repository();
    let asset = btcusd(&repo);
    let user = repo.create_user("carol", "carol@example.com", "x").unwrap();
    let momentum = strategy(&repo, None);
    let signal = repo
        .create_signal(&NewSignal {
            asset_id: asset.id,
            strategy_id: momentum.id,
            timestamp: at(10),
            signal_type: SignalType::Sell,
            confidence_score: None,
            risk_score: None,
            price_at_signal: None,
        })
        .unwrap();

    let mut order = NewOrder::market(asset.id, OrderSide::Sell, 2.0);
    order.user_id = Some(user.id);
    order.strategy_id = Some(momentum.id);
    order.signal_id = Some(signal.id);
    let order = repo.create_order(&order).unwrap();

    let mut conn = db.pool().get().unwrap();
    diesel::delete(users::table.find(user.id))
        .execute(&mut conn)
        .unwrap();
    diesel::delete(strategies::table.find(momentum.id))
        .execute(&mut conn)
        .unwrap();

    // The strategy delete cascades to its signals.
    assert_eq!(count_rows(&mut conn, "signals").unwrap(), 0);
    let stored: Order = orders::table
        .find(order.id)
        .select(Order::as_select())
        .first(&mut conn)
        .unwrap();
    assert_eq!(stored.user_id, None);
    assert_eq!(stored.strategy_id, None);
    assert_eq!(stored.signal_id, None);
    assert_eq!(stored.asset_id, asset.id);
}

#[test]
fn signal_requires_existing_strategy() {
    let db = TempDb::migrated();
    let repo = db.repository();
    let asset = btcusd(&repo);
    let err = repo
        .create_signal(&NewSignal {
            asset_id: asset.id,
            strategy_id: 77,
            timestamp: at(11),
            signal_type: SignalType::Hold,
            confidence_score: None,
            risk_score: None,
            price_at_signal: None,
        })
        .unwrap_err();
    assert!(matches!(err, Error::ForeignKeyViolation(_)));

    let mut conn = db.pool().get().unwrap();
    let remaining: i64 = signals::table.count().get_result(&mut conn).unwrap();
    assert_eq!(remaining, 0);
}
