//! Row types for Diesel ORM.
//!
//! Queryable rows carry the generated `id`; `New*` rows leave it and every
//! server-side default to the database.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use super::schema::{
    assets, backtest_results, orders, price_data, signals, strategies, target_labels,
    technical_indicators, users,
};
use crate::domain::{OrderSide, OrderStatus, OrderType, SignalType};
use crate::error::Result;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub hashed_password: &'a str,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = assets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Asset {
    pub id: i32,
    pub symbol: String,
    pub name: Option<String>,
    pub asset_type: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = assets)]
pub struct NewAsset<'a> {
    pub symbol: &'a str,
    pub name: Option<&'a str>,
    pub asset_type: Option<&'a str>,
}

/// A strategy definition. `parameters` holds a JSON object.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(table_name = strategies)]
#[diesel(belongs_to(User))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Strategy {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub model_version: Option<String>,
    pub parameters: Option<String>,
    pub user_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Strategy {
    /// Decoded `parameters`, `None` when the column is NULL.
    ///
    /// # Errors
    /// Returns an error if the stored text is not valid JSON.
    pub fn parameters_json(&self) -> Result<Option<serde_json::Value>> {
        self.parameters
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()
            .map_err(Into::into)
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = strategies)]
pub struct NewStrategy {
    pub name: String,
    pub description: Option<String>,
    pub model_version: Option<String>,
    pub parameters: Option<String>,
    pub user_id: Option<i32>,
}

/// One OHLCV bar, unique per asset, timestamp and source.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(table_name = price_data)]
#[diesel(belongs_to(Asset))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PriceBar {
    pub id: i32,
    pub asset_id: i32,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub source: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = price_data)]
pub struct NewPriceBar<'a> {
    pub asset_id: i32,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub source: &'a str,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(table_name = signals)]
#[diesel(belongs_to(Asset))]
#[diesel(belongs_to(Strategy))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Signal {
    pub id: i32,
    pub asset_id: i32,
    pub strategy_id: i32,
    pub timestamp: NaiveDateTime,
    pub signal_type: SignalType,
    pub confidence_score: Option<f64>,
    pub risk_score: Option<f64>,
    pub price_at_signal: Option<f64>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = signals)]
pub struct NewSignal {
    pub asset_id: i32,
    pub strategy_id: i32,
    pub timestamp: NaiveDateTime,
    pub signal_type: SignalType,
    pub confidence_score: Option<f64>,
    pub risk_score: Option<f64>,
    pub price_at_signal: Option<f64>,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Order {
    pub id: i32,
    pub user_id: Option<i32>,
    pub asset_id: i32,
    pub strategy_id: Option<i32>,
    pub signal_id: Option<i32>,
    pub order_type: OrderType,
    pub order_side: OrderSide,
    pub status: OrderStatus,
    pub quantity: f64,
    pub price: Option<f64>,
    pub filled_quantity: f64,
    pub average_fill_price: Option<f64>,
    pub commission: Option<f64>,
    pub exchange_order_id: Option<String>,
    pub is_simulated: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub pnl: Option<f64>,
}

/// A new order. Fill data starts at the column defaults.
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub user_id: Option<i32>,
    pub asset_id: i32,
    pub strategy_id: Option<i32>,
    pub signal_id: Option<i32>,
    pub order_type: OrderType,
    pub order_side: OrderSide,
    pub status: OrderStatus,
    pub quantity: f64,
    pub price: Option<f64>,
    pub exchange_order_id: Option<String>,
    pub is_simulated: bool,
}

impl NewOrder {
    /// A simulated market order with no provenance links.
    #[must_use]
    pub fn market(asset_id: i32, side: OrderSide, quantity: f64) -> Self {
        Self {
            user_id: None,
            asset_id,
            strategy_id: None,
            signal_id: None,
            order_type: OrderType::Market,
            order_side: side,
            status: OrderStatus::default(),
            quantity,
            price: None,
            exchange_order_id: None,
            is_simulated: true,
        }
    }
}

/// Execution progress applied by `Repository::update_order_status`.
#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = orders)]
pub struct OrderFill {
    pub filled_quantity: Option<f64>,
    pub average_fill_price: Option<f64>,
    pub commission: Option<f64>,
    pub exchange_order_id: Option<String>,
    pub pnl: Option<f64>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(table_name = backtest_results)]
#[diesel(belongs_to(Strategy))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BacktestResult {
    pub id: i32,
    pub strategy_id: i32,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_profit: f64,
    pub total_trades: i32,
    pub winning_trades: i32,
    pub losing_trades: i32,
    pub win_rate: f64,
    pub accuracy: Option<f64>,
    pub max_drawdown: f64,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub parameters_used: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = backtest_results)]
pub struct NewBacktestResult {
    pub strategy_id: i32,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_profit: f64,
    pub total_trades: i32,
    pub winning_trades: i32,
    pub losing_trades: i32,
    pub win_rate: f64,
    pub accuracy: Option<f64>,
    pub max_drawdown: f64,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub parameters_used: Option<String>,
}

/// A computed indicator value attached to one price bar.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(table_name = technical_indicators)]
#[diesel(belongs_to(PriceBar, foreign_key = price_data_id))]
#[diesel(belongs_to(Asset))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TechnicalIndicator {
    pub id: i32,
    pub price_data_id: i32,
    pub asset_id: i32,
    pub timestamp: NaiveDateTime,
    pub indicator_name: String,
    pub value: Option<f64>,
    pub parameters: Option<String>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = technical_indicators)]
pub struct NewTechnicalIndicator<'a> {
    pub price_data_id: i32,
    pub asset_id: i32,
    pub timestamp: NaiveDateTime,
    pub indicator_name: &'a str,
    pub value: Option<f64>,
    pub parameters: Option<String>,
}

/// Supervised-learning label for an asset at a point in time.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(table_name = target_labels)]
#[diesel(belongs_to(Asset))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TargetLabel {
    pub id: i32,
    pub asset_id: i32,
    pub timestamp: NaiveDateTime,
    pub label: SignalType,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = target_labels)]
pub struct NewTargetLabel {
    pub asset_id: i32,
    pub timestamp: NaiveDateTime,
    pub label: SignalType,
}
