//! Synchronous data access over the connection pool.
//!
//! Constraint failures come back as [`Error::UniqueViolation`] and
//! [`Error::ForeignKeyViolation`]; nothing here retries.

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::SqliteConnection;

use super::model::{
    Asset, BacktestResult, NewAsset, NewBacktestResult, NewOrder, NewPriceBar, NewSignal,
    NewStrategy, NewTargetLabel, NewTechnicalIndicator, NewUser, Order, OrderFill, PriceBar,
    Signal, Strategy, TargetLabel, TechnicalIndicator, User,
};
use super::schema::{
    assets, backtest_results, orders, price_data, signals, strategies, target_labels,
    technical_indicators, users,
};
use super::DbPool;
use crate::domain::OrderStatus;
use crate::error::Result;

type Conn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Insert one row and read it back inside a single transaction.
///
/// The new row holds the largest rowid of its table.
macro_rules! insert_and_fetch {
    ($conn:expr, $table:ident, $values:expr, $row:ty) => {
        $conn.transaction::<$row, diesel::result::Error, _>(|conn| {
            diesel::insert_into($table::table)
                .values($values)
                .execute(conn)?;
            $table::table
                .order($table::id.desc())
                .select(<$row>::as_select())
                .first(conn)
        })
    };
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Row access for every table in the schema.
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<Conn> {
        Ok(self.pool.get()?)
    }

    /// # Errors
    /// Returns [`crate::error::Error::UniqueViolation`] if the username or
    /// email is taken.
    pub fn create_user(&self, username: &str, email: &str, hashed_password: &str) -> Result<User> {
        let mut conn = self.conn()?;
        let new = NewUser {
            username,
            email,
            hashed_password,
        };
        Ok(insert_and_fetch!(conn, users, &new, User)?)
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let mut conn = self.conn()?;
        Ok(users::table
            .filter(users::username.eq(username))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?)
    }

    /// # Errors
    /// Returns [`crate::error::Error::UniqueViolation`] if the symbol exists.
    pub fn create_asset(&self, new: &NewAsset<'_>) -> Result<Asset> {
        let mut conn = self.conn()?;
        Ok(insert_and_fetch!(conn, assets, new, Asset)?)
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub fn find_asset_by_symbol(&self, symbol: &str) -> Result<Option<Asset>> {
        let mut conn = self.conn()?;
        Ok(assets::table
            .filter(assets::symbol.eq(symbol))
            .select(Asset::as_select())
            .first(&mut conn)
            .optional()?)
    }

    /// # Errors
    /// Returns [`crate::error::Error::UniqueViolation`] if the owner already
    /// has a strategy of that name, or a foreign key error for an unknown
    /// owner.
    pub fn create_strategy(&self, new: &NewStrategy) -> Result<Strategy> {
        let mut conn = self.conn()?;
        Ok(insert_and_fetch!(conn, strategies, new, Strategy)?)
    }

    /// Replace a strategy's parameters and touch `updated_at`.
    ///
    /// # Errors
    /// Returns an error if the strategy does not exist.
    pub fn update_strategy_parameters(
        &self,
        id: i32,
        parameters: &serde_json::Value,
    ) -> Result<Strategy> {
        let text = serde_json::to_string(parameters)?;
        let mut conn = self.conn()?;
        Ok(conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::update(strategies::table.find(id))
                .set((
                    strategies::parameters.eq(Some(text)),
                    strategies::updated_at.eq(now()),
                ))
                .execute(conn)?;
            strategies::table
                .find(id)
                .select(Strategy::as_select())
                .first(conn)
        })?)
    }

    /// # Errors
    /// Returns [`crate::error::Error::UniqueViolation`] if a bar already
    /// exists for the same asset, timestamp and source.
    pub fn insert_price_bar(&self, bar: &NewPriceBar<'_>) -> Result<PriceBar> {
        let mut conn = self.conn()?;
        Ok(insert_and_fetch!(conn, price_data, bar, PriceBar)?)
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub fn count_price_bars(&self, asset_id: i32) -> Result<i64> {
        let mut conn = self.conn()?;
        Ok(price_data::table
            .filter(price_data::asset_id.eq(asset_id))
            .count()
            .get_result(&mut conn)?)
    }

    /// Bars for an asset in time order, optionally from one source only.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn price_bars_for(&self, asset_id: i32, source: Option<&str>) -> Result<Vec<PriceBar>> {
        let mut conn = self.conn()?;
        let mut query = price_data::table
            .filter(price_data::asset_id.eq(asset_id))
            .select(PriceBar::as_select())
            .order((price_data::timestamp.asc(), price_data::id.asc()))
            .into_boxed();
        if let Some(source) = source {
            query = query.filter(price_data::source.eq(source));
        }
        Ok(query.load(&mut conn)?)
    }

    /// # Errors
    /// Returns a foreign key error for an unknown asset or strategy.
    pub fn create_signal(&self, new: &NewSignal) -> Result<Signal> {
        let mut conn = self.conn()?;
        Ok(insert_and_fetch!(conn, signals, new, Signal)?)
    }

    /// # Errors
    /// Returns [`crate::error::Error::ForeignKeyViolation`] if any of the
    /// referenced rows does not exist.
    pub fn create_order(&self, new: &NewOrder) -> Result<Order> {
        let mut conn = self.conn()?;
        Ok(insert_and_fetch!(conn, orders, new, Order)?)
    }

    /// Move an order to `status`, apply any fill data and touch `updated_at`.
    ///
    /// # Errors
    /// Returns an error if the order does not exist.
    pub fn update_order_status(
        &self,
        id: i32,
        status: OrderStatus,
        fill: &OrderFill,
    ) -> Result<Order> {
        let mut conn = self.conn()?;
        Ok(conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::update(orders::table.find(id))
                .set((
                    orders::status.eq(status),
                    orders::updated_at.eq(now()),
                    fill,
                ))
                .execute(conn)?;
            orders::table
                .find(id)
                .select(Order::as_select())
                .first(conn)
        })?)
    }

    /// # Errors
    /// Returns a foreign key error for an unknown strategy.
    pub fn record_backtest(&self, new: &NewBacktestResult) -> Result<BacktestResult> {
        let mut conn = self.conn()?;
        Ok(insert_and_fetch!(conn, backtest_results, new, BacktestResult)?)
    }

    /// # Errors
    /// Returns [`crate::error::Error::UniqueViolation`] if the bar already
    /// carries an indicator of that name.
    pub fn insert_indicator(
        &self,
        new: &NewTechnicalIndicator<'_>,
    ) -> Result<TechnicalIndicator> {
        let mut conn = self.conn()?;
        Ok(insert_and_fetch!(
            conn,
            technical_indicators,
            new,
            TechnicalIndicator
        )?)
    }

    /// # Errors
    /// Returns [`crate::error::Error::UniqueViolation`] if the asset is
    /// already labelled at that timestamp.
    pub fn insert_target_label(&self, new: &NewTargetLabel) -> Result<TargetLabel> {
        let mut conn = self.conn()?;
        Ok(insert_and_fetch!(conn, target_labels, new, TargetLabel)?)
    }

    /// Delete an asset together with its dependent rows.
    ///
    /// Returns whether a row was deleted.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub fn delete_asset(&self, id: i32) -> Result<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(assets::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}
