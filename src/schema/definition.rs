//! Canonical table definitions.
//!
//! This is the shape every migration chain must converge to. Changing it
//! without adding a migration is schema drift, reported by `tradedb check`
//! and turned into a new revision by `tradedb generate`.

use super::{Catalog, Column, ReferentialAction, Table};

const NOW: &str = "CURRENT_TIMESTAMP";

fn created_at() -> Column {
    Column::new("created_at", "DATETIME").not_null().default_expr(NOW)
}

fn updated_at() -> Column {
    Column::new("updated_at", "DATETIME").not_null().default_expr(NOW)
}

fn float(name: &str) -> Column {
    Column::new(name, "FLOAT")
}

/// The declared schema, tables in dependency order.
#[must_use]
pub fn catalog() -> Catalog {
    Catalog::new(vec![
        users(),
        assets(),
        strategies(),
        price_data(),
        signals(),
        orders(),
        backtest_results(),
        technical_indicators(),
        target_labels(),
    ])
}

fn users() -> Table {
    Table::new("users")
        .column(Column::primary_key("id"))
        .column(Column::new("username", "VARCHAR(50)").not_null())
        .column(Column::new("email", "VARCHAR(255)").not_null())
        .column(Column::new("hashed_password", "VARCHAR").not_null())
        .column(created_at())
        .column(updated_at())
        .unique_index("ix_users_username", &["username"])
        .unique_index("ix_users_email", &["email"])
}

fn assets() -> Table {
    Table::new("assets")
        .column(Column::primary_key("id"))
        .column(Column::new("symbol", "VARCHAR").not_null())
        .column(Column::new("name", "VARCHAR"))
        .column(Column::new("asset_type", "VARCHAR"))
        .column(created_at())
        .unique_index("ix_assets_symbol", &["symbol"])
}

fn strategies() -> Table {
    Table::new("strategies")
        .column(Column::primary_key("id"))
        .column(Column::new("name", "VARCHAR").not_null())
        .column(Column::new("description", "TEXT"))
        .column(Column::new("model_version", "VARCHAR"))
        // JSON object
        .column(Column::new("parameters", "TEXT"))
        .column(Column::new("user_id", "INTEGER"))
        .column(created_at())
        .column(updated_at())
        .foreign_key("user_id", "users", ReferentialAction::Cascade)
        .index("ix_strategies_name", &["name"])
        .unique_index("uq_user_strategy_name", &["user_id", "name"])
}

fn price_data() -> Table {
    Table::new("price_data")
        .column(Column::primary_key("id"))
        .column(Column::new("asset_id", "INTEGER").not_null())
        .column(Column::new("timestamp", "DATETIME").not_null())
        .column(float("open").not_null())
        .column(float("high").not_null())
        .column(float("low").not_null())
        .column(float("close").not_null())
        .column(float("volume").not_null())
        .column(Column::new("source", "VARCHAR").not_null())
        .foreign_key("asset_id", "assets", ReferentialAction::Cascade)
        .unique_index(
            "idx_asset_timestamp_source",
            &["asset_id", "timestamp", "source"],
        )
        .index("ix_price_data_timestamp", &["timestamp"])
}

fn signals() -> Table {
    Table::new("signals")
        .column(Column::primary_key("id"))
        .column(Column::new("asset_id", "INTEGER").not_null())
        .column(Column::new("strategy_id", "INTEGER").not_null())
        .column(Column::new("timestamp", "DATETIME").not_null())
        .column(Column::new("signal_type", "VARCHAR(4)").not_null())
        .column(float("confidence_score"))
        .column(float("risk_score"))
        .column(float("price_at_signal"))
        .foreign_key("asset_id", "assets", ReferentialAction::Cascade)
        .foreign_key("strategy_id", "strategies", ReferentialAction::Cascade)
        .index("ix_signals_timestamp", &["timestamp"])
        .index("ix_signals_signal_type", &["signal_type"])
        .index(
            "idx_signal_asset_strategy_timestamp",
            &["asset_id", "strategy_id", "timestamp"],
        )
}

fn orders() -> Table {
    Table::new("orders")
        .column(Column::primary_key("id"))
        .column(Column::new("user_id", "INTEGER"))
        .column(Column::new("asset_id", "INTEGER").not_null())
        .column(Column::new("strategy_id", "INTEGER"))
        .column(Column::new("signal_id", "INTEGER"))
        .column(
            Column::new("order_type", "VARCHAR(6)")
                .not_null()
                .default_expr("'MARKET'"),
        )
        .column(Column::new("order_side", "VARCHAR(4)").not_null())
        .column(
            Column::new("status", "VARCHAR(16)")
                .not_null()
                .default_expr("'PENDING'"),
        )
        .column(float("quantity").not_null())
        .column(float("price"))
        .column(float("filled_quantity").not_null().default_expr("0"))
        .column(float("average_fill_price"))
        .column(float("commission"))
        .column(Column::new("exchange_order_id", "VARCHAR"))
        .column(
            Column::new("is_simulated", "BOOLEAN")
                .not_null()
                .default_expr("1"),
        )
        .column(created_at())
        .column(updated_at())
        .column(float("pnl"))
        .foreign_key("user_id", "users", ReferentialAction::SetNull)
        .foreign_key("asset_id", "assets", ReferentialAction::Cascade)
        .foreign_key("strategy_id", "strategies", ReferentialAction::SetNull)
        .foreign_key("signal_id", "signals", ReferentialAction::SetNull)
        .index("ix_orders_status", &["status"])
        .index("ix_orders_exchange_order_id", &["exchange_order_id"])
        .index("ix_orders_created_at", &["created_at"])
        .index(
            "idx_order_asset_strategy_created",
            &["asset_id", "strategy_id", "created_at"],
        )
        .index(
            "ix_order_status_user_created",
            &["status", "user_id", "created_at"],
        )
}

fn backtest_results() -> Table {
    Table::new("backtest_results")
        .column(Column::primary_key("id"))
        .column(Column::new("strategy_id", "INTEGER").not_null())
        .column(Column::new("start_time", "DATETIME").not_null())
        .column(Column::new("end_time", "DATETIME").not_null())
        .column(float("initial_capital").not_null())
        .column(float("final_capital").not_null())
        .column(float("total_profit").not_null())
        .column(Column::new("total_trades", "INTEGER").not_null())
        .column(Column::new("winning_trades", "INTEGER").not_null())
        .column(Column::new("losing_trades", "INTEGER").not_null())
        .column(float("win_rate").not_null())
        .column(float("accuracy"))
        .column(float("max_drawdown").not_null())
        .column(float("sharpe_ratio"))
        .column(float("sortino_ratio"))
        .column(Column::new("parameters_used", "TEXT"))
        .column(created_at())
        .foreign_key("strategy_id", "strategies", ReferentialAction::Cascade)
        .index(
            "idx_backtest_strategy_created",
            &["strategy_id", "created_at"],
        )
}

fn technical_indicators() -> Table {
    Table::new("technical_indicators")
        .column(Column::primary_key("id"))
        .column(Column::new("price_data_id", "INTEGER").not_null())
        .column(Column::new("asset_id", "INTEGER").not_null())
        .column(Column::new("timestamp", "DATETIME").not_null())
        .column(Column::new("indicator_name", "VARCHAR").not_null())
        // NULL during an indicator's warm-up window
        .column(float("value"))
        .column(Column::new("parameters", "TEXT"))
        .foreign_key("price_data_id", "price_data", ReferentialAction::Cascade)
        .foreign_key("asset_id", "assets", ReferentialAction::Cascade)
        .unique_index(
            "uq_indicator_price_data_name",
            &["price_data_id", "indicator_name"],
        )
        .index("idx_indicator_asset_timestamp", &["asset_id", "timestamp"])
}

fn target_labels() -> Table {
    Table::new("target_labels")
        .column(Column::primary_key("id"))
        .column(Column::new("asset_id", "INTEGER").not_null())
        .column(Column::new("timestamp", "DATETIME").not_null())
        .column(Column::new("label", "VARCHAR(4)").not_null())
        .column(created_at())
        .foreign_key("asset_id", "assets", ReferentialAction::Cascade)
        .unique_index(
            "uq_target_label_asset_timestamp",
            &["asset_id", "timestamp"],
        )
}
