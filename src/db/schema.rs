// Diesel view of the tables in `schema::definition`. Keep the two in step.

diesel::table! {
    users (id) {
        id -> Integer,
        username -> Text,
        email -> Text,
        hashed_password -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    assets (id) {
        id -> Integer,
        symbol -> Text,
        name -> Nullable<Text>,
        asset_type -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    strategies (id) {
        id -> Integer,
        name -> Text,
        description -> Nullable<Text>,
        model_version -> Nullable<Text>,
        parameters -> Nullable<Text>,
        user_id -> Nullable<Integer>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    price_data (id) {
        id -> Integer,
        asset_id -> Integer,
        timestamp -> Timestamp,
        open -> Double,
        high -> Double,
        low -> Double,
        close -> Double,
        volume -> Double,
        source -> Text,
    }
}

diesel::table! {
    signals (id) {
        id -> Integer,
        asset_id -> Integer,
        strategy_id -> Integer,
        timestamp -> Timestamp,
        signal_type -> Text,
        confidence_score -> Nullable<Double>,
        risk_score -> Nullable<Double>,
        price_at_signal -> Nullable<Double>,
    }
}

diesel::table! {
    orders (id) {
        id -> Integer,
        user_id -> Nullable<Integer>,
        asset_id -> Integer,
        strategy_id -> Nullable<Integer>,
        signal_id -> Nullable<Integer>,
        order_type -> Text,
        order_side -> Text,
        status -> Text,
        quantity -> Double,
        price -> Nullable<Double>,
        filled_quantity -> Double,
        average_fill_price -> Nullable<Double>,
        commission -> Nullable<Double>,
        exchange_order_id -> Nullable<Text>,
        is_simulated -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        pnl -> Nullable<Double>,
    }
}

diesel::table! {
    backtest_results (id) {
        id -> Integer,
        strategy_id -> Integer,
        start_time -> Timestamp,
        end_time -> Timestamp,
        initial_capital -> Double,
        final_capital -> Double,
        total_profit -> Double,
        total_trades -> Integer,
        winning_trades -> Integer,
        losing_trades -> Integer,
        win_rate -> Double,
        accuracy -> Nullable<Double>,
        max_drawdown -> Double,
        sharpe_ratio -> Nullable<Double>,
        sortino_ratio -> Nullable<Double>,
        parameters_used -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    technical_indicators (id) {
        id -> Integer,
        price_data_id -> Integer,
        asset_id -> Integer,
        timestamp -> Timestamp,
        indicator_name -> Text,
        value -> Nullable<Double>,
        parameters -> Nullable<Text>,
    }
}

diesel::table! {
    target_labels (id) {
        id -> Integer,
        asset_id -> Integer,
        timestamp -> Timestamp,
        label -> Text,
        created_at -> Timestamp,
    }
}

diesel::joinable!(strategies -> users (user_id));
diesel::joinable!(price_data -> assets (asset_id));
diesel::joinable!(signals -> assets (asset_id));
diesel::joinable!(signals -> strategies (strategy_id));
diesel::joinable!(orders -> users (user_id));
diesel::joinable!(orders -> assets (asset_id));
diesel::joinable!(orders -> strategies (strategy_id));
diesel::joinable!(orders -> signals (signal_id));
diesel::joinable!(backtest_results -> strategies (strategy_id));
diesel::joinable!(technical_indicators -> price_data (price_data_id));
diesel::joinable!(technical_indicators -> assets (asset_id));
diesel::joinable!(target_labels -> assets (asset_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    assets,
    strategies,
    price_data,
    signals,
    orders,
    backtest_results,
    technical_indicators,
    target_labels,
);
