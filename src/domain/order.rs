text_enum! {
    /// How an order is priced.
    OrderType {
        Market => "MARKET",
        Limit => "LIMIT",
        Stop => "STOP",
    }
}

text_enum! {
    /// Side of the book an order takes.
    OrderSide {
        Buy => "BUY",
        Sell => "SELL",
    }
}

text_enum! {
    /// Lifecycle state of an order.
    OrderStatus {
        Pending => "PENDING",
        Open => "OPEN",
        Filled => "FILLED",
        PartiallyFilled => "PARTIALLY_FILLED",
        Cancelled => "CANCELLED",
        Rejected => "REJECTED",
        Expired => "EXPIRED",
    }
}

impl Default for OrderType {
    fn default() -> Self {
        Self::Market
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Pending
    }
}
