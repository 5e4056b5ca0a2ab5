text_enum! {
    /// Direction of a strategy signal, also used for target labels.
    SignalType {
        Buy => "BUY",
        Sell => "SELL",
        Hold => "HOLD",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_names() {
        assert_eq!("BUY".parse::<SignalType>().unwrap(), SignalType::Buy);
        assert_eq!("HOLD".parse::<SignalType>().unwrap(), SignalType::Hold);
    }

    #[test]
    fn rejects_lowercase_names() {
        let err = "buy".parse::<SignalType>().unwrap_err();
        assert_eq!(err.kind, "SignalType");
        assert_eq!(err.value, "buy");
    }

    #[test]
    fn display_matches_stored_name() {
        for kind in SignalType::ALL {
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }
}
