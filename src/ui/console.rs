use crate::fetch::StockSnapshot;
use crate::ui::styles::trend_arrow;
use crate::ui::SnapshotView;
use crate::utils::{
    format_compact_decimal, format_currency, format_percentage, format_signed, format_trade_time,
};

/// Plain-text snapshot block for non-interactive output.
pub struct ConsolePrinter<'a> {
    pub currency_symbol: &'a str,
}

impl SnapshotView for ConsolePrinter<'_> {
    type Output = String;

    fn render(&self, snapshot: &StockSnapshot) -> String {
        let arrow = trend_arrow(snapshot.is_down());
        let marketcap = snapshot
            .marketcap()
            .map(format_compact_decimal)
            .unwrap_or_else(|| "n/a".to_string());
        let price = |value| format_currency(value, self.currency_symbol);

        format!(
            "{ticker}  {arrow} {pct}\n  last     {last}  (prev {prev}, change {change})\n  session  O {open}  H {high}  L {low}  C {close}\n  traded   {time}\n  mkt cap  {marketcap}",
            ticker = snapshot.ticker(),
            pct = format_percentage(snapshot.change_pct()),
            last = price(snapshot.last_price()),
            prev = price(snapshot.previous_day_price()),
            change = format_signed(snapshot.change()),
            open = price(snapshot.open()),
            high = price(snapshot.high()),
            low = price(snapshot.low()),
            close = price(snapshot.close()),
            time = format_trade_time(snapshot.last_trade_time()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::normalize;
    use crate::fetch::snapshots::tests::aapl_quote;

    #[test]
    fn prints_prices_and_derived_fields() {
        let snapshot = normalize(aapl_quote()).unwrap();
        let text = ConsolePrinter { currency_symbol: "$" }.render(&snapshot);

        assert!(text.starts_with("AAPL  ▲ 1.00 %"), "{text}");
        assert!(text.contains("last     $ 151.50  (prev $ 150.00, change +1.50)"), "{text}");
        assert!(text.contains("O $ 150.00  H $ 152.00  L $ 149.00  C $ 151.00"), "{text}");
        assert!(text.contains("mkt cap  151.50M"), "{text}");
    }
}
