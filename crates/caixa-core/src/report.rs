use rust_decimal::Decimal;

use crate::models::{AllocationTotals, FinancialRecord, InflowKind};

/// Allocation totals for the dashboard, derived from the raw collections.
///
/// Fixed policy: a tithe-offering inflow splits 60/40 between the central
/// and local funds, communion feeds the missions fund, construction feeds
/// the construction fund, and every outflow is paid out of the local fund.
/// Inflows with an unrecognized kind join no bucket. Totals may go negative
/// and are reported as such.
pub fn compute_totals(
    inflows: &[FinancialRecord],
    outflows: &[FinancialRecord],
) -> AllocationTotals {
    let central_share = Decimal::new(6, 1);
    let local_share = Decimal::new(4, 1);

    let mut totals = AllocationTotals::default();
    for inflow in inflows {
        match InflowKind::parse(&inflow.kind) {
            Some(InflowKind::TitheOffering) => {
                totals.central_fund += inflow.amount * central_share;
                totals.local_fund += inflow.amount * local_share;
            }
            Some(InflowKind::Communion) => totals.missions_fund += inflow.amount,
            Some(InflowKind::Construction) => totals.construction_fund += inflow.amount,
            None => {
                tracing::warn!(
                    "Inflow {} has unclassified kind '{}', excluded from totals",
                    inflow.id,
                    inflow.kind
                );
            }
        }
    }

    for outflow in outflows {
        totals.local_fund -= outflow.amount;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn record(kind: &str, amount: Decimal) -> FinancialRecord {
        FinancialRecord::new(
            kind,
            amount,
            "aggregation sample",
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            "tester",
        )
    }

    #[test]
    fn splits_and_sums_per_allocation_policy() {
        let inflows = vec![
            record("tithe-offering", dec!(100)),
            record("communion", dec!(50)),
            record("construction", dec!(30)),
        ];
        let outflows = vec![record("electricity", dec!(20))];

        let totals = compute_totals(&inflows, &outflows);
        assert_eq!(totals.central_fund, dec!(60.0));
        assert_eq!(totals.local_fund, dec!(20.0));
        assert_eq!(totals.missions_fund, dec!(50));
        assert_eq!(totals.construction_fund, dec!(30));
    }

    #[test]
    fn unknown_inflow_kinds_join_no_bucket() {
        let inflows = vec![
            record("bake-sale", dec!(999)),
            record("communion", dec!(10)),
        ];

        let totals = compute_totals(&inflows, &[]);
        assert_eq!(totals.central_fund, Decimal::ZERO);
        assert_eq!(totals.local_fund, Decimal::ZERO);
        assert_eq!(totals.missions_fund, dec!(10));
        assert_eq!(totals.construction_fund, Decimal::ZERO);
    }

    #[test]
    fn local_fund_may_go_negative() {
        let outflows = vec![record("rent", dec!(120))];

        let totals = compute_totals(&[], &outflows);
        assert_eq!(totals.local_fund, dec!(-120));
    }

    #[test]
    fn empty_collections_yield_zeroed_totals() {
        assert_eq!(compute_totals(&[], &[]), AllocationTotals::default());
    }

    #[test]
    fn outflow_category_never_matters() {
        let outflows = vec![
            record("tithe-offering", dec!(5)),
            record("anything else", dec!(5)),
        ];

        let totals = compute_totals(&[], &outflows);
        assert_eq!(totals.local_fund, dec!(-10));
        assert_eq!(totals.central_fund, Decimal::ZERO);
    }
}
