use ledger_core::{Amount, PublicKey};
use std::collections::BTreeMap;

/// One leg of a minimal settlement: `from` pays `to` exactly `amount`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub from: PublicKey,
    pub to: PublicKey,
    pub amount: Amount,
}

/// Derive a minimal set of transfers that zeroes out every balance: sort
/// debtors and creditors by magnitude, then repeatedly match the largest
/// debtor against the largest creditor. Produces at most
/// `(non-zero member count) - 1` transfers.
pub fn minimal_settlement(balances: &BTreeMap<PublicKey, Amount>) -> Vec<Transfer> {
    let mut debtors: Vec<(PublicKey, Amount)> = balances
        .iter()
        .filter(|(_, &amount)| amount < 0)
        .map(|(k, &amount)| (*k, -amount))
        .collect();
    let mut creditors: Vec<(PublicKey, Amount)> = balances
        .iter()
        .filter(|(_, &amount)| amount > 0)
        .map(|(k, &amount)| (*k, amount))
        .collect();

    debtors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    creditors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut transfers = Vec::new();
    let (mut di, mut ci) = (0usize, 0usize);

    while di < debtors.len() && ci < creditors.len() {
        let (debtor, debt) = debtors[di];
        let (creditor, credit) = creditors[ci];
        let amount = debt.min(credit);

        if amount > 0 {
            transfers.push(Transfer {
                from: debtor,
                to: creditor,
                amount,
            });
        }

        debtors[di].1 -= amount;
        creditors[ci].1 -= amount;

        if debtors[di].1 == 0 {
            di += 1;
        }
        if creditors[ci].1 == 0 {
            ci += 1;
        }
    }

    transfers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(b: u8) -> PublicKey {
        PublicKey::from_bytes([b; 32])
    }

    #[test]
    fn spec_s1_minimal_settlement() {
        let mut balances = BTreeMap::new();
        balances.insert(key(1), -1000); // alice
        balances.insert(key(2), 1000); // bob

        let transfers = minimal_settlement(&balances);
        assert_eq!(
            transfers,
            vec![Transfer {
                from: key(1),
                to: key(2),
                amount: 1000
            }]
        );
    }

    #[test]
    fn settlement_count_bounded_by_nonzero_members_minus_one() {
        let mut balances = BTreeMap::new();
        balances.insert(key(1), -500);
        balances.insert(key(2), -500);
        balances.insert(key(3), 1000);

        let transfers = minimal_settlement(&balances);
        assert_eq!(transfers.len(), 2);
        assert_eq!(
            transfers.iter().map(|t| t.amount).sum::<i64>(),
            1000
        );
    }

    #[test]
    fn zero_balances_produce_no_transfers() {
        let mut balances = BTreeMap::new();
        balances.insert(key(1), 0);
        balances.insert(key(2), 0);
        assert!(minimal_settlement(&balances).is_empty());
    }
}
