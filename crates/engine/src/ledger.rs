//! The balance-mutation algebra.
//!
//! Pure functions only: everything here computes *what* should happen to
//! balances, while `ops` decides *where* it is written. Keeping the algebra
//! free of I/O is what makes the edit rules exhaustively testable.

use uuid::Uuid;

use crate::TransactionKind;

/// Signed balance effect of a single-account transaction: a deposit raises
/// the balance, a withdrawal lowers it. `Transfer` is handled by the
/// transfer planner, never by this function.
pub(crate) fn signed_effect(kind: TransactionKind, amount_minor: i64) -> i64 {
    match kind {
        TransactionKind::Withdrawal => -amount_minor,
        TransactionKind::Deposit | TransactionKind::Transfer => amount_minor,
    }
}

/// Balance after editing a transaction attached to the same account.
///
/// Reverses the old effect, then applies the new one. The four edit cases
/// (type and/or amount changed) are all instances of this identity; the
/// branch-by-branch closed forms are pinned in the tests below.
pub(crate) fn edited_balance(
    balance_minor: i64,
    old: (TransactionKind, i64),
    new: (TransactionKind, i64),
) -> i64 {
    balance_minor - signed_effect(old.0, old.1) + signed_effect(new.0, new.1)
}

/// The two legs of a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TransferLegs {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub from_amount_minor: i64,
    pub to_amount_minor: i64,
}

/// Per-account balance deltas for creating a transfer.
pub(crate) fn plan_transfer_create(legs: &TransferLegs) -> Vec<(Uuid, i64)> {
    vec![
        (legs.from_account_id, -legs.from_amount_minor),
        (legs.to_account_id, legs.to_amount_minor),
    ]
}

/// Per-account balance deltas for deleting a transfer (the mirror of
/// creation).
pub(crate) fn plan_transfer_delete(legs: &TransferLegs) -> Vec<(Uuid, i64)> {
    vec![
        (legs.from_account_id, legs.from_amount_minor),
        (legs.to_account_id, -legs.to_amount_minor),
    ]
}

/// Per-account balance deltas for editing a transfer.
///
/// Sender, receiver and the two amounts may each change independently. The
/// plan rolls back the old effect and applies the new one, folded per
/// physical account: an account that stays involved gets one net delta, a
/// displaced account gets its rollback, a newly involved account gets its
/// application, and edits that net to zero on an account skip it entirely.
/// Each account therefore appears at most once in the returned plan.
pub(crate) fn plan_transfer_edit(old: &TransferLegs, new: &TransferLegs) -> Vec<(Uuid, i64)> {
    let mut plan: Vec<(Uuid, i64)> = Vec::with_capacity(4);

    let mut push = |account_id: Uuid, delta_minor: i64| {
        match plan.iter_mut().find(|(id, _)| *id == account_id) {
            Some((_, delta)) => *delta += delta_minor,
            None => plan.push((account_id, delta_minor)),
        }
    };

    // Roll back the old effect, then apply the new one.
    push(old.from_account_id, old.from_amount_minor);
    push(old.to_account_id, -old.to_amount_minor);
    push(new.from_account_id, -new.from_amount_minor);
    push(new.to_account_id, new.to_amount_minor);

    plan.retain(|(_, delta)| *delta != 0);
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPOSIT: TransactionKind = TransactionKind::Deposit;
    const WITHDRAWAL: TransactionKind = TransactionKind::Withdrawal;

    fn legs(from: Uuid, to: Uuid, from_amount: i64, to_amount: i64) -> TransferLegs {
        TransferLegs {
            from_account_id: from,
            to_account_id: to,
            from_amount_minor: from_amount,
            to_amount_minor: to_amount,
        }
    }

    #[test]
    fn edit_amount_only() {
        // Deposit: balance - old + new.
        assert_eq!(edited_balance(120, (DEPOSIT, 20), (DEPOSIT, 30)), 130);
        // Withdrawal: balance + old - new.
        assert_eq!(edited_balance(120, (WITHDRAWAL, 20), (WITHDRAWAL, 30)), 110);
    }

    #[test]
    fn edit_kind_only() {
        // Was deposit: balance - amount * 2.
        assert_eq!(edited_balance(120, (DEPOSIT, 20), (WITHDRAWAL, 20)), 80);
        // Was withdrawal: balance + amount * 2.
        assert_eq!(edited_balance(120, (WITHDRAWAL, 20), (DEPOSIT, 20)), 160);
    }

    #[test]
    fn edit_kind_and_amount() {
        // Was deposit: balance - old - new.
        assert_eq!(edited_balance(200, (DEPOSIT, 50), (WITHDRAWAL, 30)), 120);
        // Was withdrawal: balance + old + new.
        assert_eq!(edited_balance(200, (WITHDRAWAL, 50), (DEPOSIT, 30)), 280);
    }

    #[test]
    fn edit_identity_round_trips() {
        for kind in [DEPOSIT, WITHDRAWAL] {
            assert_eq!(edited_balance(77, (kind, 13), (kind, 13)), 77);
        }
    }

    #[test]
    fn transfer_create_and_delete_mirror() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let legs = legs(a, b, 100, 90);

        assert_eq!(plan_transfer_create(&legs), vec![(a, -100), (b, 90)]);
        assert_eq!(plan_transfer_delete(&legs), vec![(a, 100), (b, -90)]);
    }

    #[test]
    fn edit_nothing_is_a_no_op() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let old = legs(a, b, 100, 90);
        assert!(plan_transfer_edit(&old, &old).is_empty());
    }

    #[test]
    fn edit_amounts_only_nets_per_account() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let old = legs(a, b, 100, 90);
        let new = legs(a, b, 130, 110);

        // Sender: +100 - 130; receiver: -90 + 110.
        assert_eq!(plan_transfer_edit(&old, &new), vec![(a, -30), (b, 20)]);
    }

    #[test]
    fn edit_sender_only_leaves_receiver_untouched() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let old = legs(a, b, 100, 90);
        let new = legs(c, b, 100, 90);

        // Old sender rolled back, new sender debited, receiver absent.
        assert_eq!(plan_transfer_edit(&old, &new), vec![(a, 100), (c, -100)]);
    }

    #[test]
    fn edit_receiver_only_leaves_sender_untouched() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let old = legs(a, b, 100, 90);
        let new = legs(a, c, 100, 90);

        assert_eq!(plan_transfer_edit(&old, &new), vec![(b, -90), (c, 90)]);
    }

    #[test]
    fn edit_sender_and_amount_nets_receiver() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let old = legs(a, b, 100, 90);
        let new = legs(c, b, 150, 120);

        assert_eq!(
            plan_transfer_edit(&old, &new),
            vec![(a, 100), (b, 30), (c, -150)]
        );
    }

    #[test]
    fn edit_both_accounts_touches_all_four() {
        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let old = legs(a, b, 100, 90);
        let new = legs(c, d, 150, 120);

        assert_eq!(
            plan_transfer_edit(&old, &new),
            vec![(a, 100), (b, -90), (c, -150), (d, 120)]
        );
    }

    #[test]
    fn edit_swapping_direction_folds_to_nets() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let old = legs(a, b, 100, 100);
        let new = legs(b, a, 100, 100);

        // a: +100 (rollback) +100 (now receiving); b: -100 -100.
        assert_eq!(plan_transfer_edit(&old, &new), vec![(a, 200), (b, -200)]);
    }
}
