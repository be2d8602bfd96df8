//! Pure payment-schedule generator. Given a lease's shape,
//! deterministically produces the ordered sequence of payments it
//! implies: six rent payments, one per month of the term, followed by
//! `paintingFeeInstallments` painting-fee payments over the first N
//! months. Same inputs yield the same schedule modulo new UUIDs and
//! timestamps.

use crate::decimal::Money;
use crate::domain::calendar::{due_date_for, first_of_month_offset};
use crate::domain::lease::{Lease, LEASE_TERM_MONTHS};
use crate::domain::payment::{Payment, PaymentType};

/// Generates the full payment batch for a newly created (or renewed)
/// lease. Ordering: all rent payments by ascending reference month,
/// followed by all painting-fee payments by ascending reference month.
pub fn generate(lease: &Lease) -> Vec<Payment> {
    let mut payments = Vec::with_capacity(LEASE_TERM_MONTHS as usize + lease.painting_fee_installments as usize);

    for month_offset in 0..LEASE_TERM_MONTHS {
        let reference_month = first_of_month_offset(lease.start_date, month_offset);
        let due_date = due_date_for(reference_month, lease.payment_due_day);
        payments.push(Payment::new(
            lease.id,
            PaymentType::Rent,
            reference_month,
            lease.monthly_rent,
            due_date,
        ));
    }

    if !lease.painting_fee_total.is_zero() {
        let installments = lease.painting_fee_total.split_even(lease.painting_fee_installments);
        for (month_offset, amount) in installments.into_iter().enumerate() {
            let reference_month = first_of_month_offset(lease.start_date, month_offset as u32);
            let due_date = due_date_for(reference_month, lease.payment_due_day);
            payments.push(Payment::new(
                lease.id,
                PaymentType::PaintingFee,
                reference_month,
                amount,
                due_date,
            ));
        }
    }

    payments
}

pub fn rent_payment_count(payments: &[Payment]) -> usize {
    payments.iter().filter(|p| matches!(p.payment_type, PaymentType::Rent)).count()
}

pub fn painting_fee_payment_count(payments: &[Payment]) -> usize {
    payments
        .iter()
        .filter(|p| matches!(p.payment_type, PaymentType::PaintingFee))
        .count()
}

pub fn sum_amounts(payments: &[Payment]) -> Money {
    payments.iter().fold(Money::ZERO, |acc, p| acc + p.amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lease::NewLeaseParams;
    use chrono::{Datelike, NaiveDate};
    use uuid::Uuid;

    fn lease_with(start: NaiveDate, due_day: u32, rent: &str, fee_total: &str, installments: u32) -> Lease {
        Lease::new(NewLeaseParams {
            unit_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            signed_date: start,
            start_date: start,
            payment_due_day: due_day,
            monthly_rent: rent.parse().unwrap(),
            painting_fee_total: fee_total.parse().unwrap(),
            painting_fee_installments: installments,
            parent_lease_id: None,
            generation: 1,
        })
        .unwrap()
    }

    #[test]
    fn schedule_totality_and_sum() {
        let lease = lease_with(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(), 5, "1000.00", "250.00", 2);
        let payments = generate(&lease);
        assert_eq!(rent_payment_count(&payments), 6);
        assert_eq!(painting_fee_payment_count(&payments), 2);

        let rent_total: Money = payments
            .iter()
            .filter(|p| matches!(p.payment_type, PaymentType::Rent))
            .fold(Money::ZERO, |acc, p| acc + p.amount);
        assert_eq!(rent_total, "6000.00".parse().unwrap());

        let fee_total: Money = payments
            .iter()
            .filter(|p| matches!(p.payment_type, PaymentType::PaintingFee))
            .fold(Money::ZERO, |acc, p| acc + p.amount);
        assert_eq!(fee_total, lease.painting_fee_total);
    }

    #[test]
    fn zero_painting_fee_total_yields_no_installments() {
        let lease = lease_with(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(), 5, "1000.00", "0.00", 2);
        let payments = generate(&lease);
        assert_eq!(painting_fee_payment_count(&payments), 0);
    }

    #[test]
    fn scenario_1_create_lease_happy_path() {
        let lease = lease_with(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(), 5, "1000.00", "250.00", 2);
        assert_eq!(lease.end_date, NaiveDate::from_ymd_opt(2025, 8, 1).unwrap());
        let payments = generate(&lease);

        let rent_dues: Vec<NaiveDate> = payments
            .iter()
            .filter(|p| matches!(p.payment_type, PaymentType::Rent))
            .map(|p| p.due_date)
            .collect();
        let expected_rent_dues = vec![
            NaiveDate::from_ymd_opt(2025, 2, 5).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 5).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 5).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 5).unwrap(),
        ];
        assert_eq!(rent_dues, expected_rent_dues);
        assert!(payments.iter().all(|p| {
            if matches!(p.payment_type, PaymentType::Rent) {
                p.amount == "1000.00".parse().unwrap()
            } else {
                true
            }
        }));

        let fee_dues: Vec<NaiveDate> = payments
            .iter()
            .filter(|p| matches!(p.payment_type, PaymentType::PaintingFee))
            .map(|p| p.due_date)
            .collect();
        assert_eq!(
            fee_dues,
            vec![
                NaiveDate::from_ymd_opt(2025, 2, 5).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
            ]
        );
        assert!(payments
            .iter()
            .filter(|p| matches!(p.payment_type, PaymentType::PaintingFee))
            .all(|p| p.amount == "125.00".parse().unwrap()));
    }

    #[test]
    fn scenario_2_due_day_clamp() {
        let lease = lease_with(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(), 31, "1000.00", "250.00", 2);
        let payments = generate(&lease);
        let rent_dues: Vec<NaiveDate> = payments
            .iter()
            .filter(|p| matches!(p.payment_type, PaymentType::Rent))
            .map(|p| p.due_date)
            .collect();
        assert_eq!(
            rent_dues,
            vec![
                NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
                NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
                NaiveDate::from_ymd_opt(2025, 4, 30).unwrap(),
                NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
                NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            ]
        );
    }

    #[test]
    fn due_day_clamp_property_holds_for_every_payment() {
        let lease = lease_with(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(), 31, "1000.00", "250.00", 3);
        for payment in generate(&lease) {
            let days_in_month = crate::domain::calendar::days_in_month(
                payment.reference_month.year(),
                payment.reference_month.month(),
            );
            assert_eq!(payment.due_date.day(), 31.min(days_in_month));
        }
    }

    #[test]
    fn schedule_is_stable_ordering_rent_then_painting_fee_by_month() {
        let lease = lease_with(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(), 5, "1000.00", "250.00", 2);
        let payments = generate(&lease);
        let types: Vec<PaymentType> = payments.iter().map(|p| p.payment_type).collect();
        assert_eq!(
            types,
            vec![
                PaymentType::Rent,
                PaymentType::Rent,
                PaymentType::Rent,
                PaymentType::Rent,
                PaymentType::Rent,
                PaymentType::Rent,
                PaymentType::PaintingFee,
                PaymentType::PaintingFee,
            ]
        );
    }
}
