use pass_catalog::Booking;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::BookingFinanceIncident;
use crate::{FinanceError, FinanceResult};

/// A gesture may not pay more than 120% of a booking's price per booking.
pub fn check_commercial_gesture_total_amount(amount: i64, bookings: &[Booking]) -> FinanceResult<()> {
    if bookings.is_empty() {
        return Err(FinanceError::InvalidCommercialGesture("no booking selected".to_string()));
    }
    if amount <= 0 {
        return Err(FinanceError::InvalidCommercialGesture("amount must be positive".to_string()));
    }
    let share = Decimal::from(amount) / Decimal::from(bookings.len());
    let ceiling = Decimal::new(120, 2);
    for booking in bookings {
        if share > ceiling * Decimal::from(booking.total_amount_cents()) {
            return Err(FinanceError::InvalidCommercialGesture(format!(
                "{} cents exceeds 120% of booking {}",
                share.round_dp(2),
                booking.id
            )));
        }
    }
    Ok(())
}

/// Split a gesture of `amount` eurocents over bookings of the same stock,
/// pro rata of their quantity.
pub fn create_commercial_gesture(amount: i64, bookings: &[Booking]) -> FinanceResult<Vec<BookingFinanceIncident>> {
    check_commercial_gesture_total_amount(amount, bookings)?;
    let total_quantity: i64 = bookings.iter().map(|booking| i64::from(booking.quantity)).sum();
    if total_quantity == 0 {
        return Err(FinanceError::InvalidCommercialGesture("bookings have no quantity".to_string()));
    }
    let total_amount: i64 = bookings.iter().map(Booking::total_amount_cents).sum();

    Ok(bookings
        .iter()
        .map(|booking| {
            let share = amount * i64::from(booking.quantity) / total_quantity;
            BookingFinanceIncident {
                id: Uuid::new_v4(),
                booking_id: booking.id,
                new_total_amount: total_amount - share,
                commercial_gesture_amount: Some(share),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pass_catalog::Subcategory;

    fn booking(euros: i64, quantity: u32) -> Booking {
        Booking::new(Decimal::new(euros, 0), quantity, Subcategory::from_id("SPECTACLE_REPRESENTATION").unwrap())
    }

    #[test]
    fn test_gesture_ceiling() {
        let bookings = vec![booking(10, 1), booking(10, 1)];
        assert!(check_commercial_gesture_total_amount(2400, &bookings).is_ok());
        assert!(matches!(
            check_commercial_gesture_total_amount(2402, &bookings),
            Err(FinanceError::InvalidCommercialGesture(_))
        ));
        assert!(check_commercial_gesture_total_amount(0, &bookings).is_err());
        assert!(check_commercial_gesture_total_amount(100, &[]).is_err());
        assert!(check_commercial_gesture_total_amount(1300, &[booking(10, 1)]).is_err());
    }

    #[test]
    fn test_gesture_split() {
        let bookings = vec![booking(10, 1), booking(10, 2)];
        let incidents = create_commercial_gesture(900, &bookings).unwrap();
        assert_eq!(incidents.len(), 2);
        assert_eq!(incidents[0].commercial_gesture_amount, Some(300));
        assert_eq!(incidents[1].commercial_gesture_amount, Some(600));
        assert_eq!(incidents[0].new_total_amount, 3000 - 300);
        assert_eq!(incidents[1].booking_id, bookings[1].id);
    }
}
