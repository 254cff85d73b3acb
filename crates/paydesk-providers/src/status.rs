//! Provider status vocabularies mapped onto the invoice lifecycle.

use paydesk_core::models::{InvoiceStatus, Provider};

/// Map a raw provider status (or event type) to an invoice status.
///
/// Matching is case-insensitive. `None` means the status carries no
/// lifecycle meaning and the invoice must be left untouched.
pub fn map_status(provider: Provider, raw: &str) -> Option<InvoiceStatus> {
    let raw = raw.trim().to_ascii_lowercase();
    let table: &[(&str, InvoiceStatus)] = match provider {
        Provider::Stripe => STRIPE,
        Provider::Mollie => MOLLIE,
        Provider::Rabobank => RABOBANK,
        Provider::Tikkie => TIKKIE,
        Provider::Paypal => PAYPAL,
    };
    table
        .iter()
        .find(|(name, _)| *name == raw)
        .map(|(_, status)| *status)
}

// Stripe and PayPal report event types rather than payment statuses. The
// Stripe adapter only forwards `checkout.session.completed` once the session
// is paid.
const STRIPE: &[(&str, InvoiceStatus)] = &[
    ("checkout.session.completed", InvoiceStatus::Paid),
    ("checkout.session.awaiting_payment", InvoiceStatus::Pending),
    ("checkout.session.async_payment_succeeded", InvoiceStatus::Paid),
    ("payment_intent.succeeded", InvoiceStatus::Paid),
    ("checkout.session.expired", InvoiceStatus::Cancelled),
    ("payment_intent.canceled", InvoiceStatus::Cancelled),
    ("checkout.session.async_payment_failed", InvoiceStatus::Sent),
];

const MOLLIE: &[(&str, InvoiceStatus)] = &[
    ("paid", InvoiceStatus::Paid),
    ("canceled", InvoiceStatus::Cancelled),
    ("expired", InvoiceStatus::Cancelled),
    ("failed", InvoiceStatus::Cancelled),
    ("open", InvoiceStatus::Sent),
    ("pending", InvoiceStatus::Pending),
    ("authorized", InvoiceStatus::Pending),
];

const RABOBANK: &[(&str, InvoiceStatus)] = &[
    ("accepted", InvoiceStatus::Paid),
    ("completed", InvoiceStatus::Paid),
    ("cancelled", InvoiceStatus::Cancelled),
    ("expired", InvoiceStatus::Cancelled),
    ("rejected", InvoiceStatus::Cancelled),
    ("open", InvoiceStatus::Sent),
    ("pending", InvoiceStatus::Pending),
];

const TIKKIE: &[(&str, InvoiceStatus)] = &[
    ("paid", InvoiceStatus::Paid),
    ("expired", InvoiceStatus::Cancelled),
    ("open", InvoiceStatus::Sent),
];

const PAYPAL: &[(&str, InvoiceStatus)] = &[
    ("payment.capture.completed", InvoiceStatus::Paid),
    ("checkout.order.completed", InvoiceStatus::Paid),
    ("payment.capture.denied", InvoiceStatus::Cancelled),
    ("checkout.order.voided", InvoiceStatus::Cancelled),
    ("checkout.order.approved", InvoiceStatus::Pending),
    ("payment.capture.pending", InvoiceStatus::Pending),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_success_maps_to_paid() {
        let cases = [
            (Provider::Stripe, "checkout.session.completed"),
            (Provider::Mollie, "paid"),
            (Provider::Rabobank, "ACCEPTED"),
            (Provider::Tikkie, "PAID"),
            (Provider::Paypal, "PAYMENT.CAPTURE.COMPLETED"),
        ];
        for (provider, raw) in cases {
            assert_eq!(
                map_status(provider, raw),
                Some(InvoiceStatus::Paid),
                "{} {}",
                provider,
                raw
            );
        }
    }

    #[test]
    fn test_cancellations_and_reopen() {
        assert_eq!(
            map_status(Provider::Mollie, "expired"),
            Some(InvoiceStatus::Cancelled)
        );
        assert_eq!(
            map_status(Provider::Stripe, "checkout.session.async_payment_failed"),
            Some(InvoiceStatus::Sent)
        );
        assert_eq!(map_status(Provider::Tikkie, " Open "), Some(InvoiceStatus::Sent));
        assert_eq!(
            map_status(Provider::Rabobank, "pending"),
            Some(InvoiceStatus::Pending)
        );
        assert_eq!(
            map_status(Provider::Stripe, "checkout.session.awaiting_payment"),
            Some(InvoiceStatus::Pending)
        );
        assert_eq!(
            map_status(Provider::Paypal, "CHECKOUT.ORDER.APPROVED"),
            Some(InvoiceStatus::Pending)
        );
    }

    #[test]
    fn test_unknown_status_is_unmapped() {
        assert_eq!(map_status(Provider::Tikkie, "REFUNDED"), None);
        assert_eq!(map_status(Provider::Stripe, "charge.refunded"), None);
        assert_eq!(map_status(Provider::Mollie, ""), None);
        // vocabularies are per provider
        assert_eq!(map_status(Provider::Stripe, "paid"), None);
    }
}
