//! Rendering of order notifications.

use std::fmt::Write;

use domain::{Order, OrderStatus, Recipient};

use crate::mailer::Email;

/// Subject and plain-text body shared by every recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

impl Message {
    /// Announces a newly placed order with its lines and total.
    pub fn order_placed(order: &Order) -> Self {
        let number = order_label(order);
        let mut body = format!("Se registró la orden {number}.\n\n");
        write_lines(&mut body, order);
        write_details(&mut body, order);

        Self {
            subject: format!("Nueva orden {number}"),
            body,
        }
    }

    /// Announces a status change.
    pub fn status_changed(order: &Order, from: OrderStatus, to: OrderStatus) -> Self {
        let number = order_label(order);
        let mut body = format!("La orden {number} pasó de {from} a {to}.\n\n");
        write_lines(&mut body, order);
        write_details(&mut body, order);

        Self {
            subject: format!("Orden {number}: {to}"),
            body,
        }
    }

    /// Addresses the message to one recipient.
    pub fn to(&self, recipient: &Recipient) -> Email {
        Email {
            to: recipient.email.clone(),
            to_name: Some(recipient.name.clone()).filter(|name| !name.is_empty()),
            subject: self.subject.clone(),
            body: self.body.clone(),
        }
    }
}

fn order_label(order: &Order) -> String {
    order
        .order_number()
        .map(|number| number.to_string())
        .unwrap_or_else(|| order.id().to_string())
}

fn write_lines(body: &mut String, order: &Order) {
    for item in order.items() {
        // Writing into a String cannot fail.
        let _ = writeln!(
            body,
            "- {} {} {} ({}) x {} = {}",
            item.quantity,
            item.unit_of_measure,
            item.product_name,
            item.sku,
            item.unit_price,
            item.subtotal()
        );
    }
    let _ = writeln!(body, "\nTotal: {}", order.total());
}

fn write_details(body: &mut String, order: &Order) {
    if let Some(due) = order.delivery_due() {
        let _ = writeln!(body, "Entrega comprometida: {due}");
    }
    if let Some(location) = order.location() {
        let _ = writeln!(body, "Ubicación: {location}");
    }
    if let Some(notes) = order.notes() {
        let _ = writeln!(body, "Notas: {notes}");
    }
}
