//! System chat messages for order events

use shared::models::Order;
use shared::order::OrderStatus;

pub fn created(order: &Order) -> String {
    format!(
        "Order #{} has been created. Please fill in your order details to start processing.",
        order.id
    )
}

pub fn status_changed(order: &Order) -> String {
    let id = order.id;
    match order.status {
        OrderStatus::Pending => format!("Order #{id} is pending."),
        OrderStatus::Process => format!("Order #{id} is being processed."),
        OrderStatus::Completed => format!("Order #{id} is completed. Thank you for your purchase!"),
        OrderStatus::Canceled => {
            format!("Order #{id} was canceled. The payment has been refunded to your wallet.")
        }
        OrderStatus::Invalid => format!(
            "Order #{id} needs attention: the details you provided are invalid. Please check and resubmit them."
        ),
    }
}

pub fn review_prompt(order: &Order) -> String {
    format!("How was order #{}? Leave a review and help other buyers.", order.id)
}
