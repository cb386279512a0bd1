//! End-to-end lifecycle tests over the in-memory order workflow

use chrono::{Duration, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use marketplace_orders::order::inventory::{self, Reservation, VariantStock};
use marketplace_orders::order::{
    CreateOrderRequest, DeliverySecret, Order, OrderError, OrderItemRequest, OrderStatus,
    PaymentMethod, ShippingDetails, WorkflowSettings,
};

struct Fixture {
    customer: Uuid,
    shop: Uuid,
    product: Uuid,
}

impl Fixture {
    fn new() -> Self {
        Self {
            customer: Uuid::new_v4(),
            shop: Uuid::new_v4(),
            product: Uuid::new_v4(),
        }
    }

    fn catalog(&self) -> HashMap<Uuid, Uuid> {
        HashMap::from([(self.product, self.shop)])
    }

    fn checkout(&self, payment_method: PaymentMethod, paid: bool) -> CreateOrderRequest {
        CreateOrderRequest {
            items: vec![OrderItemRequest {
                product_id: self.product,
                name: Some("Linen shirt".to_string()),
                quantity: 2,
                price: 500.0,
                selected_size: Some("M".to_string()),
                selected_color: Some("Red".to_string()),
            }],
            shipping_details: Some(ShippingDetails {
                full_name: "Asha Rao".to_string(),
                phone: "9876543210".to_string(),
                address: "12 MG Road".to_string(),
                city: "Pune".to_string(),
                state: Some("MH".to_string()),
                postal_code: "411001".to_string(),
            }),
            payment_method,
            paid,
            order_notes: None,
            subtotal: 1000.0,
            delivery_fee: 50.0,
            total: 1050.0,
        }
    }

    fn place(&self, payment_method: PaymentMethod, paid: bool) -> Order {
        Order::place(
            self.customer,
            self.checkout(payment_method, paid),
            &self.catalog(),
            DeliverySecret::generate(),
            &WorkflowSettings::default(),
            Utc::now(),
        )
        .unwrap()
    }
}

#[test]
fn test_cod_checkout_scenario() {
    let fx = Fixture::new();
    let now = Utc::now();
    let order = Order::place(
        fx.customer,
        fx.checkout(PaymentMethod::Cod, false),
        &fx.catalog(),
        DeliverySecret::generate(),
        &WorkflowSettings::default(),
        now,
    )
    .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.delivery_otp.len(), 6);
    assert!(order.delivery_otp.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(order.otp_expires_at, now + Duration::hours(24));
    assert_eq!(order.estimated_delivery, now + Duration::days(3));
    assert_eq!(order.items[0].shop_id, fx.shop);

    let mut variants = vec![
        VariantStock {
            size: "M".to_string(),
            color: "Red".to_string(),
            quantity: 5,
        },
        VariantStock {
            size: "L".to_string(),
            color: "Red".to_string(),
            quantity: 5,
        },
    ];
    let outcome = inventory::reserve(Some(&mut variants), &order.items[0]);

    assert_eq!(
        outcome,
        Reservation::Decremented {
            previous: 5,
            remaining: 3
        }
    );
    assert_eq!(variants[1].quantity, 5);
}

#[test]
fn test_reservation_floors_at_zero() {
    let fx = Fixture::new();
    let order = fx.place(PaymentMethod::Cod, false);
    let mut variants = vec![VariantStock {
        size: "M".to_string(),
        color: "Red".to_string(),
        quantity: 1,
    }];

    inventory::reserve(Some(&mut variants), &order.items[0]);

    assert_eq!(variants[0].quantity, 0);
}

#[test]
fn test_paid_online_order_starts_confirmed() {
    let fx = Fixture::new();
    assert_eq!(fx.place(PaymentMethod::Online, true).status, OrderStatus::Confirmed);
    assert_eq!(fx.place(PaymentMethod::Online, false).status, OrderStatus::Pending);
    assert_eq!(fx.place(PaymentMethod::Cod, true).status, OrderStatus::Pending);
}

#[test]
fn test_full_agent_delivery_lifecycle() {
    let fx = Fixture::new();
    let agent = Uuid::new_v4();
    let mut order = fx.place(PaymentMethod::Cod, false);
    let estimate = order.estimated_delivery;
    let now = Utc::now();

    order.confirm_by_shop(fx.shop, now).unwrap();
    order.notify_delivery(fx.shop, now).unwrap();
    order.assign(agent, now).unwrap();
    assert_eq!(order.status, OrderStatus::OutForDelivery);
    assert_eq!(order.assigned_to, Some(agent));

    let err = order.assign(Uuid::new_v4(), now).unwrap_err();
    assert!(matches!(err, OrderError::Conflict(_)));

    let otp = order.delivery_otp.clone();
    order.confirm_delivery(agent, &otp, now).unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    assert!(order.delivered_at.is_some());

    order.settle_shop(now).unwrap();
    order.settle_admin(now).unwrap();
    assert!(matches!(order.settle_shop(now), Err(OrderError::Conflict(_))));
    assert!(order.settlement.paid_to_shop && order.settlement.paid_to_admin);

    assert_eq!(order.estimated_delivery, estimate);
}

#[test]
fn test_qr_token_confirms_delivery() {
    let fx = Fixture::new();
    let agent = Uuid::new_v4();
    let mut order = fx.place(PaymentMethod::Cod, false);
    let now = Utc::now();
    order.assign(agent, now).unwrap();

    let token = format!("  {}  ", order.qr_token);
    order.confirm_delivery(agent, &token, now).unwrap();

    assert_eq!(order.status, OrderStatus::Delivered);
}

#[test]
fn test_wrong_or_late_code_is_rejected() {
    let fx = Fixture::new();
    let agent = Uuid::new_v4();
    let mut order = fx.place(PaymentMethod::Cod, false);
    let now = Utc::now();
    order.assign(agent, now).unwrap();

    let wrong = if order.delivery_otp == "000000" { "111111" } else { "000000" };
    assert!(matches!(
        order.confirm_delivery(agent, wrong, now),
        Err(OrderError::Validation(_))
    ));

    let otp = order.delivery_otp.clone();
    let late = order.otp_expires_at + Duration::seconds(1);
    assert!(matches!(
        order.confirm_delivery(agent, &otp, late),
        Err(OrderError::Expired(_))
    ));
    assert_eq!(order.status, OrderStatus::OutForDelivery);
}

#[test]
fn test_regenerated_secret_replaces_the_old_one() {
    let fx = Fixture::new();
    let agent = Uuid::new_v4();
    let mut order = fx.place(PaymentMethod::Cod, false);
    let placed_at = Utc::now();
    order.assign(agent, placed_at).unwrap();

    let old_otp = order.delivery_otp.clone();
    let later = order.otp_expires_at + Duration::hours(1);
    let fresh = DeliverySecret {
        otp: "424242".to_string(),
        qr_token: "ab".repeat(16),
    };
    order
        .regenerate_secret(fx.customer, fresh, Duration::hours(24), later)
        .unwrap();

    if old_otp != "424242" {
        assert!(matches!(
            order.confirm_delivery(agent, &old_otp, later),
            Err(OrderError::Validation(_))
        ));
    }
    order.confirm_delivery(agent, "424242", later).unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
}

#[test]
fn test_cancellation_windows() {
    let fx = Fixture::new();
    let now = Utc::now();

    let mut pending = fx.place(PaymentMethod::Cod, false);
    pending.cancel_by_customer(fx.customer, now).unwrap();
    assert_eq!(pending.status, OrderStatus::Cancelled);
    assert_eq!(pending.cancelled_by.as_deref(), Some("customer"));
    assert!(matches!(
        pending.cancel_by_admin(now),
        Err(OrderError::Conflict(_))
    ));

    let mut shipped = fx.place(PaymentMethod::Cod, false);
    shipped.confirm_by_shop(fx.shop, now).unwrap();
    shipped.notify_delivery(fx.shop, now).unwrap();
    shipped
        .advance_by_shop(fx.shop, OrderStatus::Processing, now)
        .unwrap();
    shipped
        .advance_by_shop(fx.shop, OrderStatus::Shipped, now)
        .unwrap();
    assert!(matches!(
        shipped.cancel_by_customer(fx.customer, now),
        Err(OrderError::Conflict(_))
    ));

    shipped.cancel_by_admin(now).unwrap();
    assert_eq!(shipped.cancelled_by.as_deref(), Some("admin"));
}

#[test]
fn test_shop_self_delivery() {
    let fx = Fixture::new();
    let now = Utc::now();
    let mut order = fx.place(PaymentMethod::Online, true);

    for status in [
        OrderStatus::NotifyDelivery,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::OutForDelivery,
    ] {
        order.advance_by_shop(fx.shop, status, now).unwrap();
    }
    assert!(order.assigned_to.is_none());

    let stranger = Uuid::new_v4();
    assert!(matches!(
        order.deliver_by_shop(stranger, now),
        Err(OrderError::Forbidden(_))
    ));

    order
        .advance_by_shop(fx.shop, OrderStatus::Delivered, now)
        .unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    assert!(order.delivered_at.is_some());
}
