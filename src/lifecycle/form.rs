//! Order submission form and its validation.

use chrono::NaiveDate;

use super::derive::clamp_discount;
use crate::error::{Result, StoreError};
use crate::types::{LineItem, OrderType};

/// The three steps of order entry, validated in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormStep {
    /// Deadline and order type.
    OrderInfo,
    /// Customer name, contact and optional email.
    Customer,
    /// Line items.
    Items,
}

impl FormStep {
    pub const ALL: [FormStep; 3] = [FormStep::OrderInfo, FormStep::Customer, FormStep::Items];
}

/// Input for [`OrderEngine::create_order`](super::OrderEngine::create_order).
#[derive(Clone, Debug, Default)]
pub struct OrderForm {
    pub deadline: Option<NaiveDate>,
    pub order_type: Option<OrderType>,
    /// Name of the layout artist creating the order.
    pub layout_artist: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_contact: String,
    pub line_items: Vec<LineItem>,
    pub deposit: f64,
    /// Clamped to `[0, 100]` on write.
    pub discount_percentage: f64,
    /// Defaults to today.
    pub date_of_order: Option<NaiveDate>,
}

impl OrderForm {
    pub fn new(layout_artist: impl Into<String>) -> Self {
        Self {
            layout_artist: layout_artist.into(),
            ..Default::default()
        }
    }

    pub fn deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = Some(order_type);
        self
    }

    pub fn customer(mut self, name: impl Into<String>, contact: impl Into<String>) -> Self {
        self.customer_name = name.into();
        self.customer_contact = contact.into();
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.customer_email = email.into();
        self
    }

    pub fn line_item(mut self, item_type: impl Into<String>, price_per_unit: f64, quantity: u32) -> Self {
        self.line_items
            .push(LineItem::new(item_type, price_per_unit, quantity));
        self
    }

    pub fn deposit(mut self, amount: f64) -> Self {
        self.deposit = amount;
        self
    }

    pub fn discount(mut self, percentage: f64) -> Self {
        self.discount_percentage = clamp_discount(percentage);
        self
    }

    pub fn date_of_order(mut self, date: NaiveDate) -> Self {
        self.date_of_order = Some(date);
        self
    }

    /// Validate one step. All problems of the step are reported together.
    pub fn validate_step(&self, step: FormStep) -> Result<()> {
        let errors = match step {
            FormStep::OrderInfo => {
                let mut errors = Vec::new();
                if self.deadline.is_none() {
                    errors.push("Please select a deadline".to_string());
                }
                if self.order_type.is_none() {
                    errors.push("Please select an order type".to_string());
                }
                errors
            }
            FormStep::Customer => {
                let mut errors = Vec::new();
                if self.customer_name.trim().is_empty() {
                    errors.push("Customer name is required".to_string());
                }
                if self.customer_contact.trim().is_empty() {
                    errors.push("Contact number is required".to_string());
                }
                let email = self.customer_email.trim();
                if !email.is_empty() && !validate_email(email) {
                    errors.push("Please enter a valid email address".to_string());
                }
                errors
            }
            FormStep::Items => {
                let mut errors = line_item_errors(&self.line_items);
                if !self.deposit.is_finite() || self.deposit < 0.0 {
                    errors.push("Deposit cannot be negative".to_string());
                }
                errors
            }
        };

        if errors.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Validation(errors))
        }
    }

    /// Validate every step, stopping at the first failing one.
    pub fn validate(&self) -> Result<()> {
        FormStep::ALL
            .iter()
            .try_for_each(|step| self.validate_step(*step))
    }
}

/// Reject empty lists, blank types, zero quantities and non-positive prices.
pub fn validate_line_items(items: &[LineItem]) -> Result<()> {
    let errors = line_item_errors(items);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Validation(errors))
    }
}

fn line_item_errors(items: &[LineItem]) -> Vec<String> {
    if items.is_empty() {
        return vec!["At least one sublimation order is required".to_string()];
    }

    let mut errors = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let n = index + 1;
        if item.item_type.trim().is_empty() {
            errors.push(format!("Please select type for order {}", n));
        }
        if item.quantity < 1 {
            errors.push(format!("Please enter a valid quantity for order {}", n));
        }
        if !item.price_per_unit.is_finite() || item.price_per_unit <= 0.0 {
            errors.push(format!("Please enter a valid price for order {}", n));
        }
    }
    errors
}

/// `local@domain.tld` with no whitespace and a single `@`.
pub fn validate_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_form() -> OrderForm {
        OrderForm::new("Jo")
            .deadline(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .order_type(OrderType::New)
            .customer("Ana Cruz", "09171234567")
            .line_item("Mug", 150.0, 3)
    }

    #[test]
    fn test_complete_form_is_valid() {
        assert!(complete_form().validate().is_ok());
    }

    #[test]
    fn test_order_info_step() {
        let err = OrderForm::new("Jo")
            .validate_step(FormStep::OrderInfo)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please select a deadline, Please select an order type"
        );
    }

    #[test]
    fn test_customer_step() {
        let form = complete_form().customer("", "").email("not-an-email");
        match form.validate_step(FormStep::Customer) {
            Err(StoreError::Validation(errors)) => {
                assert_eq!(
                    errors,
                    vec![
                        "Customer name is required",
                        "Contact number is required",
                        "Please enter a valid email address",
                    ]
                );
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_items_step() {
        let mut form = complete_form();
        form.line_items = vec![LineItem::new("", 100.0, 0)];
        let err = form.validate_step(FormStep::Items).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please select type for order 1, Please enter a valid quantity for order 1"
        );

        form.line_items.clear();
        assert!(form.validate_step(FormStep::Items).is_err());
    }

    #[test]
    fn test_validate_stops_at_first_failing_step() {
        let form = OrderForm::new("Jo").customer("", "");
        let err = form.validate().unwrap_err();
        assert!(err.to_string().contains("deadline"));
        assert!(!err.to_string().contains("Customer"));
    }

    #[test]
    fn test_negative_deposit_rejected() {
        assert!(complete_form().deposit(-1.0).validate().is_err());
        assert!(complete_form().deposit(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_discount_is_clamped() {
        assert_eq!(complete_form().discount(120.0).discount_percentage, 100.0);
        assert_eq!(complete_form().discount(-3.0).discount_percentage, 0.0);
    }

    #[test]
    fn test_email_format() {
        assert!(validate_email("ana@shop.ph"));
        assert!(validate_email("a.b@mail.example.com"));
        assert!(!validate_email("ana@shop"));
        assert!(!validate_email("ana@.ph"));
        assert!(!validate_email("ana@shop."));
        assert!(!validate_email("@shop.ph"));
        assert!(!validate_email("ana@@shop.ph"));
        assert!(!validate_email("ana cruz@shop.ph"));
    }
}
