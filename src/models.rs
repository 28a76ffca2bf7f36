// src/models.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Ошибка разбора поля формы
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: `{value}`")]
pub struct ParseFieldError {
    pub field: &'static str,
    pub value: String,
}

macro_rules! wire_enum {
    ($name:ident, $field:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseFieldError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let upper = s.trim().to_ascii_uppercase();
                match upper.as_str() {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(ParseFieldError { field: $field, value: s.to_string() }),
                }
            }
        }
    };
}

wire_enum!(TransactionType, "transaction type", { Buy => "BUY", Sell => "SELL" });
wire_enum!(ProductType, "product type", { Delivery => "DELIVERY", Intraday => "INTRADAY" });
wire_enum!(Exchange, "exchange", { Nse => "NSE", Bse => "BSE" });
wire_enum!(OrderType, "order type", { Market => "MARKET", Limit => "LIMIT" });

/// Шаблон ордера, общий для всех выбранных счетов.
/// Цена у MARKET всегда ноль.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderTemplate {
    pub stock_name: String,
    pub transaction_type: TransactionType,
    pub product_type: ProductType,
    pub exchange: Exchange,
    pub order_type: OrderType,
    pub price: Decimal,
    pub quantity: u32,
}

/// Сырые поля формы, как их ввёл пользователь (консоль, web, телеграм)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderForm {
    pub stock_name: String,
    pub transaction_type: String,
    pub product_type: String,
    pub exchange: String,
    pub order_type: String,
    #[serde(default)]
    pub price: String,
    pub quantity: String,
}

impl OrderForm {
    /// Проверка ввода до запуска каких-либо счетов
    pub fn validate(&self) -> Result<OrderTemplate, String> {
        let stock_name = self.stock_name.trim();
        let quantity_raw = self.quantity.trim();
        if stock_name.is_empty() || quantity_raw.is_empty() {
            return Err("Please fill in stock name and quantity".to_string());
        }

        let transaction_type = parse_or_default(&self.transaction_type, TransactionType::Buy)?;
        let product_type = parse_or_default(&self.product_type, ProductType::Delivery)?;
        let exchange = parse_or_default(&self.exchange, Exchange::Nse)?;
        let order_type = parse_or_default(&self.order_type, OrderType::Market)?;

        let quantity: u32 = quantity_raw
            .parse()
            .map_err(|_| format!("Quantity must be a whole number, got `{}`", quantity_raw))?;
        if quantity == 0 {
            return Err("Quantity must be greater than zero".to_string());
        }

        let price = match order_type {
            OrderType::Market => Decimal::ZERO,
            OrderType::Limit => {
                let raw = self.price.trim();
                let price = Decimal::from_str(raw)
                    .map_err(|_| format!("LIMIT order needs a price, got `{}`", raw))?;
                if price <= Decimal::ZERO {
                    return Err("LIMIT price must be positive".to_string());
                }
                price
            }
        };

        Ok(OrderTemplate {
            stock_name: stock_name.to_string(),
            transaction_type,
            product_type,
            exchange,
            order_type,
            price,
            quantity,
        })
    }
}

fn parse_or_default<T: FromStr<Err = ParseFieldError>>(raw: &str, default: T) -> Result<T, String> {
    if raw.trim().is_empty() {
        Ok(default)
    } else {
        raw.parse().map_err(|e: ParseFieldError| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn form() -> OrderForm {
        OrderForm {
            stock_name: " testco ".into(),
            transaction_type: "sell".into(),
            product_type: "INTRADAY".into(),
            exchange: "bse".into(),
            order_type: "MARKET".into(),
            price: "123".into(),
            quantity: "5".into(),
        }
    }

    #[test]
    fn market_order_drops_price() {
        let t = form().validate().unwrap();
        assert_eq!(t.stock_name, "testco");
        assert_eq!(t.transaction_type, TransactionType::Sell);
        assert_eq!(t.exchange, Exchange::Bse);
        assert_eq!(t.price, Decimal::ZERO);
        assert_eq!(t.quantity, 5);
    }

    #[test]
    fn limit_order_requires_positive_price() {
        let mut f = form();
        f.order_type = "limit".into();
        f.price = "".into();
        assert!(f.validate().is_err());
        f.price = "101.5".into();
        assert_eq!(f.validate().unwrap().price, dec!(101.5));
    }

    #[test]
    fn missing_fields_are_rejected() {
        let mut f = form();
        f.quantity = " ".into();
        assert!(f.validate().is_err());
        let mut f = form();
        f.stock_name.clear();
        assert!(f.validate().is_err());
        let mut f = form();
        f.exchange = "NYSE".into();
        assert_eq!(f.validate().unwrap_err(), "invalid exchange: `NYSE`");
    }

    #[test]
    fn blank_selectors_fall_back_to_form_defaults() {
        let f = OrderForm { stock_name: "X".into(), quantity: "1".into(), ..Default::default() };
        let t = f.validate().unwrap();
        assert_eq!(t.transaction_type, TransactionType::Buy);
        assert_eq!(t.product_type, ProductType::Delivery);
        assert_eq!(t.exchange, Exchange::Nse);
        assert_eq!(t.order_type, OrderType::Market);
    }
}
