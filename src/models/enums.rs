use crate::store::StoreError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(AppointmentStatus {
    Upcoming => "upcoming",
    InProgress => "in_progress",
    Completed => "completed",
});

str_enum!(QuoteStatus {
    Sent => "sent",
    Accepted => "accepted",
    Refused => "refused",
    Pending => "pending",
    Converted => "converted",
});

str_enum!(InvoiceStatus {
    Draft => "draft",
    Sent => "sent",
    Paid => "paid",
    Unpaid => "unpaid",
    PartiallyPaid => "partially_paid",
    Overdue => "overdue",
});

str_enum!(ExpenseStatus {
    Verified => "verified",
    Pending => "pending",
    Rejected => "rejected",
});

str_enum!(PaymentMethod {
    CreditCard => "credit_card",
    BankTransfer => "bank_transfer",
    Paypal => "paypal",
    Cash => "cash",
});

str_enum!(PaymentStatus {
    Succeeded => "succeeded",
    Pending => "pending",
    Failed => "failed",
    Refunded => "refunded",
});
