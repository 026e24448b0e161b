//! Status helper enums mapping to SMALLINT columns.
//!
//! Each enum variant's discriminant is the value stored in the database; the
//! label is the wire representation used in JSON and query strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant = $val ),+
        }

        impl $name {
            /// Every variant, in discriminant order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Map a database status ID back to its variant.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// Wire label, e.g. `"PENDING_APPROVAL"`.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| {
                        CoreError::Validation(format!(
                            "Invalid {} '{s}'",
                            stringify!($name)
                        ))
                    })
            }
        }
    };
}

define_status_enum! {
    /// Publication state of a listing. Doubles as the workflow state.
    ListingStatus {
        Draft = 1 => "DRAFT",
        PendingApproval = 2 => "PENDING_APPROVAL",
        Approved = 3 => "APPROVED",
        Rejected = 4 => "REJECTED",
        RevisionRequested = 5 => "REVISION_REQUESTED",
        Withdrawn = 6 => "WITHDRAWN",
        Sold = 7 => "SOLD",
        Rented = 8 => "RENTED",
    }
}

define_status_enum! {
    /// Moderation state of a listing.
    ApprovalStatus {
        Pending = 1 => "PENDING",
        Approved = 2 => "APPROVED",
        Rejected = 3 => "REJECTED",
        RevisionRequested = 4 => "REVISION_REQUESTED",
    }
}

define_status_enum! {
    /// Kind of property being listed.
    PropertyType {
        House = 1 => "HOUSE",
        Apartment = 2 => "APARTMENT",
        Condo = 3 => "CONDO",
        Townhouse = 4 => "TOWNHOUSE",
        Villa = 5 => "VILLA",
        Land = 6 => "LAND",
        Commercial = 7 => "COMMERCIAL",
    }
}

define_status_enum! {
    /// Whether the listing is offered for sale or for rent.
    TransactionKind {
        Sale = 1 => "SALE",
        Rent = 2 => "RENT",
    }
}

impl ListingStatus {
    /// The only approval status that may be persisted alongside `self`.
    pub fn approval_status(self) -> ApprovalStatus {
        match self {
            ListingStatus::Draft | ListingStatus::PendingApproval => ApprovalStatus::Pending,
            ListingStatus::Rejected => ApprovalStatus::Rejected,
            ListingStatus::RevisionRequested => ApprovalStatus::RevisionRequested,
            ListingStatus::Approved
            | ListingStatus::Withdrawn
            | ListingStatus::Sold
            | ListingStatus::Rented => ApprovalStatus::Approved,
        }
    }

    /// `SOLD` and `RENTED` end the lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, ListingStatus::Sold | ListingStatus::Rented)
    }
}

/// Whether `(status, approval)` is one of the persisted pairings.
pub fn is_valid_pair(status: ListingStatus, approval: ApprovalStatus) -> bool {
    status.approval_status() == approval
}
