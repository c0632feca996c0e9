//! Status helper enums mapping to SMALLINT columns.
//!
//! Values are stored directly (no lookup tables); each enum's
//! discriminants are part of the schema contract and must never be
//! renumbered.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Queue topic lifecycle status.
    TopicStatus {
        Pending = 1,
        Processing = 2,
        Completed = 3,
        Failed = 4,
    }
}

define_status_enum! {
    /// Where a queue topic came from.
    TopicSource {
        Manual = 1,
        Queue = 2,
        Scheduled = 3,
        Trending = 4,
    }
}

define_status_enum! {
    /// Terminal outcome recorded in the cost ledger.
    LedgerOutcome {
        Completed = 1,
        Failed = 2,
    }
}
