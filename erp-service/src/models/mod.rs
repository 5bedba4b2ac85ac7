//! Row types for every table.
//!
//! Each table gets three types: `FooData` holds the writable columns and is
//! both the insert payload and the JSON body of a create request, `Foo` is a
//! stored row (`id` + data + `created_at`), and `FooChanges` is the partial
//! update used by PATCH handlers, with every column optional.

/// Declares the stored row and the changeset for a table whose writable
/// columns live in `$data`. Append-only tables leave the changeset out.
macro_rules! record {
    (@row $(#[$meta:meta])* $row:ident($data:ident) in $table:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, diesel::Queryable, diesel::Selectable, serde::Serialize)]
        #[diesel(table_name = crate::schema::$table)]
        #[diesel(check_for_backend(diesel::pg::Pg))]
        #[serde(rename_all = "camelCase")]
        pub struct $row {
            pub id: i32,
            #[diesel(embed)]
            #[serde(flatten)]
            pub data: $data,
            pub created_at: chrono::DateTime<chrono::Utc>,
        }
    };

    (
        $(#[$meta:meta])*
        $row:ident($data:ident) in $table:ident as $entity:literal;
    ) => {
        record!(@row $(#[$meta])* $row($data) in $table);

        impl crate::store::Record for $row {
            type Data = $data;
            type Changes = crate::store::NoChanges;

            const ENTITY: &'static str = $entity;

            fn id(&self) -> i32 {
                self.id
            }

            fn data(&self) -> &$data {
                &self.data
            }

            fn assemble(id: i32, data: $data, created_at: chrono::DateTime<chrono::Utc>) -> Self {
                $row { id, data, created_at }
            }

            fn apply(&mut self, _: crate::store::NoChanges) {}

            fn has_changes(_: &crate::store::NoChanges) -> bool {
                false
            }
        }
    };

    (
        $(#[$meta:meta])*
        $row:ident($data:ident) in $table:ident as $entity:literal;
        $changes:ident {
            $($field:ident: $ty:ty),+ $(,)?
        }
    ) => {
        record!(@row $(#[$meta])* $row($data) in $table);

        #[derive(Debug, Clone, Default, diesel::AsChangeset, serde::Serialize, serde::Deserialize)]
        #[diesel(table_name = crate::schema::$table)]
        #[serde(rename_all = "camelCase")]
        pub struct $changes {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )+
        }

        impl crate::store::Record for $row {
            type Data = $data;
            type Changes = $changes;

            const ENTITY: &'static str = $entity;

            fn id(&self) -> i32 {
                self.id
            }

            fn data(&self) -> &$data {
                &self.data
            }

            fn assemble(id: i32, data: $data, created_at: chrono::DateTime<chrono::Utc>) -> Self {
                $row { id, data, created_at }
            }

            fn apply(&mut self, changes: $changes) {
                $(
                    if let Some(value) = changes.$field {
                        self.data.$field = value.into();
                    }
                )+
            }

            fn has_changes(changes: &$changes) -> bool {
                false $(|| changes.$field.is_some())+
            }
        }
    };
}

/// Column defaults for create requests, mirroring the SQL defaults.
pub(crate) mod defaults {
    use serde_json::{json, Value};

    macro_rules! text {
        ($($name:ident => $value:literal),+ $(,)?) => {
            $(pub fn $name() -> String { $value.to_string() })+
        };
    }

    text! {
        active => "active",
        all => "all",
        channel => "channel",
        code_one => "1",
        homologacao => "homologacao",
        light => "light",
        medium => "medium",
        mentions => "mentions",
        nfe_draft => "em_digitacao",
        nfe_model => "55",
        normal => "normal",
        notify_default => "default",
        open => "open",
        operational => "operational",
        order_new => "new",
        pending => "pending",
        planned => "planned",
        public => "public",
        simples => "simples",
        ticket_open => "aberto",
        uf_mg => "MG",
        unit_un => "UN",
        user_role => "user",
    }

    pub fn yes() -> bool {
        true
    }

    pub fn one_i32() -> i32 {
        1
    }

    pub fn one_f64() -> f64 {
        1.0
    }

    pub fn empty_array() -> Value {
        json!([])
    }

    pub fn empty_object() -> Value {
        json!({})
    }
}

pub mod admin;
pub mod chat;
pub mod finance;
pub mod fiscal;
pub mod hr;
pub mod inventory;
pub mod maintenance;
pub mod pricing;
pub mod production;
pub mod purchase;
pub mod quality;
pub mod sales;
pub mod support;

pub use admin::*;
pub use chat::*;
pub use finance::*;
pub use fiscal::*;
pub use hr::*;
pub use inventory::*;
pub use maintenance::*;
pub use pricing::*;
pub use production::*;
pub use purchase::*;
pub use quality::*;
pub use sales::*;
pub use support::*;
