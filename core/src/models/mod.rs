//! Typed handles over canonical objects.
//!
//! Each variant is a thin `Arc` wrapper around a `TrelloObject`: cloning a
//! handle never copies state, and two handles are equal when they point at
//! the same canonical instance. What a variant can link to is declared in
//! `schema`; the wrappers only add typed accessors and kind-specific rules.

use serde_json::Value;

use crate::error::ApiError;
use crate::object::ObjectRef;
use crate::transform::Attributes;
use crate::types::{ResourceId, ResourceKind};

/// Shared capability set of every variant.
pub trait Resource: Clone + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn from_object(object: ObjectRef) -> Self;

    fn object(&self) -> &ObjectRef;

    /// Validate outgoing attributes before `create` or `save` sends them.
    fn check(_attributes: &Attributes) -> Result<(), ApiError> {
        Ok(())
    }

    fn id(&self) -> &ResourceId {
        self.object().id()
    }

    fn get(&self, field: &str) -> Option<Value> {
        self.object().get(field)
    }

    fn set(&self, field: &str, value: impl Into<Value>) -> Result<(), ApiError> {
        self.object().set(field, value)
    }

    fn remove(&self, field: &str) -> Option<Value> {
        self.object().remove(field)
    }

    fn is_dirty(&self) -> bool {
        self.object().is_dirty()
    }

    fn is_loaded(&self) -> bool {
        self.object().is_loaded()
    }
}

macro_rules! resource {
    ($(#[$meta:meta])* $name:ident => $kind:ident $(, check = $check:path)?) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name($crate::object::ObjectRef);

        impl $crate::models::Resource for $name {
            const KIND: $crate::types::ResourceKind = $crate::types::ResourceKind::$kind;

            fn from_object(object: $crate::object::ObjectRef) -> Self {
                Self(object)
            }

            fn object(&self) -> &$crate::object::ObjectRef {
                &self.0
            }

            $(
                fn check(attributes: &$crate::transform::Attributes) -> Result<(), $crate::error::ApiError> {
                    $check(attributes)
                }
            )?
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                std::sync::Arc::ptr_eq(&self.0, &other.0)
            }
        }

        impl Eq for $name {}
    };
}

/// Link accessor helpers shared by the variants.
fn one<R: Resource>(object: &ObjectRef, attribute: &str) -> Option<R> {
    object
        .relation_one(attribute)
        .filter(|target| target.kind() == R::KIND)
        .map(R::from_object)
}

fn many<R: Resource>(object: &ObjectRef, attribute: &str) -> Vec<R> {
    object
        .relation_many(attribute)
        .into_iter()
        .filter(|target| target.kind() == R::KIND)
        .map(R::from_object)
        .collect()
}

mod board;
mod card;
mod check_item;
mod checklist;
mod label;
mod list;
mod organization;

pub use board::{Board, BoardPrefs};
pub use card::Card;
pub use check_item::CheckItem;
pub use checklist::Checklist;
pub use label::Label;
pub use list::List;
pub use organization::Organization;
