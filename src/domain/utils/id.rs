use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Name-like identifier, distinguished at the type level by its tag.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Serialize)]
pub struct Id<T> {
    pub id: String,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(id: impl Into<String>) -> Self {
        Id { id: id.into(), _marker: PhantomData }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<T> From<Id<T>> for String {
    fn from(id_wrapper: Id<T>) -> Self {
        id_wrapper.id
    }
}

impl<T> From<&str> for Id<T> {
    fn from(id: &str) -> Self {
        Id::new(id)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_name = std::any::type_name::<T>();
        let clean_name = full_name.split("::").last().unwrap_or(full_name);
        let display_name = clean_name.replace("Tag", "Name");

        write!(f, "{}: {:?}", display_name, self.id)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct ResourceTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct MapTag;

pub type ResourceName = Id<ResourceTag>;
pub type MapName = Id<MapTag>;

/// Numeric identifiers handed out by the schedule and the constraint tracker.
macro_rules! numeric_id {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
            pub struct $name(pub u64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<u64> for $name {
                fn from(value: u64) -> Self {
                    $name(value)
                }
            }
        )*
    };
}

numeric_id!(ParticipantId, ReservationId, RequestId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_names_the_tag() {
        let name = ResourceName::new("dock_1");
        assert_eq!(format!("{:?}", name), "ResourceName: \"dock_1\"");
        assert_eq!(name.to_string(), "dock_1");
    }

    #[test]
    fn numeric_ids_order_by_value() {
        assert!(ReservationId(3) < ReservationId(10));
        assert_eq!(RequestId::from(7).to_string(), "7");
    }
}
