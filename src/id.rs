//! Code for handling IDs
use anyhow::{Context, Result};
use indexmap::IndexMap;

macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(
            Clone, std::hash::Hash, PartialEq, Eq, serde::Deserialize, Debug, serde::Serialize,
        )]
        /// An ID type (e.g. `ScenarioID`)
        pub struct $name(pub std::rc::Rc<str>);

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(std::rc::Rc::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(std::rc::Rc::from(s))
            }
        }

        impl $name {
            /// Create a new ID from a string slice
            pub fn new(id: &str) -> Self {
                $name(std::rc::Rc::from(id))
            }
        }
    };
}

define_id_type!(ScenarioID);

/// Look up an entry by its string ID, returning an error if it is not present
pub fn get_by_id<'a, V>(map: &'a IndexMap<ScenarioID, V>, id: &str) -> Result<&'a V> {
    map.get(id).with_context(|| format!("Unknown scenario ID {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    #[test]
    fn test_get_by_id() {
        let map = indexmap! { ScenarioID::new("baseline") => 1 };
        assert_eq!(*get_by_id(&map, "baseline").unwrap(), 1);
        assert_eq!(
            get_by_id(&map, "other").unwrap_err().to_string(),
            "Unknown scenario ID other"
        );
    }
}
