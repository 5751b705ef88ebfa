// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Physical properties a plan may be required to provide.

use std::collections::hash_map::DefaultHasher;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

use cascara_expr::ExprNode;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::operators::OrderDirection;

/// Output sorted by a list of keys, most significant first.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertySort {
    sort_keys: Vec<(ExprNode, OrderDirection)>,
}

impl PropertySort {
    pub fn new(sort_keys: Vec<(ExprNode, OrderDirection)>) -> Self {
        Self { sort_keys }
    }

    pub fn sort_keys(&self) -> &[(ExprNode, OrderDirection)] {
        &self.sort_keys
    }

    /// Whether output sorted by `self` is also sorted by `required`: the required keys must be a
    /// prefix of ours, with the same directions.
    pub fn satisfies(&self, required: &PropertySort) -> bool {
        required.sort_keys.len() <= self.sort_keys.len()
            && self
                .sort_keys
                .iter()
                .zip(&required.sort_keys)
                .all(|(provided, required)| provided == required)
    }
}

impl Display for PropertySort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}]",
            self.sort_keys
                .iter()
                .map(|(expr, direction)| format!("{} {}", expr, direction))
                .join(", ")
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    Sort(PropertySort),
}

impl Property {
    /// Whether a plan providing `self` meets the requirement `required`. Properties of
    /// different kinds never satisfy each other.
    pub fn satisfies(&self, required: &Property) -> bool {
        match (self, required) {
            (Self::Sort(provided), Self::Sort(required)) => provided.satisfies(required),
        }
    }
}

impl Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sort(sort) => write!(f, "sort{}", sort),
        }
    }
}

/// The physical properties a plan provides or is required to provide.
///
/// Equality and hashing ignore insertion order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PropertySet {
    properties: Vec<Property>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `property` unless an equal one is already present.
    pub fn add_property(&mut self, property: Property) {
        if !self.properties.contains(&property) {
            self.properties.push(property);
        }
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether some property of this set satisfies `required`.
    pub fn has_property(&self, required: &Property) -> bool {
        self.properties
            .iter()
            .any(|provided| provided.satisfies(required))
    }

    /// Whether every property of `required` is satisfied by this set.
    pub fn satisfies(&self, required: &PropertySet) -> bool {
        required
            .properties
            .iter()
            .all(|property| self.has_property(property))
    }
}

impl From<Vec<Property>> for PropertySet {
    fn from(properties: Vec<Property>) -> Self {
        let mut set = PropertySet::new();
        for property in properties {
            set.add_property(property);
        }
        set
    }
}

impl PartialEq for PropertySet {
    fn eq(&self, other: &Self) -> bool {
        self.properties.len() == other.properties.len()
            && self
                .properties
                .iter()
                .all(|property| other.properties.contains(property))
    }
}

impl Eq for PropertySet {}

impl Hash for PropertySet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut hashes = self
            .properties
            .iter()
            .map(|property| {
                let mut hasher = DefaultHasher::new();
                property.hash(&mut hasher);
                hasher.finish()
            })
            .collect_vec();
        hashes.sort_unstable();
        hashes.hash(state);
    }
}

impl Display for PropertySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.properties.iter().join(", "))
    }
}
