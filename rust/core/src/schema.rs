// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Network source field schema
//!
//! Feature attributes are fixed record fields rather than string-keyed
//! dictionaries, so the set of fields a feature carries is a [`FieldSet`] of
//! [`Field`] variants. A network source declares which fields it accepts and
//! which are mandatory; merging checks both directions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Attribute field of a network source feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    BuildingId,
    FloorId,
    Name,
    Speed,
    Minutes,
    Seconds,
    Length,
    SourceLayer,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::BuildingId,
        Field::FloorId,
        Field::Name,
        Field::Speed,
        Field::Minutes,
        Field::Seconds,
        Field::Length,
        Field::SourceLayer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::BuildingId => "building_id",
            Field::FloorId => "floor_id",
            Field::Name => "name",
            Field::Speed => "speed",
            Field::Minutes => "minutes",
            Field::Seconds => "seconds",
            Field::Length => "length",
            Field::SourceLayer => "source_layer",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of fields populated on a feature
pub type FieldSet = BTreeSet<Field>;

/// One field declared by a network source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub field: Field,
    pub required: bool,
}

impl FieldDef {
    pub fn required(field: Field) -> Self {
        Self {
            field,
            required: true,
        }
    }

    pub fn optional(field: Field) -> Self {
        Self {
            field,
            required: false,
        }
    }
}

/// Fields a network source accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<FieldDef>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    /// Schema of a pedestrian network source: identity, name and cost
    /// fields are mandatory, the originating CAD layer is optional.
    pub fn pedestrian_network() -> Self {
        Self::new(vec![
            FieldDef::required(Field::BuildingId),
            FieldDef::required(Field::FloorId),
            FieldDef::required(Field::Name),
            FieldDef::required(Field::Speed),
            FieldDef::required(Field::Minutes),
            FieldDef::required(Field::Seconds),
            FieldDef::required(Field::Length),
            FieldDef::optional(Field::SourceLayer),
        ])
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.iter().any(|def| def.field == field)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields
            .iter()
            .filter(|def| def.required)
            .map(|def| def.field)
    }

    /// Check a feature's fields against this schema.
    ///
    /// Every populated field must be declared, and every required field must
    /// be populated.
    pub fn check(&self, fields: &FieldSet) -> Result<(), SchemaViolation> {
        let unexpected: Vec<Field> = fields
            .iter()
            .copied()
            .filter(|&field| !self.contains(field))
            .collect();
        let missing: Vec<Field> = self
            .required_fields()
            .filter(|field| !fields.contains(field))
            .collect();

        if unexpected.is_empty() && missing.is_empty() {
            Ok(())
        } else {
            Err(SchemaViolation {
                missing,
                unexpected,
            })
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::pedestrian_network()
    }
}

/// Difference between a feature's fields and a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub missing: Vec<Field>,
    pub unexpected: Vec<Field>,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |fields: &[Field]| {
            fields
                .iter()
                .map(Field::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match (self.missing.is_empty(), self.unexpected.is_empty()) {
            (false, true) => write!(f, "missing required fields [{}]", join(&self.missing)),
            (true, false) => write!(f, "fields not in schema [{}]", join(&self.unexpected)),
            _ => write!(
                f,
                "missing required fields [{}], fields not in schema [{}]",
                join(&self.missing),
                join(&self.unexpected)
            ),
        }
    }
}
