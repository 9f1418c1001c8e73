//! The built-in validators, in the order they run.
//!
//! Order matters: later validators skip re-reporting structure and type
//! problems that earlier ones already own.

mod asim;
mod constraints;
mod entity;
mod identifier;
mod query;
mod schema;
mod timing;

pub use asim::AsimFieldValidator;
pub use constraints::ConstraintsValidator;
pub use entity::EntityValidator;
pub use identifier::IdentifierValidator;
pub use query::QueryValidator;
pub use schema::SchemaValidator;
pub use timing::TimingValidator;

use crate::validator::Validator;

/// Every validator that needs no external capability, in run order. The
/// query validator is appended by the linter when an engine is available.
pub fn builtin_validators() -> Vec<Box<dyn Validator>> {
    vec![
        Box::new(IdentifierValidator),
        Box::new(SchemaValidator),
        Box::new(ConstraintsValidator),
        Box::new(EntityValidator),
        Box::new(AsimFieldValidator),
        Box::new(TimingValidator),
    ]
}

/// Iterate `entityMappings[*].fieldMappings[*]` entries that are mappings,
/// with their indices. Anything malformed on the way is skipped.
pub(crate) fn field_mappings(
    record: &crate::Record,
) -> impl Iterator<Item = (usize, &serde_yaml::Mapping, usize, &serde_yaml::Mapping)> {
    record
        .get_seq("entityMappings")
        .into_iter()
        .flatten()
        .enumerate()
        .filter_map(|(i, e)| e.as_mapping().map(|m| (i, m)))
        .flat_map(|(i, entity)| {
            crate::record::lookup(entity, "fieldMappings")
                .and_then(|v| v.as_sequence())
                .into_iter()
                .flatten()
                .enumerate()
                .filter_map(move |(j, fm)| fm.as_mapping().map(|fm| (i, entity, j, fm)))
        })
}
