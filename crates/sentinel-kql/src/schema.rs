//! Table and column metadata used for semantic analysis.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{KqlError, Result};

/// Kusto scalar data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Bool,
    Int,
    Long,
    Real,
    Decimal,
    String,
    DateTime,
    TimeSpan,
    Guid,
    Dynamic,
    /// Type could not be inferred. Never reported as a mismatch.
    Unknown,
}

impl ScalarType {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ScalarType::Int | ScalarType::Long | ScalarType::Real | ScalarType::Decimal
        )
    }

    /// Whether `==`, `<` and friends accept these two operand types.
    pub fn is_comparable_with(self, other: ScalarType) -> bool {
        use ScalarType::*;
        self == other
            || matches!(self, Unknown | Dynamic)
            || matches!(other, Unknown | Dynamic)
            || (self.is_numeric() && other.is_numeric())
    }

    /// Result type of numeric promotion, e.g. `int + real → real`.
    pub fn widen(self, other: ScalarType) -> ScalarType {
        use ScalarType::*;
        match (self, other) {
            (Decimal, _) | (_, Decimal) => Decimal,
            (Real, _) | (_, Real) => Real,
            (Long, _) | (_, Long) => Long,
            _ => Int,
        }
    }
}

impl FromStr for ScalarType {
    type Err = KqlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(ScalarType::Bool),
            "int" | "int32" => Ok(ScalarType::Int),
            "long" | "int64" => Ok(ScalarType::Long),
            "real" | "double" => Ok(ScalarType::Real),
            "decimal" => Ok(ScalarType::Decimal),
            "string" => Ok(ScalarType::String),
            "datetime" | "date" => Ok(ScalarType::DateTime),
            "timespan" | "time" => Ok(ScalarType::TimeSpan),
            "guid" | "uniqueid" => Ok(ScalarType::Guid),
            "dynamic" => Ok(ScalarType::Dynamic),
            _ => Err(KqlError::UnknownType(s.to_string())),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::Long => "long",
            ScalarType::Real => "real",
            ScalarType::Decimal => "decimal",
            ScalarType::String => "string",
            ScalarType::DateTime => "datetime",
            ScalarType::TimeSpan => "timespan",
            ScalarType::Guid => "guid",
            ScalarType::Dynamic => "dynamic",
            ScalarType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ScalarType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ScalarType) -> Self {
        Column {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    /// Build a table from `(column, type name)` pairs.
    pub fn new<N, T>(name: impl Into<String>, columns: impl IntoIterator<Item = (N, T)>) -> Result<Self>
    where
        N: Into<String>,
        T: AsRef<str>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(KqlError::InvalidName(name));
        }
        let mut out: Vec<Column> = Vec::new();
        for (column, ty) in columns {
            let column = column.into();
            if out.iter().any(|c| c.name == column) {
                return Err(KqlError::DuplicateColumn {
                    table: name,
                    column,
                });
            }
            let ty = ty.as_ref().parse()?;
            out.push(Column::new(column, ty));
        }
        Ok(Table { name, columns: out })
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A named set of tables that queries are resolved against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Database {
    pub name: String,
    tables: BTreeMap<String, Table>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Database {
            name: name.into(),
            tables: BTreeMap::new(),
        }
    }

    /// Build a database from tables, rejecting duplicate table names.
    pub fn from_tables(name: impl Into<String>, tables: impl IntoIterator<Item = Table>) -> Result<Self> {
        let mut db = Database::new(name);
        for table in tables {
            db.add_table(table)?;
        }
        Ok(db)
    }

    pub fn add_table(&mut self, table: Table) -> Result<()> {
        if self.tables.contains_key(&table.name) {
            return Err(KqlError::DuplicateTable(table.name));
        }
        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    pub fn with_table(mut self, table: Table) -> Result<Self> {
        self.add_table(table)?;
        Ok(self)
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_type_aliases() {
        assert_eq!("boolean".parse::<ScalarType>().unwrap(), ScalarType::Bool);
        assert_eq!("double".parse::<ScalarType>().unwrap(), ScalarType::Real);
        assert_eq!("DateTime".parse::<ScalarType>().unwrap(), ScalarType::DateTime);
        assert!(matches!(
            "varchar".parse::<ScalarType>(),
            Err(KqlError::UnknownType(t)) if t == "varchar"
        ));
    }

    #[test]
    fn numeric_types_compare_with_each_other() {
        assert!(ScalarType::Int.is_comparable_with(ScalarType::Real));
        assert!(ScalarType::String.is_comparable_with(ScalarType::Dynamic));
        assert!(!ScalarType::String.is_comparable_with(ScalarType::Long));
        assert!(!ScalarType::DateTime.is_comparable_with(ScalarType::TimeSpan));
    }

    #[test]
    fn table_rejects_duplicate_columns() {
        let err = Table::new("T", [("a", "string"), ("a", "long")]).unwrap_err();
        assert!(matches!(err, KqlError::DuplicateColumn { .. }), "got: {err}");
    }

    #[test]
    fn database_rejects_duplicate_tables() {
        let t = Table::new("T", [("a", "string")]).unwrap();
        let db = Database::new("db").with_table(t.clone()).unwrap();
        assert!(db.table("T").is_some());
        assert!(matches!(
            db.with_table(t),
            Err(KqlError::DuplicateTable(n)) if n == "T"
        ));
    }
}
