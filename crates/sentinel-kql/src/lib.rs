//! # sentinel-kql
//!
//! A front end for the Kusto Query Language subset used in Microsoft Sentinel
//! analytics rules.
//!
//! - **Syntax**: a [`pest`] grammar with Pratt parsing for scalar operator
//!   precedence. Errors carry the byte offset and length of the offending token.
//! - **Result columns**: the columns a query produces are inferred with Kusto's
//!   default naming (`count_`, `dcount_Ip`, `Column1`, ...).
//! - **Semantics**: against a [`Database`], unknown tables and columns and
//!   incomparable operand types are reported.
//!
//! ## Quick Start
//!
//! ```rust
//! use sentinel_kql::{Database, Table, analyze, parse};
//!
//! let parsed = parse("SigninLogs | project UserPrincipalName, IPAddress");
//! assert!(!parsed.has_errors());
//! assert_eq!(parsed.column_names(), Some(vec!["UserPrincipalName", "IPAddress"]));
//!
//! let db = Database::from_tables(
//!     "SecurityInsights",
//!     [Table::new("SigninLogs", [("UserPrincipalName", "string")]).unwrap()],
//! )
//! .unwrap();
//! let analyzed = analyze("SigninLogs | where UserName == 'x'", &db);
//! assert!(analyzed.diagnostics[0].message.contains("does not refer to any known column"));
//! ```

pub mod ast;
pub mod code;
pub mod error;
pub mod parser;
pub mod schema;
mod semantic;

pub use ast::{Query, Span};
pub use code::{Diagnostic, ParsedQuery, Severity, analyze, parse};
pub use error::{KqlError, Result};
pub use parser::{SyntaxError, parse_query};
pub use schema::{Column, Database, ScalarType, Table};
