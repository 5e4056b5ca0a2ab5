//! Handler for `tradedb schema`.

use crate::schema::catalog;

/// Print the declarative DDL to stdout.
pub fn execute() {
    print!("{}", catalog().to_sql());
}
