pub mod insert;
pub mod select;

use core::str::FromStr;

use crate::error::{BankStoreError, Result};

/// Parses a text tag stored by [`insert`] back into its domain enum.
pub fn parse_tag<T>(column: &'static str, tag: &str) -> Result<T>
where
    T: FromStr,
{
    tag.parse()
        .map_err(|_| BankStoreError::InvalidValue(format!("unrecognized {column}: {tag}").into()))
}
