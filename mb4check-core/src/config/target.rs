//! What the checks compare against.

/// Default character set every object is expected to use.
pub const DEFAULT_CHARSET: &str = "utf8mb4";
/// Default collation paired with [`DEFAULT_CHARSET`].
pub const DEFAULT_COLLATION: &str = "utf8mb4_unicode_ci";
/// Schema holding the table inspected by the table check.
pub const DEFAULT_TABLE_SCHEMA: &str = "ecom-middleware";
/// Table inspected by the table check.
pub const DEFAULT_TABLE_NAME: &str = "ecom_account";

/// Character set and collation pair that columns must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEncoding {
    /// Expected character set name
    pub charset: String,
    /// Expected collation name
    pub collation: String,
}

impl Default for TargetEncoding {
    fn default() -> Self {
        Self {
            charset: DEFAULT_CHARSET.to_string(),
            collation: DEFAULT_COLLATION.to_string(),
        }
    }
}

impl TargetEncoding {
    /// Returns true when both the charset and collation match this target.
    ///
    /// Comparison is exact; MySQL reports these names in lowercase.
    pub fn matches(&self, charset: &str, collation: &str) -> bool {
        self.charset == charset && self.collation == collation
    }
}

/// The table whose default collation is reported by the table check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTarget {
    /// Schema (database) name
    pub schema: String,
    /// Table name
    pub table: String,
}

impl Default for TableTarget {
    fn default() -> Self {
        Self {
            schema: DEFAULT_TABLE_SCHEMA.to_string(),
            table: DEFAULT_TABLE_NAME.to_string(),
        }
    }
}

impl std::fmt::Display for TableTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let target = TargetEncoding::default();
        assert_eq!(target.charset, "utf8mb4");
        assert_eq!(target.collation, "utf8mb4_unicode_ci");

        let table = TableTarget::default();
        assert_eq!(table.to_string(), "ecom-middleware.ecom_account");
    }

    #[test]
    fn test_matches_requires_both() {
        let target = TargetEncoding::default();
        assert!(target.matches("utf8mb4", "utf8mb4_unicode_ci"));
        assert!(!target.matches("utf8mb4", "utf8mb4_general_ci"));
        assert!(!target.matches("latin1", "utf8mb4_unicode_ci"));
    }
}
