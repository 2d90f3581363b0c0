#[must_use]
pub fn quote_identifier(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

#[must_use]
pub fn use_database_sql(database: &str) -> String {
    format!("USE {}", quote_identifier(database))
}

#[must_use]
pub fn preview_select_sql(table: &str, limit: usize) -> String {
    format!("SELECT * FROM {} LIMIT {limit}", quote_identifier(table))
}

#[cfg(test)]
mod tests {
    use super::{preview_select_sql, quote_identifier, use_database_sql};

    #[test]
    fn identifiers_escape_embedded_backticks() {
        assert_eq!(quote_identifier("users"), "`users`");
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn statements_quote_their_targets() {
        assert_eq!(use_database_sql("hr"), "USE `hr`");
        assert_eq!(
            preview_select_sql("order items", 100),
            "SELECT * FROM `order items` LIMIT 100"
        );
    }
}
