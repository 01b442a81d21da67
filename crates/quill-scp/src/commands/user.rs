use std::path::Path;

use quill_core::db::{Database, SqliteUserRepository, UserRepository};
use quill_core::User;

use crate::error::CliError;

/// Create `name` and authorize `public_key` to publish as it.
///
/// Both rows are written in one transaction, so a bad key leaves no
/// keyless account behind.
pub fn add_user(db: &Database, name: &str, public_key: &str) -> Result<User, CliError> {
    let tx = db.connection().unchecked_transaction()?;
    let users = SqliteUserRepository::new(&tx);

    let user = users.create_user(name)?;
    users.link_public_key(&user.id, public_key)?;
    tx.commit()?;

    tracing::info!(user = name, id = %user.id, "user created");
    Ok(user)
}

pub fn run_user_add(name: &str, public_key: &str, db_path: &Path) -> Result<(), CliError> {
    let db = Database::open(db_path)?;
    let user = add_user(&db, name, public_key)?;

    println!("{}", user.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIFrank frank@desk";

    #[test]
    fn add_user_links_key() {
        let db = Database::open_in_memory().unwrap();
        let user = add_user(&db, "frank", KEY).unwrap();

        let users = SqliteUserRepository::new(db.connection());
        let resolved = users.resolve_user("frank", KEY).unwrap().unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[test]
    fn bad_key_rolls_back_user() {
        let db = Database::open_in_memory().unwrap();
        let error = add_user(&db, "frank", "   ").unwrap_err();
        assert!(matches!(
            error,
            CliError::Core(quill_core::Error::InvalidInput(_))
        ));

        let users = SqliteUserRepository::new(db.connection());
        assert!(users.find_user_by_name("frank").unwrap().is_none());
    }

    #[test]
    fn run_user_add_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("quill.db");

        run_user_add("frank", KEY, &db_path).unwrap();

        let db = Database::open(&db_path).unwrap();
        let users = SqliteUserRepository::new(db.connection());
        assert!(users.find_user_by_name("frank").unwrap().is_some());
    }
}
