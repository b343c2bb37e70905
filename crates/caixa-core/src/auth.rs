use anyhow::{anyhow, Context, Result};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::State;

/// Credential gate in front of the ledger: a user table with argon2
/// password hashes, and a login session persisted in machine state.
pub struct UserManager {
    conn: Connection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: String,
}

impl UserManager {
    /// Open the user table at the given path, creating it if needed
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create db directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                role TEXT NOT NULL,
                password_hash TEXT NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }

    /// Add a user or update an existing one.
    pub fn add_user(&self, id: &str, name: &str, role: &str, password: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(anyhow!("User id must not be empty"));
        }
        let hash = hash_password(password)?;
        self.conn.execute(
            "INSERT INTO users (id, name, role, password_hash)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                role = excluded.role,
                password_hash = excluded.password_hash",
            params![id, name, role, hash],
        )?;
        Ok(())
    }

    /// Verify credentials. On success the session is written into `state`
    /// and persisted; on a wrong password or unknown user nothing changes.
    pub fn login(&self, state: &mut State, id: &str, password: &str) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                "SELECT name, role, password_hash FROM users WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((name, role, stored_hash)) = row else {
            return Ok(None);
        };
        if !verify_password(password, &stored_hash)? {
            return Ok(None);
        }

        let user = User {
            id: id.to_string(),
            name,
            role,
        };
        state.session.user_id = Some(user.id.clone());
        state.session.user_name = Some(user.name.clone());
        state.save()?;
        Ok(Some(user))
    }

    /// Drop the persisted session.
    pub fn logout(state: &mut State) -> Result<()> {
        state.session.user_id = None;
        state.session.user_name = None;
        state.save()
    }
}

/// Hash a password using Argon2id with a random salt
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;
    Ok(password_hash.to_string())
}

/// Verify a password against a hash
fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow!("Invalid password hash: {}", e))?;
    let argon2 = Argon2::default();
    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
