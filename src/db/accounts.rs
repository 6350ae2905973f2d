//! Users, the invite allowlist and user settings

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use tracing::info;

use super::{Database, DbError, Result, parse_time};
use crate::settings::UserSettings;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid { Ok(email) } else { Err(DbError::InvalidEmail(email)) }
}

impl Database {
    /// Add an email to the invite allowlist
    pub fn invite(&self, email: &str) -> Result<()> {
        let email = normalize_email(email)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO invited_emails (email, invited_at) VALUES (?1, ?2)",
            params![email, Utc::now().to_rfc3339()],
        )?;
        info!(email = %email, "invited");
        Ok(())
    }

    pub fn is_invited(&self, email: &str) -> Result<bool> {
        let email = normalize_email(email)?;
        let found: Option<String> = self
            .conn
            .query_row("SELECT email FROM invited_emails WHERE email = ?1", params![email], |r| r.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// Create a user; only invited emails may sign up
    pub fn signup(&self, email: &str) -> Result<User> {
        let email = normalize_email(email)?;
        if !self.is_invited(&email)? {
            return Err(DbError::InviteRequired(email));
        }
        if self.user_by_email(&email)?.is_some() {
            return Err(DbError::UserExists(email));
        }
        self.conn.execute(
            "INSERT INTO users (email, created_at) VALUES (?1, ?2)",
            params![email, Utc::now().to_rfc3339()],
        )?;
        info!(email = %email, "user signed up");
        self.user_by_email(&email)?
            .ok_or_else(|| DbError::Internal(format!("user {email} missing after insert")))
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .conn
            .query_row(
                "SELECT id, email, created_at FROM users WHERE email = ?1",
                params![email],
                |r| Ok(User { id: r.get(0)?, email: r.get(1)?, created_at: parse_time(r, 2)? }),
            )
            .optional()?)
    }

    /// Like [`Database::user_by_email`], but a missing user is an error
    pub fn require_user(&self, email: &str) -> Result<User> {
        self.user_by_email(email)?
            .ok_or_else(|| DbError::UserNotFound(email.to_string()))
    }

    /// Stored settings, or the defaults when the user never saved any
    pub fn settings(&self, user_id: i64) -> Result<UserSettings> {
        let row: Option<(Option<String>, Option<String>, bool, bool)> = self
            .conn
            .query_row(
                "SELECT theme, default_unit, auto_rest_on_set_done, focus_mode
                 FROM user_settings WHERE user_id = ?1",
                params![user_id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .optional()?;
        Ok(match row {
            Some((theme, unit, auto_rest, focus)) => {
                UserSettings::from_stored(theme.as_deref(), unit.as_deref(), auto_rest, focus)
            }
            None => UserSettings::default(),
        })
    }

    pub fn save_settings(&self, user_id: i64, settings: &UserSettings) -> Result<()> {
        self.conn.execute(
            "INSERT INTO user_settings (user_id, theme, default_unit, auto_rest_on_set_done, focus_mode)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (user_id) DO UPDATE SET
                theme = excluded.theme,
                default_unit = excluded.default_unit,
                auto_rest_on_set_done = excluded.auto_rest_on_set_done,
                focus_mode = excluded.focus_mode",
            params![
                user_id,
                settings.theme.as_str(),
                settings.default_unit.as_str(),
                settings.auto_rest_on_set_done,
                settings.focus_mode,
            ],
        )?;
        info!(user_id, "saved settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Unit;
    use crate::settings::Theme;

    #[test]
    fn test_email_normalization() {
        assert_eq!(normalize_email("  Lifter@Example.COM ").unwrap(), "lifter@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("a@b").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a b@example.com").is_err());
    }

    #[test]
    fn test_signup_requires_invite() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.signup("a@example.com"), Err(DbError::InviteRequired(_))));

        db.invite("A@Example.com").unwrap();
        let user = db.signup("a@example.com").unwrap();
        assert_eq!(user.email, "a@example.com");
        assert!(matches!(db.signup("a@example.com"), Err(DbError::UserExists(_))));
        assert_eq!(db.require_user("A@EXAMPLE.COM").unwrap().id, user.id);
    }

    #[test]
    fn test_settings_default_and_upsert() {
        let db = Database::open_in_memory().unwrap();
        db.invite("a@example.com").unwrap();
        let user = db.signup("a@example.com").unwrap();

        assert_eq!(db.settings(user.id).unwrap(), UserSettings::default());

        let settings = UserSettings {
            theme: Theme::Dark,
            default_unit: Unit::Lb,
            auto_rest_on_set_done: true,
            focus_mode: false,
        };
        db.save_settings(user.id, &settings).unwrap();
        assert_eq!(db.settings(user.id).unwrap(), settings);

        let settings = UserSettings { focus_mode: true, ..settings };
        db.save_settings(user.id, &settings).unwrap();
        assert_eq!(db.settings(user.id).unwrap(), settings);
    }

    #[test]
    fn test_unknown_stored_theme_falls_back_to_defaults() {
        let db = Database::open_in_memory().unwrap();
        db.invite("a@example.com").unwrap();
        let user = db.signup("a@example.com").unwrap();
        db.conn
            .execute(
                "INSERT INTO user_settings (user_id, theme, default_unit, auto_rest_on_set_done, focus_mode)
                 VALUES (?1, 'neon', 'lb', 1, 1)",
                params![user.id],
            )
            .unwrap();
        assert_eq!(db.settings(user.id).unwrap(), UserSettings::default());
    }
}
