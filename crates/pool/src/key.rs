use std::fmt;

/// Identifies a pool entry by the connection tuple that matters for
/// connection reuse. Deliberately excludes the password: rotating a
/// destination's credential must not spawn a second pool for the same
/// physical server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub database: String,
}

impl PoolKey {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            database: database.into(),
        }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}/{}", self.username, self.host, self.port, self.database)
    }
}

/// A resolved connection tuple, as produced by the Mapping Store (C3) from a
/// `DBMapping` record. Carries the password, unlike [`PoolKey`].
#[derive(Debug, Clone)]
pub struct ResolvedConnection {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl ResolvedConnection {
    pub fn pool_key(&self) -> PoolKey {
        PoolKey::new(
            self.host.clone(),
            self.port,
            self.username.clone(),
            self.database.clone(),
        )
    }

    /// Build a `mysql://` connection URL for `sqlx`.
    pub fn to_url(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            urlencode(&self.username),
            urlencode(&self.password),
            self.host,
            self.port,
            self.database
        )
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_key_excludes_password() {
        let a = ResolvedConnection {
            host: "db.internal".into(),
            port: 3306,
            username: "svc".into(),
            password: "old".into(),
            database: "orders".into(),
        };
        let b = ResolvedConnection {
            password: "new".into(),
            ..a.clone()
        };
        assert_eq!(a.pool_key(), b.pool_key());
    }

    #[test]
    fn urlencode_escapes_special_chars() {
        let conn = ResolvedConnection {
            host: "db.internal".into(),
            port: 3306,
            username: "svc".into(),
            password: "p@ss/word".into(),
            database: "orders".into(),
        };
        assert!(conn.to_url().contains("p%40ss%2Fword"));
    }
}
