//! Secret key to configuration path mapping.
//!
//! The built-in table is a flat list of `(key, path, category)` rows. Caller
//! overrides are layered on top; keys with the reserved `VAULT_` prefix fall
//! back to the `vault.*` namespace when no row matches.

use std::collections::BTreeMap;

/// Prefix whose keys map into the `vault.` configuration namespace.
pub const RESERVED_PREFIX: &str = "VAULT_";

/// Grouping of built-in mappings. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Database,
    Cache,
    Queue,
    Mail,
    Session,
    CloudStorage,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Database => "database",
            Category::Cache => "cache",
            Category::Queue => "queue",
            Category::Mail => "mail",
            Category::Session => "session",
            Category::CloudStorage => "cloud_storage",
        };
        write!(f, "{s}")
    }
}

/// Built-in mappings, in merge order.
pub const DEFAULT_MAPPINGS: &[(&str, &str, Category)] = &[
    ("DB_PASSWORD", "database.connections.mysql.password", Category::Database),
    ("DB_USERNAME", "database.connections.mysql.username", Category::Database),
    ("DB_USER", "database.connections.mysql.username", Category::Database),
    ("DB_HOST", "database.connections.mysql.host", Category::Database),
    ("DB_PORT", "database.connections.mysql.port", Category::Database),
    ("DB_DATABASE", "database.connections.mysql.database", Category::Database),
    ("CACHE_DRIVER", "cache.default", Category::Cache),
    ("REDIS_HOST", "database.redis.default.host", Category::Cache),
    ("REDIS_PASSWORD", "database.redis.default.password", Category::Cache),
    ("REDIS_PORT", "database.redis.default.port", Category::Cache),
    ("QUEUE_CONNECTION", "queue.default", Category::Queue),
    ("MAIL_MAILER", "mail.default", Category::Mail),
    ("MAIL_HOST", "mail.mailers.smtp.host", Category::Mail),
    ("MAIL_PORT", "mail.mailers.smtp.port", Category::Mail),
    ("MAIL_USERNAME", "mail.mailers.smtp.username", Category::Mail),
    ("MAIL_PASSWORD", "mail.mailers.smtp.password", Category::Mail),
    ("MAIL_ENCRYPTION", "mail.mailers.smtp.encryption", Category::Mail),
    ("MAIL_FROM_ADDRESS", "mail.from.address", Category::Mail),
    ("MAIL_FROM_NAME", "mail.from.name", Category::Mail),
    ("SESSION_DRIVER", "session.driver", Category::Session),
    ("AWS_ACCESS_KEY_ID", "services.aws.key", Category::CloudStorage),
    ("AWS_SECRET_ACCESS_KEY", "services.aws.secret", Category::CloudStorage),
    ("AWS_DEFAULT_REGION", "services.aws.region", Category::CloudStorage),
    ("AWS_BUCKET", "filesystems.disks.s3.bucket", Category::CloudStorage),
];

/// Where a resolved mapping came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingSource {
    Default(Category),
    Custom,
}

/// Merged mapping table. Constant once built.
#[derive(Debug, Clone)]
pub struct MappingTable {
    entries: BTreeMap<String, (String, MappingSource)>,
}

impl Default for MappingTable {
    fn default() -> Self {
        Self::new(std::iter::empty::<(String, String)>())
    }
}

impl MappingTable {
    /// Build the table from the defaults with `custom` overlaid.
    /// Custom keys are uppercased; a custom entry replaces a default one.
    pub fn new<I, K, P>(custom: I) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: AsRef<str>,
        P: Into<String>,
    {
        Self {
            entries: merge(DEFAULT_MAPPINGS, custom),
        }
    }

    /// Configuration path for `key`, if any.
    ///
    /// An explicit entry wins; otherwise `VAULT_FOO` resolves to `vault.foo`.
    pub fn resolve(&self, key: &str) -> Option<String> {
        let key = key.to_uppercase();
        if let Some((path, _)) = self.entries.get(&key) {
            return Some(path.clone());
        }
        reserved_prefix_path(&key)
    }

    /// Where an explicit entry for `key` came from. `None` for fallback or
    /// unmapped keys.
    pub fn source(&self, key: &str) -> Option<MappingSource> {
        self.entries.get(&key.to_uppercase()).map(|(_, src)| *src)
    }

    /// Explicit entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, MappingSource)> {
        self.entries
            .iter()
            .map(|(k, (path, src))| (k.as_str(), path.as_str(), *src))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Merge default rows with custom overrides. Pure.
pub fn merge<I, K, P>(
    defaults: &[(&str, &str, Category)],
    custom: I,
) -> BTreeMap<String, (String, MappingSource)>
where
    I: IntoIterator<Item = (K, P)>,
    K: AsRef<str>,
    P: Into<String>,
{
    let mut entries: BTreeMap<String, (String, MappingSource)> = defaults
        .iter()
        .map(|(key, path, cat)| {
            (
                (*key).to_string(),
                ((*path).to_string(), MappingSource::Default(*cat)),
            )
        })
        .collect();

    for (key, path) in custom {
        entries.insert(
            key.as_ref().to_uppercase(),
            (path.into(), MappingSource::Custom),
        );
    }

    entries
}

fn reserved_prefix_path(key: &str) -> Option<String> {
    let suffix = key.strip_prefix(RESERVED_PREFIX)?;
    if suffix.is_empty() {
        return None;
    }
    Some(format!("vault.{}", suffix.to_lowercase()))
}
