//! Repository configuration stored as `config.toml` in the metadata directory.
//!
//! ```toml
//! [user]
//! name = "Alice"
//! email = "alice@example.com"
//!
//! [core]
//! ignore_file = ".sprigignore"
//! compression = 6
//!
//! [tree]
//! order = "enumeration"
//! keep_empty_dirs = true
//! ```

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sprig_types::Identity;

use crate::error::{SdkError, SdkResult};
use crate::tree::EntryOrder;

/// Keys accepted by [`RepoConfig::get`] and [`RepoConfig::set`].
pub const KEYS: &[&str] = &[
    "user.name",
    "user.email",
    "committer.name",
    "committer.email",
    "core.ignore_file",
    "core.compression",
    "tree.order",
    "tree.keep_empty_dirs",
];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Author identity. Also the committer unless `[committer]` is set.
    pub user: UserConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committer: Option<UserConfig>,
    pub core: CoreConfig,
    pub tree: TreeConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserConfig {
    fn identity(&self) -> Option<SdkResult<Identity>> {
        match (&self.name, &self.email) {
            (Some(name), Some(email)) => Some(Identity::new(name, email).map_err(SdkError::from)),
            _ => None,
        }
    }

    fn check(&self) -> SdkResult<()> {
        if let Some(name) = &self.name {
            Identity::check_field("name", name)?;
        }
        if let Some(email) = &self.email {
            Identity::check_field("email", email)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Gitignore-style pattern file at the work tree root.
    pub ignore_file: String,
    /// zlib level for new objects, 0-9.
    pub compression: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            ignore_file: ".sprigignore".into(),
            compression: 6,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub order: EntryOrder,
    pub keep_empty_dirs: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            order: EntryOrder::Enumeration,
            keep_empty_dirs: true,
        }
    }
}

impl RepoConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> SdkResult<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(SdkError::io(path, e)),
        };
        let config: Self = toml::from_str(&text)
            .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> SdkResult<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| SdkError::Config(format!("cannot serialize config: {e}")))?;
        fs::write(path, text).map_err(|e| SdkError::io(path, e))
    }

    pub fn validate(&self) -> SdkResult<()> {
        self.user.check()?;
        if let Some(committer) = &self.committer {
            committer.check()?;
        }
        if self.core.compression > 9 {
            return Err(SdkError::Config(format!(
                "core.compression must be 0-9, got {}",
                self.core.compression
            )));
        }
        if self.core.ignore_file.is_empty() || self.core.ignore_file.contains(['/', '\\']) {
            return Err(SdkError::Config(format!(
                "core.ignore_file must be a plain file name, got {:?}",
                self.core.ignore_file
            )));
        }
        Ok(())
    }

    /// The configured author identity.
    pub fn author(&self) -> SdkResult<Identity> {
        self.user
            .identity()
            .unwrap_or_else(|| Err(SdkError::MissingIdentity { role: "author" }))
    }

    /// The configured committer identity, falling back to the author when
    /// no committer field is set. A half-set `[committer]` table is an error.
    pub fn committer(&self) -> SdkResult<Identity> {
        match &self.committer {
            Some(c) if c.name.is_some() || c.email.is_some() => c
                .identity()
                .unwrap_or_else(|| Err(SdkError::MissingIdentity { role: "committer" })),
            _ => self.author(),
        }
    }

    /// Read a value by dotted key. Unset optional values are `None`.
    pub fn get(&self, key: &str) -> SdkResult<Option<String>> {
        let committer = self.committer.as_ref();
        let value = match key {
            "user.name" => self.user.name.clone(),
            "user.email" => self.user.email.clone(),
            "committer.name" => committer.and_then(|c| c.name.clone()),
            "committer.email" => committer.and_then(|c| c.email.clone()),
            "core.ignore_file" => Some(self.core.ignore_file.clone()),
            "core.compression" => Some(self.core.compression.to_string()),
            "tree.order" => Some(
                match self.tree.order {
                    EntryOrder::Enumeration => "enumeration",
                    EntryOrder::Sorted => "sorted",
                }
                .to_string(),
            ),
            "tree.keep_empty_dirs" => Some(self.tree.keep_empty_dirs.to_string()),
            other => return Err(unknown_key(other)),
        };
        Ok(value)
    }

    /// Set a value by dotted key. The result is validated before it is kept.
    pub fn set(&mut self, key: &str, value: &str) -> SdkResult<()> {
        let mut next = self.clone();
        match key {
            "user.name" => next.user.name = Some(value.to_string()),
            "user.email" => next.user.email = Some(value.to_string()),
            "committer.name" => {
                next.committer.get_or_insert_with(UserConfig::default).name = Some(value.to_string())
            }
            "committer.email" => {
                next.committer.get_or_insert_with(UserConfig::default).email = Some(value.to_string())
            }
            "core.ignore_file" => next.core.ignore_file = value.to_string(),
            "core.compression" => {
                next.core.compression = value
                    .parse()
                    .map_err(|_| SdkError::Config(format!("core.compression: not a number: {value:?}")))?
            }
            "tree.order" => {
                next.tree.order = match value {
                    "enumeration" => EntryOrder::Enumeration,
                    "sorted" => EntryOrder::Sorted,
                    other => {
                        return Err(SdkError::Config(format!(
                            "tree.order must be \"enumeration\" or \"sorted\", got {other:?}"
                        )))
                    }
                }
            }
            "tree.keep_empty_dirs" => {
                next.tree.keep_empty_dirs = value
                    .parse()
                    .map_err(|_| SdkError::Config(format!("tree.keep_empty_dirs: not a boolean: {value:?}")))?
            }
            other => return Err(unknown_key(other)),
        }

        next.validate()?;
        *self = next;
        Ok(())
    }
}

fn unknown_key(key: &str) -> SdkError {
    SdkError::Config(format!("unknown key {key:?} (known: {})", KEYS.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults() {
        let c = RepoConfig::default();
        assert_eq!(c.core.ignore_file, ".sprigignore");
        assert_eq!(c.core.compression, 6);
        assert_eq!(c.tree.order, EntryOrder::Enumeration);
        assert!(c.tree.keep_empty_dirs);
        assert!(matches!(
            c.author(),
            Err(SdkError::MissingIdentity { role: "author" })
        ));
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempdir().unwrap();
        let c = RepoConfig::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(c, RepoConfig::default());
    }

    #[test]
    fn save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut c = RepoConfig::default();
        c.set("user.name", "Alice").unwrap();
        c.set("user.email", "alice@example.com").unwrap();
        c.set("tree.order", "sorted").unwrap();
        c.save(&path).unwrap();

        let loaded = RepoConfig::load(&path).unwrap();
        assert_eq!(loaded, c);
        assert_eq!(loaded.author().unwrap().name(), "Alice");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[user]\nname = \"Bob\"\nemail = \"bob@x.org\"\n").unwrap();
        let c = RepoConfig::load(&path).unwrap();
        assert_eq!(c.author().unwrap().email(), "bob@x.org");
        assert_eq!(c.core, CoreConfig::default());
        assert_eq!(c.tree, TreeConfig::default());
    }

    #[test]
    fn invalid_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[core]\ncompression = 12\n").unwrap();
        assert!(matches!(RepoConfig::load(&path), Err(SdkError::Config(_))));
        fs::write(&path, "[tree]\norder = \"random\"\n").unwrap();
        assert!(matches!(RepoConfig::load(&path), Err(SdkError::Config(_))));
    }

    #[test]
    fn committer_falls_back_to_author() {
        let mut c = RepoConfig::default();
        c.set("user.name", "Alice").unwrap();
        c.set("user.email", "alice@example.com").unwrap();
        assert_eq!(c.committer().unwrap(), c.author().unwrap());

        c.set("committer.email", "bot@example.com").unwrap();
        c.set("committer.name", "Bot").unwrap();
        assert_eq!(c.committer().unwrap().name(), "Bot");
        assert_eq!(c.author().unwrap().name(), "Alice");
    }

    #[test]
    fn partial_committer_is_an_error() {
        let mut c = RepoConfig::default();
        c.set("user.name", "Alice").unwrap();
        c.set("user.email", "alice@x.com").unwrap();
        c.set("committer.name", "Bob").unwrap();
        assert!(matches!(
            c.committer(),
            Err(SdkError::MissingIdentity { role: "committer" })
        ));

        // An empty table means no override.
        c.committer = Some(UserConfig::default());
        assert_eq!(c.committer().unwrap(), c.author().unwrap());
    }

    #[test]
    fn get_and_set_keys() {
        let mut c = RepoConfig::default();
        assert_eq!(c.get("user.name").unwrap(), None);
        assert_eq!(c.get("core.compression").unwrap().as_deref(), Some("6"));
        c.set("core.compression", "9").unwrap();
        c.set("tree.keep_empty_dirs", "false").unwrap();
        assert_eq!(c.get("core.compression").unwrap().as_deref(), Some("9"));
        assert_eq!(c.get("tree.keep_empty_dirs").unwrap().as_deref(), Some("false"));
        assert_eq!(c.get("tree.order").unwrap().as_deref(), Some("enumeration"));
    }

    #[test]
    fn set_rejects_bad_values() {
        let mut c = RepoConfig::default();
        assert!(c.set("core.compression", "10").is_err());
        assert!(c.set("core.compression", "fast").is_err());
        assert!(c.set("tree.order", "random").is_err());
        assert!(c.set("user.name", "A <b>").is_err());
        assert!(c.set("core.ignore_file", "dir/file").is_err());
        assert!(c.set("no.such.key", "x").is_err());
        // Nothing was applied.
        assert_eq!(c, RepoConfig::default());
    }
}
