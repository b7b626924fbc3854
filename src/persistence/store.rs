// ============================================================================
// Stockage clé/valeur
// ============================================================================
// Abstraction du stockage local pour que la logique watchlist/favoris soit
// testable sans disque
//
// CONCEPTS RUST :
// 1. Trait : interface commune à MemoryStore (tests) et FileStore (prod)
// 2. Send + Sync : le store peut être partagé entre threads
// 3. RwLock : plusieurs lecteurs OU un seul écrivain
// ============================================================================

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Clé de la watchlist persistée
pub const WATCHLIST_KEY: &str = "crypto-watchlist";

/// Clé de la liste des favoris
pub const FAVORITES_KEY: &str = "cryptoFavorites";

/// Stockage clé/valeur de chaînes
pub trait KeyValueStore: Send + Sync {
    /// Lit une valeur (None si la clé est absente)
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Écrit une valeur, en écrasant l'ancienne
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Supprime une clé (pas d'erreur si elle n'existe pas)
    fn remove(&self, key: &str) -> Result<()>;
}

// ============================================================================
// MemoryStore
// ============================================================================

/// Store en mémoire, utilisé par les tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().map_err(|_| anyhow!("MemoryStore lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().map_err(|_| anyhow!("MemoryStore lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().map_err(|_| anyhow!("MemoryStore lock poisoned"))?;
        values.remove(key);
        Ok(())
    }
}

// ============================================================================
// FileStore
// ============================================================================
// Un fichier <clé>.json par clé dans un répertoire de données
// - Linux : ~/.local/share/coindeck/
// - macOS : ~/Library/Application Support/coindeck/
// ============================================================================

/// Store sur disque
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Crée le store, le répertoire est créé à la première écriture
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Répertoire par défaut : <data_dir>/coindeck
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coindeck")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Échec de la lecture de {}", path.display()))?;
        Ok(Some(content))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Échec de la création de {}", self.dir.display()))?;

        // Écrit dans un fichier temporaire puis renomme
        // CONCEPT : rename est atomique sur un même système de fichiers,
        // un crash en cours d'écriture ne laisse pas de JSON tronqué
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        fs::write(&tmp, value).with_context(|| format!("Échec de l'écriture de {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("Échec du renommage vers {}", path.display()))?;

        debug!(key, path = %path.display(), bytes = value.len(), "Value persisted");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Échec de la suppression de {}", path.display()))?;
        }
        Ok(())
    }
}

// ============================================================================
// Helpers JSON
// ============================================================================

/// Charge une liste JSON depuis le store
///
/// Clé absente, erreur de lecture ou JSON invalide : liste vide
pub fn load_json_list<T, S>(store: &S, key: &str) -> Vec<T>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(key, error = ?e, "Failed to read stored value, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(list) => list,
        Err(e) => {
            warn!(key, error = %e, "Failed to parse stored value, starting empty");
            Vec::new()
        }
    }
}

/// Sérialise une liste en JSON et l'écrit dans le store
pub fn save_json_list<T, S>(store: &S, key: &str, items: &[T]) -> Result<()>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let json = serde_json::to_string(items).context("Échec de la sérialisation JSON")?;
    store.set(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Répertoire temporaire unique par test
    fn temp_dir() -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("coindeck-store-{}-{}", std::process::id(), n))
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_file_store() {
        let dir = temp_dir();
        let store = FileStore::new(&dir);

        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "[1,2]").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("[1,2]"));
        assert!(dir.join("k.json").exists());
        assert!(!dir.join("k.json.tmp").exists());

        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_load_json_list_fallbacks() {
        let store = MemoryStore::new();
        let empty: Vec<String> = load_json_list(&store, "missing");
        assert!(empty.is_empty());

        store.set("broken", "{not json").unwrap();
        let broken: Vec<String> = load_json_list(&store, "broken");
        assert!(broken.is_empty());

        save_json_list(&store, "ok", &["a".to_string(), "b".to_string()]).unwrap();
        let ok: Vec<String> = load_json_list(&store, "ok");
        assert_eq!(ok, vec!["a", "b"]);
    }
}
