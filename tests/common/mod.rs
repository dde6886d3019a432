//! Shared test fixtures for integration tests.
//!
//! Each test gets its own apt lists directory and its own cache directory, so cache
//! state never leaks between tests.

use debfind::{CacheConfig, EngineConfig, Model, Progress};
use rstest::fixture;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const MAIN_PACKAGES: &str = "deb.example.org_debian_dists_stable_main_binary-amd64_Packages";
/// Sorts after [`MAIN_PACKAGES`], so its duplicate `git` must lose.
pub const SECURITY_PACKAGES: &str =
    "security.example.org_debian-security_dists_stable_main_binary-amd64_Packages";
pub const FOREIGN_PACKAGES: &str = "deb.example.org_debian_dists_stable_main_binary-arm64_Packages";
pub const MAIN_TRANSLATIONS: &str = "deb.example.org_debian_dists_stable_main_i18n_Translation-en";

const MAIN: &str = "\
Package: ghc
Version: 9.4.7-1
Installed-Size: 1024
Section: haskell
Description: The Glasgow Haskell Compilation system
 A state-of-the-art, open source compiler and interactive environment.

Package: haskell-mode
Version: 17.4-1
Section: editors
Description: major mode for editing Haskell in Emacs
 Provides indentation and interactive evaluation.

Package: emacs
Version: 1:29.1-1
Section: editors
Homepage: https://www.gnu.org/software/emacs/
Description: GNU Emacs editor

Package: libghc-text-lib-dev
Version: 2.0.2-1
Section: haskell
Description: efficient packed Unicode text type for Haskell

Package: ghc-doc
Version: 9.4.7-1
Section: doc
Description: documentation for the Glasgow Haskell Compilation system

Package: git
Version: 1:2.39.2-1
Installed-Size: 44748
Section: vcs
Homepage: https://git-scm.com/
Description: fast, scalable, distributed revision control system

Package: python3-django
Version: 3:4.2.8-1
Section: web/python
Description: High-level Python web development framework
";

const SECURITY: &str = "\
Package: git
Version: 1:2.45.0-1
Section: vcs
Description: a later git that must lose to the first file

Package: hello
Version: 2.10-3
Section: devel
Description: example package based on GNU hello
 The GNU hello program produces a familiar, friendly greeting.
";

const FOREIGN: &str = "\
Package: armonly
Version: 1.0
Section: misc
Description: only built for arm64
";

const TRANSLATIONS: &str = "\
Package: git
Description-md5: 9a6ba7cb4a6ce5f1a6cb6ee7cbd70cd8
Description-en: fast, scalable, distributed revision control system (translated)

Package: nosuchpackage
Description-md5: 0000
Description-en: translation for a package that is not installed
";

/// A temporary apt lists directory plus a separate cache directory.
#[allow(dead_code)] // Methods used across different integration test crates
pub struct ListsWorkspace {
    _temp: TempDir,
    root: PathBuf,
}

#[allow(dead_code)] // Methods used across different integration test crates
impl ListsWorkspace {
    /// Creates an empty workspace with `lists/` and `cache/` directories.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        std::fs::create_dir_all(root.join("lists")).expect("Failed to create lists dir");
        std::fs::create_dir_all(root.join("cache")).expect("Failed to create cache dir");
        Self { _temp: temp, root }
    }

    /// Creates a workspace holding the standard sample lists.
    pub fn with_sample_lists() -> Self {
        let workspace = Self::new();
        workspace.write_list(MAIN_PACKAGES, MAIN);
        workspace.write_list(SECURITY_PACKAGES, SECURITY);
        workspace.write_list(FOREIGN_PACKAGES, FOREIGN);
        workspace.write_list(MAIN_TRANSLATIONS, TRANSLATIONS);
        workspace
    }

    pub fn lists_dir(&self) -> PathBuf {
        self.root.join("lists")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// Writes a file into the lists directory.
    ///
    /// # Panics
    /// Panics if the write fails.
    pub fn write_list(&self, name: &str, content: &str) {
        std::fs::write(self.lists_dir().join(name), content)
            .unwrap_or_else(|e| panic!("Failed to write {}: {}", name, e));
    }

    /// Removes a file from the lists directory.
    pub fn remove_list(&self, name: &str) {
        std::fs::remove_file(self.lists_dir().join(name))
            .unwrap_or_else(|e| panic!("Failed to remove {}: {}", name, e));
    }

    /// Engine configuration pointing at this workspace, with caching enabled.
    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            data_dir: self.lists_dir(),
            architecture: "amd64".to_string(),
            max_workers: 4,
            cache: CacheConfig {
                enabled: true,
                dir: self.cache_dir(),
                prefix: "debfind-test".to_string(),
            },
            ..EngineConfig::default()
        }
    }

    /// Number of cache files currently in the cache directory.
    pub fn cache_files(&self) -> usize {
        std::fs::read_dir(self.cache_dir())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "cache"))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }
}

/// Workspace with the sample lists and no cache yet.
#[fixture]
pub fn sample_lists() -> ListsWorkspace {
    debfind::tracing::init(false);
    ListsWorkspace::with_sample_lists()
}

/// Load `model`, collecting every progress message.
///
/// # Panics
/// Panics if the load fails.
#[allow(dead_code)]
pub async fn load_collecting(model: &Model, refresh: bool) -> (debfind::LoadReport, Vec<Progress>) {
    let mut events = Vec::new();
    let report = model
        .load(|p| events.push(p), refresh)
        .await
        .expect("Load should succeed");
    (report, events)
}

/// A model loaded from the sample lists.
#[allow(dead_code)]
pub async fn loaded_model(workspace: &ListsWorkspace) -> Model {
    let model = Model::new(workspace.config()).expect("Config should be valid");
    load_collecting(&model, false).await;
    model
}
