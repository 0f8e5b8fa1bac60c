//! Path registry mapping asset categories to globs and output directories.
//!
//! Built once from [`SiteConfig`](crate::config::SiteConfig) at startup and
//! passed explicitly to every task, the dev server, and the watcher. The
//! registry is exhaustive by construction: `resolve` is a pure lookup with no
//! failure mode.

use crate::config::SiteConfig;
use std::path::{Path, PathBuf};

/// Asset category handled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Page templates (`.njk`)
    Templates,
    /// SCSS stylesheets
    Styles,
    /// JavaScript sources
    Scripts,
    /// Images (png, jpeg, svg, gif, ...)
    Images,
    /// Font files, copied through unchanged
    Fonts,
    /// Per-template JSON data files; dispatches to the template task
    Data,
}

impl AssetKind {
    /// All categories that have their own transform task. `Data` is excluded
    /// because it is an alias of `Templates` and only exists so the watcher
    /// can bind the data glob independently.
    pub const TASKS: [AssetKind; 5] = [
        AssetKind::Templates,
        AssetKind::Styles,
        AssetKind::Scripts,
        AssetKind::Images,
        AssetKind::Fonts,
    ];

    /// All watchable categories, in dispatch order.
    pub const WATCHED: [AssetKind; 6] = [
        AssetKind::Templates,
        AssetKind::Data,
        AssetKind::Styles,
        AssetKind::Scripts,
        AssetKind::Images,
        AssetKind::Fonts,
    ];
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AssetKind::Templates => "templates",
            AssetKind::Styles => "styles",
            AssetKind::Scripts => "scripts",
            AssetKind::Images => "images",
            AssetKind::Fonts => "fonts",
            AssetKind::Data => "data",
        };
        write!(f, "{}", name)
    }
}

/// Resolved paths for one asset category. All paths are absolute.
#[derive(Debug, Clone)]
pub struct PathEntry {
    /// Glob matching the source files processed by the task
    pub source_glob: String,
    /// Glob matching files that trigger a re-dispatch in watch mode
    pub watch_glob: String,
    /// Directory the sources live under; used to preserve relative structure
    pub base_dir: PathBuf,
    /// Directory outputs are written to
    pub out_dir: PathBuf,
}

/// Immutable mapping of asset categories to source globs, watch globs, and
/// output directories.
#[derive(Debug, Clone)]
pub struct PathRegistry {
    templates: PathEntry,
    styles: PathEntry,
    scripts: PathEntry,
    images: PathEntry,
    fonts: PathEntry,
    data: PathEntry,
    data_dir: PathBuf,
    out_root: PathBuf,
    project_root: PathBuf,
}

impl PathRegistry {
    /// Build the registry from project configuration, anchored at
    /// `project_root`.
    pub fn from_config(config: &SiteConfig, project_root: &Path) -> Self {
        let abs = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                project_root.join(p)
            }
        };

        let templates_dir = abs(&config.project.templates);
        let assets_dir = abs(&config.project.assets);
        let out_root = abs(&config.project.out);
        let data_dir = assets_dir.join("data");

        let g = |dir: &Path, tail: &str| format!("{}/{}", dir.display(), tail);

        let templates = PathEntry {
            source_glob: g(&templates_dir, "*.njk"),
            watch_glob: g(&templates_dir, "**/*.njk"),
            base_dir: templates_dir.clone(),
            out_dir: out_root.clone(),
        };
        let styles = PathEntry {
            source_glob: g(&assets_dir, "scss/*.scss"),
            watch_glob: g(&assets_dir, "scss/**/*.scss"),
            base_dir: assets_dir.join("scss"),
            out_dir: out_root.join("css"),
        };
        let scripts = PathEntry {
            source_glob: g(&assets_dir, "js/*.js"),
            watch_glob: g(&assets_dir, "js/**/*.js"),
            base_dir: assets_dir.join("js"),
            out_dir: out_root.join("js"),
        };
        let images = PathEntry {
            source_glob: g(&assets_dir, "img/**/*.*"),
            watch_glob: g(&assets_dir, "img/**/*.*"),
            base_dir: assets_dir.join("img"),
            out_dir: out_root.join("img"),
        };
        let fonts = PathEntry {
            source_glob: g(&assets_dir, "fonts/**/*.*"),
            watch_glob: g(&assets_dir, "fonts/**/*.*"),
            base_dir: assets_dir.join("fonts"),
            out_dir: out_root.join("fonts"),
        };
        // Data renders through the template task, so its source glob and
        // output mirror the template entry; only the watch glob differs.
        let data = PathEntry {
            source_glob: templates.source_glob.clone(),
            watch_glob: g(&data_dir, "*.njk.json"),
            base_dir: templates_dir,
            out_dir: out_root.clone(),
        };

        Self {
            templates,
            styles,
            scripts,
            images,
            fonts,
            data,
            data_dir,
            out_root,
            project_root: project_root.to_path_buf(),
        }
    }

    /// Look up the entry for a category.
    pub fn resolve(&self, kind: AssetKind) -> &PathEntry {
        match kind {
            AssetKind::Templates => &self.templates,
            AssetKind::Styles => &self.styles,
            AssetKind::Scripts => &self.scripts,
            AssetKind::Images => &self.images,
            AssetKind::Fonts => &self.fonts,
            AssetKind::Data => &self.data,
        }
    }

    /// Directory holding the per-template JSON data files.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Root of the build output tree.
    pub fn out_root(&self) -> &Path {
        &self.out_root
    }

    /// Project root the registry was anchored at.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Directories that must exist for watching to cover every category.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        vec![self.templates.base_dir.clone(), self.data_dir.parent().map(Path::to_path_buf).unwrap_or_else(|| self.data_dir.clone())]
    }

    /// Verify that no two task categories write into overlapping output
    /// subtrees. Templates, data, and fonts-at-root aside, each category owns
    /// a disjoint subdirectory of the output root; this is the invariant that
    /// makes lock-free concurrent writes safe.
    pub fn verify_disjoint_outputs(&self) -> Result<(), String> {
        let owned: [(AssetKind, &PathBuf); 4] = [
            (AssetKind::Styles, &self.styles.out_dir),
            (AssetKind::Scripts, &self.scripts.out_dir),
            (AssetKind::Images, &self.images.out_dir),
            (AssetKind::Fonts, &self.fonts.out_dir),
        ];

        for (i, (kind_a, dir_a)) in owned.iter().enumerate() {
            // Category subdirectories must be strictly below the shared root,
            // which templates alone write into directly.
            if *dir_a == &self.out_root {
                return Err(format!("{} writes directly into the output root", kind_a));
            }
            for (kind_b, dir_b) in owned.iter().skip(i + 1) {
                if dir_a.starts_with(dir_b) || dir_b.starts_with(dir_a) {
                    return Err(format!("{} and {} outputs overlap", kind_a, kind_b));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;

    fn registry() -> PathRegistry {
        PathRegistry::from_config(&default_config(), Path::new("/proj"))
    }

    #[test]
    fn test_resolve_templates() {
        let reg = registry();
        let entry = reg.resolve(AssetKind::Templates);
        assert_eq!(entry.source_glob, "/proj/templates/*.njk");
        assert_eq!(entry.watch_glob, "/proj/templates/**/*.njk");
        assert_eq!(entry.out_dir, PathBuf::from("/proj/build"));
    }

    #[test]
    fn test_resolve_styles_scripts() {
        let reg = registry();
        assert_eq!(reg.resolve(AssetKind::Styles).out_dir, PathBuf::from("/proj/build/css"));
        assert_eq!(reg.resolve(AssetKind::Scripts).out_dir, PathBuf::from("/proj/build/js"));
    }

    #[test]
    fn test_data_aliases_templates() {
        let reg = registry();
        let data = reg.resolve(AssetKind::Data);
        let templates = reg.resolve(AssetKind::Templates);
        assert_eq!(data.source_glob, templates.source_glob);
        assert_eq!(data.out_dir, templates.out_dir);
        assert_eq!(data.watch_glob, "/proj/static/data/*.njk.json");
    }

    #[test]
    fn test_outputs_disjoint() {
        assert!(registry().verify_disjoint_outputs().is_ok());
    }

    #[test]
    fn test_every_watched_kind_has_entry() {
        let reg = registry();
        for kind in AssetKind::WATCHED {
            assert!(!reg.resolve(kind).watch_glob.is_empty());
        }
    }

    #[test]
    fn test_absolute_config_paths_kept() {
        let mut config = default_config();
        config.project.out = PathBuf::from("/elsewhere/dist");
        let reg = PathRegistry::from_config(&config, Path::new("/proj"));
        assert_eq!(reg.out_root(), Path::new("/elsewhere/dist"));
    }
}
