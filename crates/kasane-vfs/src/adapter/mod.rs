//! Concrete adapters and the virtual path translator they share.
//!
//! An adapter owns one namespace prefix (its virtual base path) backed by
//! one storage mechanism. [`AdapterBase`] holds the logic common to all
//! variants: base path validation, virtual↔relative path mapping, exclude
//! handling, and the rewrite of glob patterns from the caller's namespace
//! into patterns valid against the adapter's own root.

mod disk;
mod memory;

pub use disk::{DiskAdapter, DiskAdapterConfig};
pub use memory::{MemoryAdapter, MemoryAdapterConfig};

use kasane_glob::{PathPattern, PatternSet, Segment};

use crate::error::Result;
use crate::path;

/// One rewrite produced by translating a single pattern alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Rewrite {
    /// A glob pattern relative to the adapter root.
    Pattern(String),
    /// The adapter root itself (the `""` rewrite).
    Root,
    /// The pattern addresses an ancestor prefix of the root: synthesize a
    /// directory stub at this absolute virtual path.
    VirtualDir(String),
}

/// A fully translated glob request, ready to run against the adapter's
/// physical or in-memory index.
#[derive(Debug, Default)]
pub(crate) struct GlobPlan {
    /// Root-relative patterns, excludes already appended in negated form.
    pub set: PatternSet,
    /// The pattern denotes the adapter's own root directory.
    pub include_root: bool,
    /// Ancestor directory stubs to synthesize (absolute virtual paths).
    pub virtual_dirs: Vec<String>,
}

/// Shared adapter state: identity, namespace prefix, excludes.
pub(crate) struct AdapterBase {
    kind: &'static str,
    name: String,
    virtual_base_path: String,
    base_segments: Vec<String>,
    excludes: Vec<PathPattern>,
    owner_tag: Option<String>,
}

impl AdapterBase {
    pub fn new(
        kind: &'static str,
        virtual_base_path: &str,
        exclude_patterns: &[String],
        owner_tag: Option<String>,
    ) -> Result<Self> {
        path::validate_base(virtual_base_path)?;
        let normalized = path::normalize(virtual_base_path)?;
        let virtual_base_path = if normalized == "/" {
            normalized
        } else {
            format!("{normalized}/")
        };

        let excludes = exclude_patterns
            .iter()
            .map(|raw| Ok(PathPattern::parse(raw)?))
            .collect::<Result<Vec<_>>>()?;

        let base_segments = path::segments(&virtual_base_path)
            .into_iter()
            .map(String::from)
            .collect();

        Ok(Self {
            kind,
            name: format!("{kind}:{virtual_base_path}"),
            virtual_base_path,
            base_segments,
            excludes,
            owner_tag,
        })
    }

    /// Adapter kind tag recorded in source metadata (`"disk"`, `"memory"`).
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The namespace prefix, with trailing slash.
    pub fn virtual_base_path(&self) -> &str {
        &self.virtual_base_path
    }

    /// The root directory's own virtual path (no trailing slash).
    pub fn root_path(&self) -> &str {
        if self.virtual_base_path == "/" {
            "/"
        } else {
            self.virtual_base_path.trim_end_matches('/')
        }
    }

    pub fn owner_tag(&self) -> Option<&str> {
        self.owner_tag.as_deref()
    }

    /// Map an absolute virtual path into the adapter's namespace.
    ///
    /// Returns the root-relative path (`""` for the root itself), or `None`
    /// when the path is outside the base path — "not handled", not an error.
    pub fn to_relative<'a>(&self, virtual_path: &'a str) -> Option<&'a str> {
        if virtual_path == self.root_path() {
            return Some("");
        }
        virtual_path.strip_prefix(&self.virtual_base_path)
    }

    /// Absolute virtual path for a root-relative one.
    pub fn to_virtual(&self, relative: &str) -> String {
        if relative.is_empty() {
            self.root_path().to_string()
        } else {
            format!("{}{relative}", self.virtual_base_path)
        }
    }

    /// Query-time exclude check for direct path lookups.
    pub fn is_excluded(&self, virtual_path: &str) -> bool {
        self.excludes.iter().any(|p| p.matches(virtual_path))
    }

    /// Translate caller-namespace glob patterns into a [`GlobPlan`].
    ///
    /// Every configured exclude pattern is rewritten the same way as the
    /// request patterns and appended negated, so that the matcher applies
    /// excludes inside the adapter's namespace without the adapter ever
    /// seeing foreign paths.
    pub fn prepare_glob(&self, patterns: &[&str]) -> Result<GlobPlan> {
        let mut plan = GlobPlan::default();

        for raw in patterns {
            let pattern = PathPattern::parse(raw)?;
            for rewrite in self.rewrite(&pattern) {
                match rewrite {
                    Rewrite::Pattern(rel) => {
                        let prefixed = if pattern.is_negated() {
                            format!("!{rel}")
                        } else {
                            rel
                        };
                        plan.set.push(PathPattern::parse(&prefixed)?);
                    }
                    Rewrite::Root if !pattern.is_negated() => plan.include_root = true,
                    Rewrite::VirtualDir(vpath) if !pattern.is_negated() => {
                        if !plan.virtual_dirs.contains(&vpath) {
                            plan.virtual_dirs.push(vpath);
                        }
                    }
                    // A negated pattern cannot un-synthesize a stub.
                    Rewrite::Root | Rewrite::VirtualDir(_) => {}
                }
            }
        }

        for exclude in &self.excludes {
            for rewrite in self.rewrite(exclude) {
                match rewrite {
                    Rewrite::Pattern(rel) => plan.set.push(PathPattern::parse(&format!("!{rel}"))?),
                    // An exclude covering the whole adapter suppresses the
                    // root stub as well.
                    Rewrite::Root => plan.include_root = false,
                    Rewrite::VirtualDir(_) => {}
                }
            }
        }

        Ok(plan)
    }

    /// Rewrite one pattern against the base directory, walking each brace
    /// alternative segment by segment.
    fn rewrite(&self, pattern: &PathPattern) -> Vec<Rewrite> {
        let mut rewrites = Vec::new();
        for alternative in pattern.alternatives() {
            for rewrite in self.walk_alternative(alternative) {
                if !rewrites.contains(&rewrite) {
                    rewrites.push(rewrite);
                }
            }
        }
        rewrites
    }

    fn walk_alternative(&self, alternative: &[Segment]) -> Vec<Rewrite> {
        let base = &self.base_segments;

        for (i, base_segment) in base.iter().enumerate() {
            match alternative.get(i) {
                // Pattern exhausted before the base: it addresses an
                // ancestor of the root. The consumed prefix becomes a
                // directory stub.
                None => {
                    let stub = format!("/{}", base[..i].join("/"));
                    return vec![Rewrite::VirtualDir(stub)];
                }
                // Everything past the recursive wildcard counts as matched:
                // the remainder applies inside the adapter, and the base
                // directory itself is a root match.
                Some(Segment::Globstar) => {
                    let remainder = alternative[i..]
                        .iter()
                        .map(Segment::as_str)
                        .collect::<Vec<_>>()
                        .join("/");
                    return vec![Rewrite::Pattern(remainder), Rewrite::Root];
                }
                Some(segment) => {
                    if !segment.matches(base_segment) {
                        return Vec::new();
                    }
                }
            }
        }

        if alternative.len() == base.len() {
            vec![Rewrite::Root]
        } else {
            let remainder = alternative[base.len()..]
                .iter()
                .map(Segment::as_str)
                .collect::<Vec<_>>()
                .join("/");
            vec![Rewrite::Pattern(remainder)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VfsError;

    fn base() -> AdapterBase {
        AdapterBase::new("memory", "/a/b/c/", &[], None).unwrap()
    }

    fn rewrites(base: &AdapterBase, pattern: &str) -> Vec<Rewrite> {
        base.rewrite(&PathPattern::parse(pattern).unwrap())
    }

    #[test]
    fn base_path_must_be_absolute_with_trailing_slash() {
        assert!(AdapterBase::new("memory", "/a/b/", &[], None).is_ok());
        assert!(AdapterBase::new("memory", "/", &[], None).is_ok());
        assert!(matches!(
            AdapterBase::new("memory", "/a/b", &[], None),
            Err(VfsError::InvalidBasePath(_))
        ));
        assert!(matches!(
            AdapterBase::new("memory", "a/b/", &[], None),
            Err(VfsError::InvalidBasePath(_))
        ));
    }

    #[test]
    fn relative_mapping() {
        let base = base();
        assert_eq!(base.to_relative("/a/b/c"), Some(""));
        assert_eq!(base.to_relative("/a/b/c/d.txt"), Some("d.txt"));
        assert_eq!(base.to_relative("/a/b/other"), None);
        assert_eq!(base.to_relative("/elsewhere"), None);
        assert_eq!(base.to_virtual("d.txt"), "/a/b/c/d.txt");
        assert_eq!(base.to_virtual(""), "/a/b/c");
    }

    #[test]
    fn globstar_past_base_rewrites_to_remainder() {
        let base = base();
        assert_eq!(
            rewrites(&base, "/a/b/c/d/**"),
            vec![Rewrite::Pattern("d/**".into())]
        );
    }

    #[test]
    fn globstar_at_base_boundary() {
        let base = base();
        assert_eq!(
            rewrites(&base, "/a/b/c/**"),
            vec![Rewrite::Pattern("**".into())]
        );
    }

    #[test]
    fn globstar_above_base_matches_root_and_contents() {
        let base = base();
        assert_eq!(
            rewrites(&base, "/a/b/**"),
            vec![Rewrite::Pattern("**".into()), Rewrite::Root]
        );
        assert_eq!(
            rewrites(&base, "/**"),
            vec![Rewrite::Pattern("**".into()), Rewrite::Root]
        );
    }

    #[test]
    fn exact_base_is_root_match() {
        let base = base();
        assert_eq!(rewrites(&base, "/a/b/c"), vec![Rewrite::Root]);
    }

    #[test]
    fn ancestor_pattern_synthesizes_directory_stub() {
        let base = base();
        assert_eq!(
            rewrites(&base, "/a/*"),
            vec![Rewrite::VirtualDir("/a/b".into())]
        );
        assert_eq!(
            rewrites(&base, "/a/b"),
            vec![Rewrite::VirtualDir("/a/b".into())]
        );
    }

    #[test]
    fn foreign_prefix_contributes_nothing() {
        let base = base();
        assert!(rewrites(&base, "/x/**").is_empty());
        assert!(rewrites(&base, "/a/x/**").is_empty());
    }

    #[test]
    fn brace_alternatives_walk_independently() {
        let base = base();
        assert_eq!(
            rewrites(&base, "/{a,x}/b/c/*.js"),
            vec![Rewrite::Pattern("*.js".into())]
        );
    }

    #[test]
    fn plan_applies_excludes_in_negated_form() {
        let base =
            AdapterBase::new("memory", "/a/b/c/", &["/a/b/c/test/**".to_string()], None).unwrap();
        let plan = base.prepare_glob(&["/a/b/c/**"]).unwrap();
        assert!(plan.set.matches("main.js"));
        assert!(!plan.set.matches("test/helper.js"));
    }

    #[test]
    fn path_exclude_check_uses_virtual_namespace() {
        let base =
            AdapterBase::new("memory", "/a/b/c/", &["/a/b/c/test/**".to_string()], None).unwrap();
        assert!(base.is_excluded("/a/b/c/test/helper.js"));
        assert!(!base.is_excluded("/a/b/c/main.js"));
    }

    #[test]
    fn root_base_path() {
        let base = AdapterBase::new("memory", "/", &[], None).unwrap();
        assert_eq!(base.to_relative("/x/y"), Some("x/y"));
        assert_eq!(base.to_relative("/"), Some(""));
        assert_eq!(base.root_path(), "/");
        assert_eq!(
            base.rewrite(&PathPattern::parse("/**").unwrap()),
            vec![Rewrite::Pattern("**".into())]
        );
    }
}
