//! Reconstructs module hierarchies from indexed parent links.
//!
//! Expansion is breadth-first: each round looks up the children of every
//! coordinate found in the previous round, restricted to packagings that can
//! carry modules (`IndexConfig::hierarchy_packagings`). Queries within a
//! round run in parallel; rounds run in sequence. The walk stops after the
//! first round that finds nothing new.

use fnv::FnvHashSet;
use rayon::prelude::*;

use crate::coordinate::ArtifactCoordinate;
use crate::criteria::Criterion;
use crate::error::{IndexError, Result};
use crate::index::IndexContext;
use crate::ontology;
use crate::types::{ArtifactDescriptor, ArtifactRecord};

const ROOT_PACKAGING: &str = "pom";

/// Descendants of a hierarchy root.
#[derive(Debug)]
pub struct Hierarchy {
    /// One record per coordinate, sorted by coordinate. Excludes the root.
    pub records: Vec<ArtifactRecord>,
    /// Number of expansion rounds run, including the final empty one.
    pub rounds: usize,
}

pub struct HierarchyResolver<'a> {
    context: &'a IndexContext,
}

impl<'a> HierarchyResolver<'a> {
    pub fn new(context: &'a IndexContext) -> Self {
        Self { context }
    }

    pub fn resolve(&self, root: &ArtifactCoordinate) -> Result<Hierarchy> {
        self.check_root(root)?;

        // Records compare poorly as a whole; identity is the coordinate string.
        let mut seen: FnvHashSet<String> = FnvHashSet::default();
        seen.insert(root.write());
        let mut records = Vec::new();
        let mut frontier = vec![root.clone()];
        let mut rounds = 0;

        loop {
            rounds += 1;
            let found = frontier
                .par_iter()
                .map(|parent| self.children_of(parent))
                .collect::<Result<Vec<_>>>()?;

            let mut next = Vec::new();
            for record in found.into_iter().flatten() {
                if seen.insert(record.coordinate().write()) {
                    next.push(record.coordinate().clone());
                    records.push(record);
                }
            }
            log::debug!("hierarchy of {root}: round {rounds} found {}", next.len());
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        records.sort_by(|a, b| a.coordinate().cmp(b.coordinate()));
        log::info!(
            "resolved {} descendants of {root} in {rounds} rounds",
            records.len()
        );
        Ok(Hierarchy { records, rounds })
    }

    fn check_root(&self, root: &ArtifactCoordinate) -> Result<()> {
        let criterion = Criterion::all(vec![
            Criterion::leaf(ontology::GROUP_ID.name, root.group_id()),
            Criterion::leaf(ontology::ARTIFACT_ID.name, root.artifact_id()),
            Criterion::leaf(ontology::VERSION.name, root.version()),
            Criterion::leaf(ontology::PACKAGING.name, ROOT_PACKAGING),
        ])?;
        let hits = self.context.search(&criterion)?.len();
        if hits != 1 {
            return Err(IndexError::NotFound(format!(
                "hierarchy root {root} must resolve to exactly one pom artifact, found {hits}"
            )));
        }
        Ok(())
    }

    /// `parent == coordinate AND packaging in hierarchy_packagings`.
    fn children_of(&self, parent: &ArtifactCoordinate) -> Result<Vec<ArtifactRecord>> {
        let packagings = self
            .context
            .config()
            .hierarchy_packagings
            .iter()
            .map(|packaging| Criterion::leaf(ontology::PACKAGING.name, packaging.as_str()).should())
            .collect();
        let criterion = Criterion::all(vec![
            Criterion::leaf(ontology::PARENT.name, parent.write()),
            Criterion::all(packagings)?,
        ])?;
        self.context.search(&criterion)
    }
}

/// Descriptors of every descendant of `groupId:artifactId:version`.
pub fn gather_hierarchy(
    context: &IndexContext,
    group_id: &str,
    artifact_id: &str,
    version: &str,
) -> Result<Vec<ArtifactDescriptor>> {
    let root = ArtifactCoordinate::new(group_id, artifact_id, version)?;
    let hierarchy = HierarchyResolver::new(context).resolve(&root)?;
    Ok(hierarchy
        .records
        .iter()
        .map(ArtifactRecord::descriptor)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::config::IndexConfig;
    use crate::testutil::RepoFixture;

    fn open(repo: &RepoFixture) -> IndexContext {
        IndexContext::open_or_build(
            repo.root(),
            IndexConfig::default(),
            &CancellationToken::noop(),
        )
        .unwrap()
    }

    fn artifact_ids(records: &[ArtifactRecord]) -> Vec<&str> {
        records
            .iter()
            .map(|record| record.coordinate().artifact_id())
            .collect()
    }

    #[test]
    fn three_level_tree() {
        let repo = RepoFixture::new();
        repo.three_level_tree();
        let context = open(&repo);

        let root = ArtifactCoordinate::new("org.example", "root", "1.0").unwrap();
        let hierarchy = HierarchyResolver::new(&context).resolve(&root).unwrap();
        assert_eq!(
            artifact_ids(&hierarchy.records),
            vec!["child-a", "child-b", "child-c", "grandchild"]
        );
        assert_eq!(hierarchy.rounds, 3);
    }

    #[test]
    fn gather_returns_descriptors() {
        let repo = RepoFixture::new();
        repo.three_level_tree();
        let context = open(&repo);

        let descriptors = gather_hierarchy(&context, "org.example", "root", "1.0").unwrap();
        assert_eq!(descriptors.len(), 4);
        let child_c = &descriptors[2];
        assert_eq!(child_c.artifact_id, "child-c");
        assert_eq!(child_c.packaging, "pom");
        assert_eq!(child_c.classifier, None);
        assert_eq!(child_c.checksum.as_deref().map(str::len), Some(40));
        assert!(descriptors.iter().all(|d| d.artifact_id != "plain"));
    }

    #[test]
    fn childless_root_has_no_descendants() {
        let repo = RepoFixture::new();
        repo.pom("org.example", "lonely", "1.0", "pom", None, &[]);
        let context = open(&repo);

        let root = ArtifactCoordinate::new("org.example", "lonely", "1.0").unwrap();
        let hierarchy = HierarchyResolver::new(&context).resolve(&root).unwrap();
        assert!(hierarchy.records.is_empty());
        assert_eq!(hierarchy.rounds, 1);
    }

    #[test]
    fn root_must_be_a_single_pom() {
        let repo = RepoFixture::new();
        repo.three_level_tree();
        let context = open(&repo);

        for artifact_id in ["missing", "child-a", "plain"] {
            let result = gather_hierarchy(&context, "org.example", artifact_id, "1.0");
            assert!(
                matches!(result, Err(IndexError::NotFound(_))),
                "{artifact_id}: {result:?}"
            );
        }
        assert!(matches!(
            gather_hierarchy(&context, "org.example", "", "1.0"),
            Err(IndexError::InvalidInput(_))
        ));
    }

    #[test]
    fn refresh_follows_a_rewritten_parent_link() {
        let repo = RepoFixture::new();
        repo.three_level_tree();
        let context = open(&repo);
        let root = ArtifactCoordinate::new("org.example", "root", "1.0").unwrap();

        // child-a keeps its jar but its descriptor no longer names a parent.
        repo.pom("org.example", "child-a", "1.0", "bundle", None, &[]);
        context.refresh(&CancellationToken::noop()).unwrap();
        let refreshed = HierarchyResolver::new(&context).resolve(&root).unwrap();
        assert_eq!(
            artifact_ids(&refreshed.records),
            vec!["child-b", "child-c", "grandchild"]
        );
        let index_dir = context.index_dir().to_path_buf();
        context.close().unwrap();

        std::fs::remove_dir_all(&index_dir).unwrap();
        let rebuilt = open(&repo);
        let from_scratch = HierarchyResolver::new(&rebuilt).resolve(&root).unwrap();
        assert_eq!(
            artifact_ids(&from_scratch.records),
            artifact_ids(&refreshed.records)
        );
        assert_eq!(from_scratch.rounds, refreshed.rounds);
    }

    #[test]
    fn parent_cycles_terminate() {
        let repo = RepoFixture::new();
        repo.pom(
            "org.example",
            "a",
            "1.0",
            "pom",
            Some(("org.example", "b", "1.0")),
            &[],
        );
        repo.pom(
            "org.example",
            "b",
            "1.0",
            "pom",
            Some(("org.example", "a", "1.0")),
            &[],
        );
        let context = open(&repo);

        let root = ArtifactCoordinate::new("org.example", "a", "1.0").unwrap();
        let hierarchy = HierarchyResolver::new(&context).resolve(&root).unwrap();
        assert_eq!(artifact_ids(&hierarchy.records), vec!["b"]);
        assert_eq!(hierarchy.rounds, 2);
    }
}
