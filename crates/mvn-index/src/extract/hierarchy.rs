use super::MetadataExtractor;
use crate::engine::Document;
use crate::error::Result;
use crate::ontology::{self, Field};
use crate::scanner::ArtifactContext;
use crate::types::{ArtifactRecord, Attributes};

const FIELDS: &[Field] = &[ontology::PARENT, ontology::MODULES];

/// Parent linkage and declared modules from the descriptor.
///
/// Modules are kept comma-joined on the record and stored as one document
/// value per module.
pub struct HierarchyExtractor;

impl MetadataExtractor for HierarchyExtractor {
    fn id(&self) -> &'static str {
        "deps/mvn-hierarchy"
    }

    fn fields(&self) -> &'static [Field] {
        FIELDS
    }

    fn extract(&self, context: &ArtifactContext) -> Result<Option<Attributes>> {
        let Some(descriptor) = &context.descriptor else {
            return Ok(None);
        };

        let mut attributes = Attributes::new();
        if let Some(parent) = descriptor.parent_coordinate() {
            attributes.insert(ontology::PARENT.name.to_string(), parent.write());
        }
        if !descriptor.modules.is_empty() {
            attributes.insert(ontology::MODULES.name.to_string(), descriptor.modules.join(","));
        }
        Ok((!attributes.is_empty()).then_some(attributes))
    }

    fn write_to_document(&self, record: &ArtifactRecord, document: &mut Document) {
        if let Some(parent) = record.attribute(ontology::PARENT.name) {
            document.add(ontology::PARENT.name, parent);
        }
        if let Some(modules) = record.attribute(ontology::MODULES.name) {
            for module in modules.split(',').filter(|module| !module.is_empty()) {
                document.add(ontology::MODULES.name, module);
            }
        }
    }

    fn read_from_document(&self, document: &Document, record: &mut ArtifactRecord) -> bool {
        let mut wrote = false;
        if let Some(parent) = document.get(ontology::PARENT.name) {
            record.set_attribute(ontology::PARENT.name, parent);
            wrote = true;
        }
        let modules: Vec<&str> = document.get_all(ontology::MODULES.name).collect();
        if !modules.is_empty() {
            record.set_attribute(ontology::MODULES.name, modules.join(","));
            wrote = true;
        }
        wrote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ArtifactContextProducer;
    use crate::testutil::RepoFixture;

    fn context(repo: &RepoFixture, path: &std::path::Path) -> ArtifactContext {
        ArtifactContextProducer::new(repo.root())
            .produce(path)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn writes_parent_and_modules() {
        let repo = RepoFixture::new();
        let pom = repo.pom(
            "org.example",
            "child",
            "1.0",
            "pom",
            Some(("org.example", "root", "1.0")),
            &["a", "b"],
        );
        let attributes = HierarchyExtractor
            .extract(&context(&repo, &pom))
            .unwrap()
            .unwrap();
        assert_eq!(attributes["parent"], "mvn:org.example/root/1.0");
        assert_eq!(attributes["modules"], "a,b");
    }

    #[test]
    fn absent_metadata_produces_nothing() {
        let repo = RepoFixture::new();
        let pom = repo.pom("org.example", "lonely", "1.0", "jar", None, &[]);
        assert!(HierarchyExtractor
            .extract(&context(&repo, &pom))
            .unwrap()
            .is_none());

        let orphan = repo.file("org.example", "orphan", "1.0", "orphan-1.0.jar", "x");
        assert!(HierarchyExtractor
            .extract(&context(&repo, &orphan))
            .unwrap()
            .is_none());
    }

    #[test]
    fn jar_inherits_linkage_from_sibling_descriptor() {
        let repo = RepoFixture::new();
        repo.pom(
            "org.example",
            "child",
            "1.0",
            "bundle",
            Some(("org.example", "root", "1.0")),
            &[],
        );
        let jar = repo.jar("org.example", "child", "1.0", &[]);
        let attributes = HierarchyExtractor
            .extract(&context(&repo, &jar))
            .unwrap()
            .unwrap();
        assert_eq!(attributes["parent"], "mvn:org.example/root/1.0");
        assert!(!attributes.contains_key("modules"));
    }
}
